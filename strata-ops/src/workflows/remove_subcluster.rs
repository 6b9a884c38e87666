//! Removing a subcluster from an Eon database.

use crate::engine::OperationEngine;
use crate::error::{OpsError, Result};
use crate::ops::https::{HttpsDropSubclusterOp, HttpsFindSubclusterOp};
use crate::ops::{choose_initiator, CommandPolicy, Operation};
use crate::workflows::remove_node::{remove_node, RemoveNodeOptions};
use crate::workflows::{get_vdb_from_running_db, DatabaseOptions};
use strata_core::CoordinationDatabase;
use tracing::info;

/// Options for db_remove_subcluster.
#[derive(Debug, Clone, Default)]
pub struct RemoveSubclusterOptions {
    /// Common database options.
    pub db: DatabaseOptions,
    /// Subcluster to remove.
    pub sc_name: String,
    /// Delete directories even when they still hold data.
    pub force_delete: bool,
}

/// Remove a subcluster: verify it exists and is neither the default nor
/// sandboxed, remove any member nodes, then drop the name from the
/// catalog.
pub async fn remove_subcluster(
    options: &mut RemoveSubclusterOptions,
) -> Result<CoordinationDatabase> {
    options.db.analyze();
    options.db.validate(CommandPolicy::RemoveSubcluster)?;
    if options.sc_name.is_empty() {
        return Err(OpsError::OptionValidation {
            cause: "must specify a subcluster name".to_string(),
        });
    }

    info!(subcluster = %options.sc_name, "performing remove_subcluster pre-checks");
    let mut vdb = get_vdb_from_running_db(&options.db).await?;

    // the running database just confirmed (or denied) Eon mode
    if !vdb.is_eon {
        return Err(OpsError::NotEonMode {
            command: "db_remove_subcluster",
            db_name: vdb.name.clone(),
        });
    }

    // the subcluster lookup also discovers the default subcluster name
    let find_op = HttpsFindSubclusterOp::new(
        options.db.hosts.clone(),
        options.db.auth()?,
        &options.sc_name,
        false,
        true,
    );
    let instructions: Vec<Box<dyn Operation>> = vec![Box::new(find_op)];
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    let hosts_to_remove = pre_check(&vdb, &engine.context.default_sc_name, &options.sc_name)?;

    if hosts_to_remove.is_empty() {
        info!(subcluster = %options.sc_name, "no node found in subcluster");
    } else {
        info!(subcluster = %options.sc_name, hosts = ?hosts_to_remove,
              "removing subcluster nodes");
        let mut remove_options = RemoveNodeOptions {
            db: options.db.clone(),
            hosts_to_remove,
            force_delete: options.force_delete,
        };
        vdb = remove_node(&mut remove_options).await?;
    }

    // one primary up host is enough: the endpoint drops the subcluster
    // cluster-wide
    info!(subcluster = %options.sc_name, "removing the subcluster name from the catalog");
    let initiator = choose_initiator(&vdb.primary_up_nodes, &[])?;
    let drop_op =
        HttpsDropSubclusterOp::new(vec![initiator], options.db.auth()?, &options.sc_name);
    let instructions: Vec<Box<dyn Operation>> = vec![Box::new(drop_op)];
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    Ok(vdb)
}

/// Validate the removal and collect the member hosts. Runs before any
/// state-changing operation is emitted.
pub(crate) fn pre_check(
    vdb: &CoordinationDatabase,
    default_sc_name: &str,
    sc_name: &str,
) -> Result<Vec<String>> {
    if !vdb.is_eon {
        return Err(OpsError::NotEonMode {
            command: "db_remove_subcluster",
            db_name: vdb.name.clone(),
        });
    }
    if sc_name == default_sc_name {
        return Err(OpsError::RemoveDefaultSubcluster { name: sc_name.to_string() });
    }
    Ok(vdb.hosts_in_subcluster(sc_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{NodeDetails, NodeState};

    fn eon_vdb() -> CoordinationDatabase {
        let mut details = Vec::new();
        for (i, (address, sc)) in [
            ("10.0.0.1", "default_subcluster"),
            ("10.0.0.2", "default_subcluster"),
            ("10.0.0.3", "sc1"),
        ]
        .iter()
        .enumerate()
        {
            details.push(NodeDetails {
                name: format!("v_test_db_node{:04}", i + 1),
                address: address.to_string(),
                database: "test_db".into(),
                state: NodeState::Up,
                is_primary: true,
                is_readonly: false,
                subcluster_name: sc.to_string(),
                sandbox: String::new(),
                catalog_path: String::new(),
                build_info: String::new(),
                last_msg_from_node_at: String::new(),
                version: "v12.0.4".into(),
            });
        }
        CoordinationDatabase::from_node_details("test_db", &details)
    }

    #[test]
    fn removing_the_default_subcluster_is_rejected() {
        let vdb = eon_vdb();
        let err = pre_check(&vdb, "default_subcluster", "default_subcluster").unwrap_err();
        match err {
            OpsError::RemoveDefaultSubcluster { name } => {
                assert_eq!(name, "default_subcluster")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn enterprise_database_is_rejected() {
        let mut vdb = eon_vdb();
        vdb.is_eon = false;
        let err = pre_check(&vdb, "", "sc1").unwrap_err();
        assert!(matches!(err, OpsError::NotEonMode { .. }), "{err}");
    }

    #[test]
    fn member_hosts_are_collected() {
        let vdb = eon_vdb();
        let hosts = pre_check(&vdb, "default_subcluster", "sc1").unwrap();
        assert_eq!(hosts, vec!["10.0.0.3"]);
    }

    #[test]
    fn empty_subcluster_yields_no_hosts() {
        let vdb = eon_vdb();
        let hosts = pre_check(&vdb, "default_subcluster", "sc9").unwrap();
        assert!(hosts.is_empty());
    }
}
