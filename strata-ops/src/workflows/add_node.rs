//! Adding nodes to a running database.

use crate::engine::OperationEngine;
use crate::error::{OpsError, Result};
use crate::ops::https::{
    HttpsCreateDepotOp, HttpsCreateNodeOp, HttpsFindSubclusterOp, HttpsPollNodeStateOp,
    HttpsRebalanceShardsOp, HttpsReloadSpreadOp, HttpsSyncCatalogOp,
};
use crate::ops::nma::{
    NmaDownloadConfigOp, NmaHealthOp, NmaNetworkProfileOp, NmaPrepareDirectoriesOp,
    NmaReadCatalogEditorOp, NmaStartNodeOp, NmaUploadConfigOp, NmaVersionOp,
};
use crate::ops::{choose_initiator, CommandPolicy, Operation};
use crate::workflows::{get_vdb_from_running_db, DatabaseOptions};
use strata_core::util::validate_absolute_path;
use strata_core::util::validate_depot_size;
use strata_core::CoordinationDatabase;
use tracing::info;

/// Options for db_add_node.
#[derive(Debug, Clone, Default)]
pub struct AddNodeOptions {
    /// Common database options.
    pub db: DatabaseOptions,
    /// Hosts to add.
    pub new_hosts: Vec<String>,
    /// Subcluster to add the nodes to; empty targets the default.
    pub sc_name: String,
    /// Depot size for the new nodes, e.g. `10G`; empty uses the server
    /// default.
    pub depot_size: String,
    /// Skip the shard rebalance that normally follows (Eon).
    pub skip_rebalance_shards: bool,
}

/// Add nodes to an existing database. Returns the updated coordination
/// model on success.
pub async fn add_node(options: &mut AddNodeOptions) -> Result<CoordinationDatabase> {
    options.db.analyze();
    options.db.validate(CommandPolicy::AddNode)?;
    if options.new_hosts.is_empty() {
        return Err(OpsError::OptionValidation {
            cause: "must specify at least one host to add".to_string(),
        });
    }
    if !options.depot_size.is_empty() {
        validate_depot_size(&options.depot_size)?;
    }

    let mut vdb = get_vdb_from_running_db(&options.db).await?;

    if vdb.is_eon {
        // now that the running database confirmed Eon mode, the depot
        // prefix becomes mandatory
        validate_absolute_path(&options.db.depot_prefix, "depot path")?;
    }

    // the workflow is aborted before any state-changing operation when one
    // of the hosts is already in the database
    let duplicates: Vec<String> = options
        .new_hosts
        .iter()
        .filter(|host| vdb.contains_host(host))
        .cloned()
        .collect();
    if !duplicates.is_empty() {
        return Err(OpsError::HostsAlreadyInDatabase { hosts: duplicates });
    }

    let initiator = choose_initiator(&vdb.primary_up_nodes, &[])?;
    vdb.add_hosts(&options.new_hosts, &options.sc_name);

    let instructions = produce_add_node_instructions(&vdb, options, &initiator)?;
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    info!(db = %vdb.name, hosts = ?options.new_hosts, "nodes added");
    Ok(vdb)
}

/// Assemble the ordered operation list for add_node.
pub(crate) fn produce_add_node_instructions(
    vdb: &CoordinationDatabase,
    options: &AddNodeOptions,
    initiator: &str,
) -> Result<Vec<Box<dyn Operation>>> {
    let auth = options.db.auth()?;
    let initiator_host = vec![initiator.to_string()];
    let new_hosts = options.new_hosts.clone();

    // hosts actively participating in the workflow
    let mut active_hosts = initiator_host.clone();
    active_hosts.extend(new_hosts.iter().cloned());

    let mut instructions: Vec<Box<dyn Operation>> = vec![
        Box::new(NmaHealthOp::new(active_hosts.clone())),
        Box::new(NmaVersionOp::new(active_hosts.clone(), true)),
    ];

    if vdb.is_eon {
        instructions.push(Box::new(HttpsFindSubclusterOp::new(
            initiator_host.clone(),
            auth.clone(),
            &options.sc_name,
            false,
            false,
        )));
    }

    let new_hosts_vdb = vdb.subset(&new_hosts);
    instructions.push(Box::new(NmaPrepareDirectoriesOp::new(&new_hosts_vdb, false)?));
    instructions.push(Box::new(NmaNetworkProfileOp::new(active_hosts.clone())));
    instructions.push(Box::new(HttpsCreateNodeOp::new(
        initiator_host.clone(),
        new_hosts.clone(),
        auth.clone(),
        &format!("{}/{}", vdb.catalog_prefix, vdb.name),
        &format!("{}/{}", vdb.data_prefix, vdb.name),
        &options.sc_name,
    )));
    instructions.push(Box::new(HttpsReloadSpreadOp::new(initiator_host.clone(), auth.clone())));
    instructions.push(Box::new(NmaReadCatalogEditorOp::new(initiator_host.clone(), vdb)?));

    produce_transfer_config_ops(&mut instructions, &initiator_host, &new_hosts, vdb)?;

    instructions.push(Box::new(NmaStartNodeOp::new(new_hosts.clone(), vdb)?));
    instructions.push(Box::new(HttpsPollNodeStateOp::new(new_hosts.clone(), auth.clone())));

    if vdb.use_depot {
        instructions.push(Box::new(HttpsCreateDepotOp::new(
            vdb,
            new_hosts,
            auth.clone(),
            &options.depot_size,
        )?));
    }
    if vdb.is_eon {
        instructions.push(Box::new(HttpsSyncCatalogOp::new(initiator_host.clone(), auth.clone())));
        if !options.skip_rebalance_shards {
            instructions.push(Box::new(HttpsRebalanceShardsOp::new(
                initiator_host,
                auth,
                &options.sc_name,
            )));
        }
    }

    Ok(instructions)
}

/// Emit download/upload pairs moving the server and spread config files
/// from a node with the latest catalog to the new hosts.
pub(crate) fn produce_transfer_config_ops(
    instructions: &mut Vec<Box<dyn Operation>>,
    source_hosts: &[String],
    target_hosts: &[String],
    vdb: &CoordinationDatabase,
) -> Result<()> {
    for endpoint in ["config/vertica", "config/spread"] {
        instructions.push(Box::new(NmaDownloadConfigOp::new(
            "transfer_config",
            source_hosts.to_vec(),
            endpoint,
            vdb,
        )?));
        instructions.push(Box::new(NmaUploadConfigOp::new(
            "transfer_config",
            target_hosts.to_vec(),
            endpoint,
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{NodeDetails, NodeState};

    fn eon_vdb() -> CoordinationDatabase {
        let details: Vec<NodeDetails> = (1..=3)
            .map(|i| NodeDetails {
                name: format!("v_test_db_node000{i}"),
                address: format!("10.0.0.{i}"),
                database: "test_db".into(),
                state: NodeState::Up,
                is_primary: true,
                is_readonly: false,
                subcluster_name: "default_subcluster".into(),
                sandbox: String::new(),
                catalog_path: format!("/catalog/test_db/v_test_db_node000{i}_catalog"),
                build_info: String::new(),
                last_msg_from_node_at: String::new(),
                version: "v12.0.4".into(),
            })
            .collect();
        let mut vdb = CoordinationDatabase::from_node_details("test_db", &details);
        vdb.catalog_prefix = "/catalog".into();
        vdb.data_prefix = "/data".into();
        vdb.depot_prefix = "/depot".into();
        vdb.use_depot = true;
        vdb
    }

    fn collapse_consecutive(names: Vec<&str>) -> Vec<String> {
        let mut collapsed: Vec<String> = Vec::new();
        for name in names {
            if collapsed.last().map(String::as_str) != Some(name) {
                collapsed.push(name.to_string());
            }
        }
        collapsed
    }

    #[test]
    fn eon_add_node_emits_the_expected_sequence() {
        let mut vdb = eon_vdb();
        vdb.add_hosts(&["10.0.0.4".to_string()], "default_subcluster");

        let options = AddNodeOptions {
            db: DatabaseOptions {
                db_name: "test_db".into(),
                hosts: vec!["10.0.0.1".into(), "10.0.0.2".into(), "10.0.0.3".into()],
                depot_prefix: "/depot".into(),
                ..Default::default()
            },
            new_hosts: vec!["10.0.0.4".into()],
            ..Default::default()
        };

        let instructions = produce_add_node_instructions(&vdb, &options, "10.0.0.1").unwrap();
        let names = collapse_consecutive(instructions.iter().map(|op| op.name()).collect());
        assert_eq!(
            names,
            vec![
                "nma_health",
                "nma_version",
                "find_subcluster",
                "prepare_directories",
                "network_profile",
                "create_node",
                "reload_spread",
                "read_catalog_editor",
                "transfer_config",
                "start_node",
                "poll_node_state",
                "create_depot",
                "sync_catalog",
                "rebalance_shards",
            ]
        );
    }

    #[test]
    fn skip_rebalance_drops_the_last_op() {
        let mut vdb = eon_vdb();
        vdb.add_hosts(&["10.0.0.4".to_string()], "default_subcluster");
        let options = AddNodeOptions {
            db: DatabaseOptions {
                db_name: "test_db".into(),
                hosts: vec!["10.0.0.1".into()],
                ..Default::default()
            },
            new_hosts: vec!["10.0.0.4".into()],
            skip_rebalance_shards: true,
            ..Default::default()
        };
        let instructions = produce_add_node_instructions(&vdb, &options, "10.0.0.1").unwrap();
        assert_eq!(instructions.last().unwrap().name(), "sync_catalog");
    }
}
