//! Removing nodes from a running database.

use crate::engine::OperationEngine;
use crate::error::{OpsError, Result};
use crate::ops::https::{
    HttpsCheckNodesExistOp, HttpsDropNodeOp, HttpsMarkDesignKsafeOp, HttpsMarkEphemeralOp,
    HttpsRebalanceClusterOp, HttpsRebalanceShardsOp, HttpsReloadSpreadOp, HttpsSpreadRemoveNodeOp,
    HttpsSyncCatalogOp, NodesExistCaller,
};
use crate::ops::nma::NmaDeleteDirectoriesOp;
use crate::ops::{choose_initiator, CommandPolicy, Operation};
use crate::workflows::{get_vdb_from_running_db, DatabaseOptions};
use strata_core::defaults::KSAFETY_THRESHOLD;
use strata_core::util::validate_absolute_path;
use strata_core::CoordinationDatabase;
use tracing::info;

/// Options for db_remove_node.
#[derive(Debug, Clone)]
pub struct RemoveNodeOptions {
    /// Common database options.
    pub db: DatabaseOptions,
    /// Hosts to remove.
    pub hosts_to_remove: Vec<String>,
    /// Delete directories even when they still hold data.
    pub force_delete: bool,
}

impl Default for RemoveNodeOptions {
    fn default() -> Self {
        RemoveNodeOptions {
            db: DatabaseOptions::default(),
            hosts_to_remove: Vec::new(),
            force_delete: true,
        }
    }
}

/// Remove nodes from an existing database. Returns the shrunken
/// coordination model on success.
pub async fn remove_node(options: &mut RemoveNodeOptions) -> Result<CoordinationDatabase> {
    options.db.analyze();
    options.db.validate(CommandPolicy::RemoveNode)?;
    if options.hosts_to_remove.is_empty() {
        return Err(OpsError::OptionValidation {
            cause: "must specify at least one host to remove".to_string(),
        });
    }

    let mut vdb = get_vdb_from_running_db(&options.db).await?;
    if vdb.is_eon && !options.db.depot_prefix.is_empty() {
        validate_absolute_path(&options.db.depot_prefix, "depot path")?;
    }

    // the initiator survives the removal
    let initiator = choose_initiator(&vdb.primary_up_nodes, &options.hosts_to_remove)?;

    let instructions = produce_remove_node_instructions(&vdb, options, &initiator)?;
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    for host in &options.hosts_to_remove {
        vdb.nodes.remove(host);
        vdb.hosts.retain(|h| h != host);
        vdb.primary_up_nodes.retain(|h| h != host);
    }
    info!(db = %vdb.name, hosts = ?options.hosts_to_remove, "nodes removed");
    Ok(vdb)
}

/// Assemble the ordered operation list for remove_node.
///
/// Drop operations are emitted one per node: dropping serially is what
/// preserves quorum while the cluster shrinks.
pub(crate) fn produce_remove_node_instructions(
    vdb: &CoordinationDatabase,
    options: &RemoveNodeOptions,
    initiator: &str,
) -> Result<Vec<Box<dyn Operation>>> {
    let auth = options.db.auth()?;
    let initiator_host = vec![initiator.to_string()];

    let mut instructions: Vec<Box<dyn Operation>> = vec![Box::new(HttpsCheckNodesExistOp::new(
        initiator_host.clone(),
        options.hosts_to_remove.clone(),
        auth.clone(),
        NodesExistCaller::RemoveNode,
    ))];

    if vdb.hosts.len() - options.hosts_to_remove.len() < KSAFETY_THRESHOLD {
        instructions.push(Box::new(HttpsMarkDesignKsafeOp::new(
            initiator_host.clone(),
            auth.clone(),
            0,
        )));
    }

    let mut node_names = Vec::new();
    for host in &options.hosts_to_remove {
        let node = vdb
            .nodes
            .get(host)
            .ok_or_else(|| OpsError::HostsNotInDatabase { hosts: vec![host.clone()] })?;
        node_names.push(node.name.clone());
    }

    for node_name in &node_names {
        instructions.push(Box::new(HttpsMarkEphemeralOp::new(
            node_name,
            initiator_host.clone(),
            auth.clone(),
        )));
    }

    if vdb.is_eon {
        instructions.push(Box::new(HttpsRebalanceShardsOp::new(
            initiator_host.clone(),
            auth.clone(),
            "",
        )));
    } else {
        instructions.push(Box::new(HttpsRebalanceClusterOp::new(
            initiator_host.clone(),
            auth.clone(),
        )));
    }

    instructions.push(Box::new(HttpsSpreadRemoveNodeOp::new(
        initiator_host.clone(),
        auth.clone(),
        node_names.clone(),
    )));

    for node_name in &node_names {
        instructions.push(Box::new(HttpsDropNodeOp::new(
            node_name,
            initiator_host.clone(),
            auth.clone(),
            vdb.is_eon,
        )));
    }

    let removed_vdb = vdb.subset(&options.hosts_to_remove);
    instructions.push(Box::new(NmaDeleteDirectoriesOp::new(&removed_vdb, options.force_delete)));
    instructions.push(Box::new(HttpsReloadSpreadOp::new(initiator_host.clone(), auth.clone())));

    if vdb.is_eon {
        instructions.push(Box::new(HttpsSyncCatalogOp::new(initiator_host, auth)));
    }
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{NodeDetails, NodeState};

    fn vdb(primary_up: &[&str], eon: bool) -> CoordinationDatabase {
        let details: Vec<NodeDetails> = primary_up
            .iter()
            .enumerate()
            .map(|(i, address)| NodeDetails {
                name: format!("v_test_db_node{:04}", i + 1),
                address: address.to_string(),
                database: "test_db".into(),
                state: NodeState::Up,
                is_primary: true,
                is_readonly: false,
                subcluster_name: if eon { "default_subcluster".into() } else { String::new() },
                sandbox: String::new(),
                catalog_path: format!("/catalog/test_db/node{:04}_catalog", i + 1),
                build_info: String::new(),
                last_msg_from_node_at: String::new(),
                version: "v12.0.4".into(),
            })
            .collect();
        CoordinationDatabase::from_node_details("test_db", &details)
    }

    fn options(hosts_to_remove: &[&str]) -> RemoveNodeOptions {
        RemoveNodeOptions {
            db: DatabaseOptions {
                db_name: "test_db".into(),
                hosts: vec!["10.0.0.1".into()],
                ..Default::default()
            },
            hosts_to_remove: hosts_to_remove.iter().map(|h| h.to_string()).collect(),
            force_delete: true,
        }
    }

    #[test]
    fn one_drop_op_per_removed_host() {
        let vdb = vdb(&["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5"], true);
        let options = options(&["10.0.0.4", "10.0.0.5"]);
        let instructions =
            produce_remove_node_instructions(&vdb, &options, "10.0.0.1").unwrap();
        let drops = instructions.iter().filter(|op| op.name() == "drop_node").count();
        assert_eq!(drops, 2);
    }

    #[test]
    fn initiator_avoids_removed_hosts_and_drop_targets_the_right_node() {
        let vdb = vdb(&["10.0.0.1", "10.0.0.2", "10.0.0.3"], false);
        let initiator = choose_initiator(&vdb.primary_up_nodes, &["10.0.0.3".to_string()]).unwrap();
        assert_eq!(initiator, "10.0.0.1");

        let options = options(&["10.0.0.3"]);
        let instructions = produce_remove_node_instructions(&vdb, &options, &initiator).unwrap();
        let drops: Vec<&str> = instructions
            .iter()
            .filter(|op| op.name() == "drop_node")
            .map(|op| op.name())
            .collect();
        assert_eq!(drops.len(), 1);
        // ksafety drops below threshold: the 3-node database shrinks to 2
        assert!(instructions.iter().any(|op| op.name() == "mark_design_ksafe"));
        // the delete-directories op covers only the removed host
        assert!(instructions.iter().any(|op| op.name() == "delete_directories"));
    }

    #[test]
    fn large_cluster_keeps_ksafety() {
        let vdb = vdb(&["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"], true);
        let options = options(&["10.0.0.4"]);
        let instructions =
            produce_remove_node_instructions(&vdb, &options, "10.0.0.1").unwrap();
        assert!(!instructions.iter().any(|op| op.name() == "mark_design_ksafe"));
    }

    #[test]
    fn eon_removal_ends_with_catalog_sync() {
        let vdb = vdb(&["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"], true);
        let options = options(&["10.0.0.4"]);
        let instructions =
            produce_remove_node_instructions(&vdb, &options, "10.0.0.1").unwrap();
        assert_eq!(instructions.last().unwrap().name(), "sync_catalog");
    }
}
