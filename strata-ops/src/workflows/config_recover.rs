//! Rebuilding the persisted cluster config from the agents.

use crate::engine::OperationEngine;
use crate::error::{OpsError, Result};
use crate::ops::nma::{NmaHealthOp, NmaNodesInfoOp};
use crate::ops::{CommandPolicy, Operation};
use crate::workflows::DatabaseOptions;
use strata_core::{ClusterConfig, NodeConfig};

/// Options for manage_config_recover.
#[derive(Debug, Clone, Default)]
pub struct ConfigRecoverOptions {
    /// Common database options.
    pub db: DatabaseOptions,
    /// Whether the database runs in Eon mode.
    pub is_eon: bool,
}

/// Rebuild the cluster config by asking each host's agent for its local
/// node identity. The caller persists the returned config.
pub async fn config_recover(options: &mut ConfigRecoverOptions) -> Result<ClusterConfig> {
    options.db.analyze();
    options.db.validate(CommandPolicy::ConfigRecover)?;

    let instructions: Vec<Box<dyn Operation>> = vec![
        Box::new(NmaHealthOp::new(options.db.hosts.clone())),
        Box::new(NmaNodesInfoOp::new(options.db.hosts.clone(), &options.db.db_name)),
    ];
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    let mut nodes: Vec<NodeConfig> = Vec::new();
    for host in &options.db.hosts {
        let info = engine
            .context
            .nma_node_info
            .get(host)
            .ok_or_else(|| OpsError::UnexpectedResponse {
                op: "manage_config_recover".to_string(),
                host: host.clone(),
                cause: "agent did not report a local node".to_string(),
            })?;
        nodes.push(NodeConfig { name: info.name.clone(), address: host.clone() });
    }
    nodes.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(ClusterConfig {
        db_name: options.db.db_name.clone(),
        hosts: options.db.hosts.clone(),
        nodes,
        is_eon: options.is_eon,
    })
}
