//! Starting a stopped database.

use crate::engine::OperationEngine;
use crate::error::Result;
use crate::ops::https::HttpsPollNodeStateOp;
use crate::ops::nma::{NmaHealthOp, NmaReadCatalogEditorOp, NmaStartNodeOp, NmaVersionOp};
use crate::ops::{CommandPolicy, Operation};
use crate::workflows::{vdb_from_config, DatabaseOptions};
use strata_core::{ClusterConfig, CoordinationDatabase};
use tracing::info;

/// Options for start_db.
#[derive(Debug, Clone, Default)]
pub struct StartDbOptions {
    /// Common database options.
    pub db: DatabaseOptions,
    /// The persisted cluster config describing the topology to start.
    pub config: ClusterConfig,
}

/// Start the database: verify the agents, read the latest catalog to find
/// the proper start commands, start every node, and wait until all of them
/// report UP.
pub async fn start_db(options: &mut StartDbOptions) -> Result<CoordinationDatabase> {
    options.db.analyze();
    options.db.validate(CommandPolicy::StartDb)?;
    let auth = options.db.auth()?;

    let vdb = vdb_from_config(&options.config, &options.db);
    let hosts = vdb.hosts.clone();

    let instructions: Vec<Box<dyn Operation>> = vec![
        Box::new(NmaHealthOp::new(hosts.clone())),
        Box::new(NmaVersionOp::new(hosts.clone(), true)),
        Box::new(NmaReadCatalogEditorOp::new(Vec::new(), &vdb)?),
        Box::new(NmaStartNodeOp::new(hosts.clone(), &vdb)?),
        Box::new(HttpsPollNodeStateOp::new(hosts, auth)),
    ];
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    info!(db = %vdb.name, "database started");
    Ok(vdb)
}
