//! Dropping a stopped database.

use crate::engine::OperationEngine;
use crate::error::Result;
use crate::ops::nma::{NmaDeleteDirectoriesOp, NmaHealthOp};
use crate::ops::{CommandPolicy, Operation};
use crate::workflows::{vdb_from_config, DatabaseOptions};
use strata_core::ClusterConfig;
use tracing::info;

/// Options for drop_db.
#[derive(Debug, Clone)]
pub struct DropDbOptions {
    /// Common database options.
    pub db: DatabaseOptions,
    /// The persisted cluster config describing the topology to drop.
    pub config: ClusterConfig,
    /// Delete directories even when they still hold data.
    pub force_delete: bool,
}

/// Drop a stopped database by removing its directories on every host. The
/// database must already be down; dropping never stops nodes.
pub async fn drop_db(options: &mut DropDbOptions) -> Result<()> {
    options.db.analyze();
    options.db.is_eon = options.db.is_eon || options.config.is_eon;
    options.db.validate(CommandPolicy::DropDb)?;

    let vdb = vdb_from_config(&options.config, &options.db);

    let instructions: Vec<Box<dyn Operation>> = vec![
        Box::new(NmaHealthOp::new(vdb.hosts.clone())),
        Box::new(NmaDeleteDirectoriesOp::new(&vdb, options.force_delete)),
    ];
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    info!(db = %vdb.name, "database dropped");
    Ok(())
}
