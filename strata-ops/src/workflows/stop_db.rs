//! Stopping the database.

use crate::engine::OperationEngine;
use crate::error::Result;
use crate::ops::https::{HttpsGetUpNodesOp, HttpsStopDbOp, HttpsSyncCatalogOp};
use crate::ops::{CommandPolicy, Operation};
use crate::workflows::DatabaseOptions;
use tracing::info;

/// Options for stop_db.
#[derive(Debug, Clone, Default)]
pub struct StopDbOptions {
    /// Common database options.
    pub db: DatabaseOptions,
    /// Seconds to wait for active sessions to drain.
    pub drain_seconds: Option<u64>,
    /// Stop only this sandbox (empty stops everything).
    pub sandbox: String,
    /// Stop only the main cluster.
    pub main_cluster_only: bool,
}

/// Stop the database: discover the complete cluster view (validating that
/// the named database is the one running), sync the catalog when Eon, then
/// shut down one initiator per sandbox plus the main cluster.
pub async fn stop_db(options: &mut StopDbOptions) -> Result<()> {
    options.db.analyze();
    options.db.validate(CommandPolicy::StopDb)?;
    let auth = options.db.auth()?;

    let get_up_nodes = HttpsGetUpNodesOp::new(
        &options.db.db_name,
        options.db.hosts.clone(),
        auth.clone(),
        CommandPolicy::StopDb,
    )
    .with_sandbox(&options.sandbox, options.main_cluster_only);

    let mut instructions: Vec<Box<dyn Operation>> = vec![Box::new(get_up_nodes)];
    if options.db.is_eon || !options.db.communal_storage_location.is_empty() {
        // flush the catalog before the nodes go away
        instructions.push(Box::new(HttpsSyncCatalogOp::new(Vec::new(), auth.clone())));
    }
    instructions.push(Box::new(HttpsStopDbOp::new(Vec::new(), auth, options.drain_seconds)));

    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    info!(db = %options.db.db_name, "database stopped");
    Ok(())
}
