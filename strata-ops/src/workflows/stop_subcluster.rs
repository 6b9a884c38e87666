//! Stopping all nodes of one subcluster.

use crate::engine::OperationEngine;
use crate::error::{OpsError, Result};
use crate::ops::https::{HttpsGetUpNodesOp, HttpsStopDbOp};
use crate::ops::{CommandPolicy, Operation};
use crate::workflows::DatabaseOptions;
use tracing::info;

/// Options for stop_subcluster.
#[derive(Debug, Clone, Default)]
pub struct StopSubclusterOptions {
    /// Common database options.
    pub db: DatabaseOptions,
    /// Subcluster to stop.
    pub sc_name: String,
    /// Seconds to wait for active sessions to drain.
    pub drain_seconds: Option<u64>,
}

/// Stop a subcluster's nodes through one of its own UP nodes.
pub async fn stop_subcluster(options: &mut StopSubclusterOptions) -> Result<()> {
    options.db.analyze();
    options.db.validate(CommandPolicy::StopSubcluster)?;
    if options.sc_name.is_empty() {
        return Err(OpsError::OptionValidation {
            cause: "must specify a subcluster name".to_string(),
        });
    }
    let auth = options.db.auth()?;

    let get_up_nodes = HttpsGetUpNodesOp::new(
        &options.db.db_name,
        options.db.hosts.clone(),
        auth.clone(),
        CommandPolicy::StopSubcluster,
    )
    .with_subcluster(&options.sc_name);
    let stop_op =
        HttpsStopDbOp::new_subcluster(Vec::new(), auth, &options.sc_name, options.drain_seconds);

    let instructions: Vec<Box<dyn Operation>> = vec![Box::new(get_up_nodes), Box::new(stop_op)];
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    info!(subcluster = %options.sc_name, "subcluster stopped");
    Ok(())
}
