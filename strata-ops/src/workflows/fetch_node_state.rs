//! Fetching per-node state for display.

use crate::engine::OperationEngine;
use crate::error::{OpsError, Result};
use crate::ops::https::HttpsNodeStateOp;
use crate::ops::Operation;
use crate::workflows::DatabaseOptions;
use strata_core::util::validate_db_name;
use strata_core::NodeDetails;

/// Options for fetch_nodes_details.
#[derive(Debug, Clone, Default)]
pub struct FetchNodeStateOptions {
    /// Common database options.
    pub db: DatabaseOptions,
}

/// Fetch the state of every node in the cluster.
pub async fn fetch_node_state(options: &mut FetchNodeStateOptions) -> Result<Vec<NodeDetails>> {
    options.db.analyze();
    if !options.db.db_name.is_empty() {
        validate_db_name(&options.db.db_name)?;
    }
    if options.db.hosts.is_empty() {
        return Err(OpsError::OptionValidation {
            cause: "must specify a host or host list".to_string(),
        });
    }

    let node_state = HttpsNodeStateOp::new(options.db.hosts.clone(), options.db.auth()?);
    let instructions: Vec<Box<dyn Operation>> = vec![Box::new(node_state)];
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    Ok(engine.context.node_details.clone())
}
