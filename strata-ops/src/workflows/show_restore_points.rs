//! Listing restore points of an Eon database.

use crate::engine::OperationEngine;
use crate::error::Result;
use crate::ops::https::{HttpsGetUpNodesOp, HttpsShowRestorePointsOp, RestorePoint};
use crate::ops::{CommandPolicy, Operation};
use crate::workflows::DatabaseOptions;

/// Options for show_restore_points.
#[derive(Debug, Clone, Default)]
pub struct ShowRestorePointsOptions {
    /// Common database options.
    pub db: DatabaseOptions,
    /// List only this archive; empty lists everything.
    pub archive: String,
}

/// List restore points through an UP node.
pub async fn show_restore_points(
    options: &mut ShowRestorePointsOptions,
) -> Result<Vec<RestorePoint>> {
    options.db.analyze();
    options.db.validate(CommandPolicy::ShowRestorePoints)?;
    let auth = options.db.auth()?;

    let instructions: Vec<Box<dyn Operation>> = vec![
        Box::new(HttpsGetUpNodesOp::new(
            &options.db.db_name,
            options.db.hosts.clone(),
            auth.clone(),
            CommandPolicy::ShowRestorePoints,
        )),
        Box::new(HttpsShowRestorePointsOp::new(Vec::new(), auth, &options.archive)),
    ];
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    Ok(engine.context.restore_points.clone())
}
