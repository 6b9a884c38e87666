//! Starting replication toward a target database.

use crate::engine::OperationEngine;
use crate::error::{OpsError, Result};
use crate::ops::https::{HttpsGetUpNodesOp, HttpsStartReplicationOp};
use crate::ops::{CommandPolicy, Operation};
use crate::workflows::DatabaseOptions;

/// Options for replication_start.
#[derive(Debug, Clone, Default)]
pub struct ReplicationOptions {
    /// Common (source database) options.
    pub db: DatabaseOptions,
    /// Target database name.
    pub target_db_name: String,
    /// Target database hosts.
    pub target_hosts: Vec<String>,
    /// Username on the target database.
    pub target_username: String,
    /// Password on the target database.
    pub target_password: Option<String>,
}

/// Start replicating from the source database's main cluster to the
/// target database.
pub async fn replication_start(options: &mut ReplicationOptions) -> Result<()> {
    options.db.analyze();
    options.db.validate(CommandPolicy::Replication)?;
    if options.target_db_name.is_empty() || options.target_hosts.is_empty() {
        return Err(OpsError::OptionValidation {
            cause: "must specify a target database and target hosts".to_string(),
        });
    }
    let auth = options.db.auth()?;

    let instructions: Vec<Box<dyn Operation>> = vec![
        Box::new(HttpsGetUpNodesOp::new(
            &options.db.db_name,
            options.db.hosts.clone(),
            auth.clone(),
            CommandPolicy::Replication,
        )),
        Box::new(HttpsStartReplicationOp::new(
            Vec::new(),
            auth,
            &options.target_db_name,
            options.target_hosts.clone(),
            &options.target_username,
            options.target_password.clone(),
        )),
    ];
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await
}
