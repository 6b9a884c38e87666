//! Re-IP: rewriting catalog address assignments after hosts moved.

use crate::engine::OperationEngine;
use crate::error::{OpsError, Result};
use crate::ops::https::{HttpsGetUpNodesOp, HttpsReIpOp};
use crate::ops::nma::{NmaHealthOp, NmaNetworkProfileOp};
use crate::ops::{CommandPolicy, Operation};
use crate::workflows::DatabaseOptions;
use tracing::info;

/// One node-to-address reassignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReIpPair {
    /// The node whose address changes.
    pub node_name: String,
    /// The address it moves to.
    pub new_address: String,
}

/// Options for re_ip.
#[derive(Debug, Clone, Default)]
pub struct ReIpOptions {
    /// Common database options.
    pub db: DatabaseOptions,
    /// The reassignments to apply.
    pub pairs: Vec<ReIpPair>,
}

/// Apply address reassignments to the catalog. The quorum precondition
/// (at least as many UP hosts as pairs) is enforced by the re-IP
/// operation before any request is dispatched; on quorum loss the typed
/// error tells the caller to start the database first.
pub async fn re_ip(options: &mut ReIpOptions) -> Result<()> {
    options.db.analyze();
    options.db.validate(CommandPolicy::ReIp)?;
    if options.pairs.is_empty() {
        return Err(OpsError::OptionValidation {
            cause: "must specify at least one re-ip pair".to_string(),
        });
    }
    let auth = options.db.auth()?;

    let new_addresses: Vec<String> =
        options.pairs.iter().map(|pair| pair.new_address.clone()).collect();
    let node_names: Vec<String> =
        options.pairs.iter().map(|pair| pair.node_name.clone()).collect();

    let instructions: Vec<Box<dyn Operation>> = vec![
        Box::new(NmaHealthOp::new(new_addresses.clone())),
        Box::new(NmaNetworkProfileOp::new(new_addresses.clone())),
        Box::new(HttpsGetUpNodesOp::new(
            &options.db.db_name,
            options.db.hosts.clone(),
            auth.clone(),
            CommandPolicy::ReIp,
        )),
        Box::new(HttpsReIpOp::new(node_names, new_addresses, auth)),
    ];
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    info!(db = %options.db.db_name, pairs = options.pairs.len(), "re-ip complete");
    Ok(())
}
