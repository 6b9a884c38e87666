//! Sandboxing and unsandboxing subclusters.

use crate::engine::OperationEngine;
use crate::error::{OpsError, Result};
use crate::ops::https::{HttpsGetUpNodesOp, HttpsSandboxOp, HttpsUnsandboxOp};
use crate::ops::{choose_initiator, CommandPolicy, Operation};
use crate::workflows::DatabaseOptions;
use tracing::info;

/// Options for sandbox_subcluster and unsandbox_subcluster.
#[derive(Debug, Clone, Default)]
pub struct SandboxOptions {
    /// Common database options.
    pub db: DatabaseOptions,
    /// Subcluster to (un)sandbox.
    pub sc_name: String,
    /// Sandbox name; ignored when unsandboxing.
    pub sandbox: String,
}

/// Clone a subcluster into a named sandbox.
pub async fn sandbox_subcluster(options: &mut SandboxOptions) -> Result<()> {
    options.db.analyze();
    options.db.validate(CommandPolicy::Sandbox)?;
    if options.sc_name.is_empty() || options.sandbox.is_empty() {
        return Err(OpsError::OptionValidation {
            cause: "must specify a subcluster and a sandbox name".to_string(),
        });
    }
    let auth = options.db.auth()?;

    // the sandbox request must run on a main-cluster up node
    let get_up_nodes = HttpsGetUpNodesOp::new(
        &options.db.db_name,
        options.db.hosts.clone(),
        auth.clone(),
        CommandPolicy::Sandbox,
    )
    .with_subcluster(&options.sc_name);
    let instructions: Vec<Box<dyn Operation>> = vec![Box::new(get_up_nodes)];
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    let main_hosts: Vec<String> = {
        let mut hosts: Vec<String> = engine
            .context
            .up_hosts
            .iter()
            .filter(|host| {
                engine
                    .context
                    .up_sc_info
                    .get(*host)
                    .map(|sc| sc != &options.sc_name)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        hosts.sort();
        hosts
    };
    let initiator = choose_initiator(&main_hosts, &[])?;

    let sandbox_op =
        HttpsSandboxOp::new(vec![initiator], auth, &options.sc_name, &options.sandbox);
    let instructions: Vec<Box<dyn Operation>> = vec![Box::new(sandbox_op)];
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    info!(subcluster = %options.sc_name, sandbox = %options.sandbox, "subcluster sandboxed");
    Ok(())
}

/// Pull a subcluster back out of its sandbox.
pub async fn unsandbox_subcluster(options: &mut SandboxOptions) -> Result<()> {
    options.db.analyze();
    options.db.validate(CommandPolicy::Unsandbox)?;
    if options.sc_name.is_empty() {
        return Err(OpsError::OptionValidation {
            cause: "must specify a subcluster name".to_string(),
        });
    }
    let auth = options.db.auth()?;

    // up-node discovery fills the sandbox map the unsandbox op targets:
    // a node of the same sandbox (different subcluster) plus one
    // main-cluster node
    let get_up_nodes = HttpsGetUpNodesOp::new(
        &options.db.db_name,
        options.db.hosts.clone(),
        auth.clone(),
        CommandPolicy::Unsandbox,
    )
    .with_subcluster(&options.sc_name);
    let unsandbox_op = HttpsUnsandboxOp::new(auth, &options.sc_name);

    let instructions: Vec<Box<dyn Operation>> =
        vec![Box::new(get_up_nodes), Box::new(unsandbox_op)];
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    info!(subcluster = %options.sc_name, "subcluster unsandboxed");
    Ok(())
}
