//! The engine that runs an ordered list of operations against one
//! execution context.

pub mod context;

pub use context::ExecutionContext;

use crate::error::Result;
use crate::http::TlsCerts;
use crate::ops::Operation;
use tracing::{error, info};

/// Runs operations strictly in order against a single [`ExecutionContext`].
///
/// For each operation: TLS material is propagated first, then `prepare`;
/// a prepare error aborts the workflow. Unless the operation flagged
/// skip-execute during prepare, `execute` runs next; an execute error still
/// gets `finalize` (best effort) before aborting. `finalize` always runs.
/// The engine never retries and never rolls back; workflows are built so
/// each verb is independently safe or explicitly idempotent.
pub struct OperationEngine {
    operations: Vec<Box<dyn Operation>>,
    certs: Option<TlsCerts>,
    /// Shared state of the run; readable after `run` returns.
    pub context: ExecutionContext,
}

impl OperationEngine {
    /// An engine over the given operations, optionally carrying TLS
    /// material to propagate into every request.
    pub fn new(operations: Vec<Box<dyn Operation>>, certs: Option<TlsCerts>) -> Self {
        OperationEngine {
            operations,
            certs,
            context: ExecutionContext::new(),
        }
    }

    /// Run all operations in order, aborting on the first error.
    pub async fn run(&mut self) -> Result<()> {
        let ctx = &mut self.context;
        for op in &mut self.operations {
            if let Some(certs) = &self.certs {
                op.load_certs(certs);
            }

            info!(operation = %op.name(), "prepare");
            if let Err(e) = op.prepare(ctx).await {
                error!(operation = %op.name(), error = %e, "prepare failed");
                return Err(e);
            }

            if op.skip_execute() {
                info!(operation = %op.name(), "no work to do, skipping execute");
            } else {
                info!(operation = %op.name(), "execute");
                if let Err(e) = op.execute(ctx).await {
                    error!(operation = %op.name(), error = %e, "execute failed");
                    // cleanup still runs on the failure path
                    if let Err(finalize_err) = op.finalize(ctx).await {
                        error!(operation = %op.name(), error = %finalize_err, "finalize failed");
                    }
                    return Err(e);
                }
            }

            op.finalize(ctx).await?;
        }
        Ok(())
    }
}
