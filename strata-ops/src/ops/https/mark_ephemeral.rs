//! Marking a node ephemeral ahead of its removal.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;

/// PUTs `nodes/{name}/ephemeral` on the initiator so the rebalance that
/// follows moves data off the node.
#[derive(Debug)]
pub struct HttpsMarkEphemeralOp {
    base: OpBase,
    auth: HttpsAuth,
    node_name: String,
}

impl HttpsMarkEphemeralOp {
    /// Mark `node_name` ephemeral through the initiator.
    pub fn new(node_name: &str, initiator: Vec<String>, auth: HttpsAuth) -> Self {
        HttpsMarkEphemeralOp {
            base: OpBase::new("mark_ephemeral", initiator),
            auth,
            node_name: node_name.to_string(),
        }
    }
}

#[async_trait]
impl Operation for HttpsMarkEphemeralOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Put, ..Default::default() };
            request.build_https_endpoint(&format!("nodes/{}/ephemeral", self.node_name));
            self.auth.apply(&mut request);
            self.base.set_request(host, request);
        }
        Ok(())
    }

    async fn process_result(&mut self, _ctx: &mut ExecutionContext) -> Result<()> {
        let mut errors = ErrorCollector::new();
        for result in self.base.request.results.values() {
            self.base.log_response(result);
            if result.is_unauthorized() {
                return Err(OpsError::Unauthorized { host: result.host.clone() });
            }
            if result.is_passing() {
                self.base.check_response_status(&result.host, &result.content)?;
                return Ok(());
            }
            if let Some(error) = result.error_for_join() {
                errors.push(error);
            }
        }
        errors.into_result()
    }
}
