//! Dropping one node from the catalog.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;

/// POSTs `nodes/{name}/drop` on the initiator.
///
/// Workflows emit one drop operation per node rather than a batched one:
/// dropping serially is what keeps quorum intact while the cluster
/// shrinks.
#[derive(Debug)]
pub struct HttpsDropNodeOp {
    base: OpBase,
    auth: HttpsAuth,
    node_name: String,
    cascade: bool,
}

impl HttpsDropNodeOp {
    /// Drop `node_name` through the initiator. `cascade` is set for Eon
    /// databases so dependent objects follow the node.
    pub fn new(node_name: &str, initiator: Vec<String>, auth: HttpsAuth, cascade: bool) -> Self {
        HttpsDropNodeOp {
            base: OpBase::new("drop_node", initiator),
            auth,
            node_name: node_name.to_string(),
            cascade,
        }
    }

    /// The node this operation drops.
    pub fn node_name(&self) -> &str {
        &self.node_name
    }
}

#[async_trait]
impl Operation for HttpsDropNodeOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_https_endpoint(&format!("nodes/{}/drop", self.node_name));
            request
                .query_params
                .insert("cascade".to_string(), self.cascade.to_string());
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
