//! Node-state fetch for callers that want the raw per-node details.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;
use strata_core::NodesResponse;

/// Fans out GET `nodes` and keeps the first usable response's node list in
/// the context; the HTTPS service reports the whole cluster, so one
/// responding host is enough.
#[derive(Debug)]
pub struct HttpsNodeStateOp {
    base: OpBase,
    auth: HttpsAuth,
}

impl HttpsNodeStateOp {
    /// A node-state fetch through the given hosts.
    pub fn new(hosts: Vec<String>, auth: HttpsAuth) -> Self {
        HttpsNodeStateOp { base: OpBase::new("node_state", hosts), auth }
    }
}

#[async_trait]
impl Operation for HttpsNodeStateOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Get, ..Default::default() };
            request.build_https_endpoint("nodes");
            self.auth.apply(&mut request);
            self.base.set_request(host, request);
        }
        Ok(())
    }

    async fn process_result(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        let mut errors = ErrorCollector::new();

        let mut hosts: Vec<String> = self.base.request.results.keys().cloned().collect();
        hosts.sort();

        for host in &hosts {
            let result = &self.base.request.results[host];
            self.base.log_response(result);

            if result.is_credential_error() {
                return Err(OpsError::Unauthorized { host: host.clone() });
            }
            if !result.is_passing() {
                if let Some(error) = result.error_for_join() {
                    errors.push(error);
                }
                continue;
            }

            let response: NodesResponse = self.base.parse_response(host, &result.content)?;
            ctx.node_details = response.node_list;
            return Ok(());
        }
        errors.push(OpsError::NoUpNodes);
        errors.into_result()
    }
}
