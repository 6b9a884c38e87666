//! Spread (membership layer) maintenance.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;

/// POSTs `config/spread/reload` so the membership layer picks up a changed
/// topology. The response detail must be exactly `"Reloaded"`.
#[derive(Debug)]
pub struct HttpsReloadSpreadOp {
    base: OpBase,
    auth: HttpsAuth,
}

impl HttpsReloadSpreadOp {
    /// Reload spread through the given hosts.
    pub fn new(hosts: Vec<String>, auth: HttpsAuth) -> Self {
        HttpsReloadSpreadOp { base: OpBase::new("reload_spread", hosts), auth }
    }
}

#[async_trait]
impl Operation for HttpsReloadSpreadOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_https_endpoint("config/spread/reload");
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
            if !result.is_passing() {
                if let Some(error) = result.error_for_join() {
                    errors.push(error);
                }
                continue;
            }
            // the successful response reads {"detail": "Reloaded"}
            let response = self.base.parse_map_response(&result.host, &result.content)?;
            match response.get("detail").map(String::as_str) {
                Some("Reloaded") => {}
                other => errors.push(OpsError::UnexpectedResponse {
                    op: self.base.name.clone(),
                    host: result.host.clone(),
                    cause: format!("detail should be \"Reloaded\" but got {other:?}"),
                }),
            }
        }
        errors.into_result()
    }
}

/// POSTs `config/spread/remove` on the initiator to take dropped nodes out
/// of the membership layer.
#[derive(Debug)]
pub struct HttpsSpreadRemoveNodeOp {
    base: OpBase,
    auth: HttpsAuth,
    node_names: Vec<String>,
}

impl HttpsSpreadRemoveNodeOp {
    /// Remove `node_names` from spread through the initiator.
    pub fn new(initiator: Vec<String>, auth: HttpsAuth, node_names: Vec<String>) -> Self {
        HttpsSpreadRemoveNodeOp {
            base: OpBase::new("spread_remove_node", initiator),
            auth,
            node_names,
        }
    }
}

#[async_trait]
impl Operation for HttpsSpreadRemoveNodeOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let body = serde_json::json!({ "node_names": self.node_names }).to_string();
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_https_endpoint("config/spread/remove");
            request.body = Some(body.clone());
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
                return Ok(());
            }
            if let Some(error) = result.error_for_join() {
                errors.push(error);
            }
        }
        errors.into_result()
    }
}
