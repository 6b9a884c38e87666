//! NMA health check, the first step of most workflows.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, OpBase, Operation};
use async_trait::async_trait;

/// Fans out GET `health` to the participating hosts; succeeds iff every
/// host answers with a well-formed JSON object.
#[derive(Debug)]
pub struct NmaHealthOp {
    base: OpBase,
}

impl NmaHealthOp {
    /// A health check over the given hosts.
    pub fn new(hosts: Vec<String>) -> Self {
        NmaHealthOp { base: OpBase::new("nma_health", hosts) }
    }
}

#[async_trait]
impl Operation for NmaHealthOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Get, ..Default::default() };
            request.build_nma_endpoint("health");
            self.base.set_request(host, request);
        }
        Ok(())
    }

    async fn process_result(&mut self, _ctx: &mut ExecutionContext) -> Result<()> {
        let mut errors = ErrorCollector::new();
        for result in self.base.request.results.values() {
            self.base.log_response(result);
            if result.is_passing() {
                let parsed: Result<serde_json::Value> =
                    self.base.parse_response(&result.host, &result.content);
                match parsed {
                    Ok(value) if value.is_object() => {}
                    Ok(_) => errors.push(OpsError::UnexpectedResponse {
                        op: self.base.name.clone(),
                        host: result.host.clone(),
                        cause: "health response is not a JSON object".to_string(),
                    }),
                    Err(e) => errors.push(e),
                }
            } else if let Some(error) = result.error_for_join() {
                errors.push(error);
            }
        }
        errors.into_result()
    }
}
