//! Design K-safety changes during cluster shrink and growth.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;

/// PUTs `cluster/k-safety` on the initiator. Setting K to zero disables
/// the redundancy requirement so a database can shrink below three nodes.
#[derive(Debug)]
pub struct HttpsMarkDesignKsafeOp {
    base: OpBase,
    auth: HttpsAuth,
    k: u32,
}

impl HttpsMarkDesignKsafeOp {
    /// Mark the design K-safe at `k` through the initiator.
    pub fn new(initiator: Vec<String>, auth: HttpsAuth, k: u32) -> Self {
        HttpsMarkDesignKsafeOp {
            base: OpBase::new("mark_design_ksafe", initiator),
            auth,
            k,
        }
    }
}

#[async_trait]
impl Operation for HttpsMarkDesignKsafeOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Put, ..Default::default() };
            request.build_https_endpoint("cluster/k-safety");
            request.query_params.insert("k".to_string(), self.k.to_string());
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
            // the successful response reads {"detail": "Marked design <k>-safe"}
            let response = self.base.parse_map_response(&result.host, &result.content)?;
            let expected = format!("Marked design {}-safe", self.k);
            match response.get("detail") {
                Some(detail) if detail.contains(&expected) => return Ok(()),
                other => errors.push(OpsError::UnexpectedResponse {
                    op: self.base.name.clone(),
                    host: result.host.clone(),
                    cause: format!("detail should be {expected:?} but got {other:?}"),
                }),
            }
        }
        errors.into_result()
    }
}
