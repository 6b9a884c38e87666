//! Dropping a subcluster name from the catalog.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;

/// POSTs `subclusters/{name}/drop` on the initiator. One host suffices:
/// the endpoint drops the subcluster cluster-wide.
#[derive(Debug)]
pub struct HttpsDropSubclusterOp {
    base: OpBase,
    auth: HttpsAuth,
    sc_name: String,
}

impl HttpsDropSubclusterOp {
    /// Drop `sc_name` through the initiator.
    pub fn new(initiator: Vec<String>, auth: HttpsAuth, sc_name: &str) -> Self {
        HttpsDropSubclusterOp {
            base: OpBase::new("drop_subcluster", initiator),
            auth,
            sc_name: sc_name.to_string(),
        }
    }
}

#[async_trait]
impl Operation for HttpsDropSubclusterOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_https_endpoint(&format!("subclusters/{}/drop", self.sc_name));
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
