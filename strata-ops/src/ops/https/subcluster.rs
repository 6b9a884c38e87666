//! Subcluster creation.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;

/// POSTs `subclusters` on the initiator to create a named subcluster.
#[derive(Debug)]
pub struct HttpsAddSubclusterOp {
    base: OpBase,
    auth: HttpsAuth,
    sc_name: String,
    is_primary: bool,
    control_set_size: Option<i32>,
}

impl HttpsAddSubclusterOp {
    /// Create `sc_name` through the initiator.
    pub fn new(
        initiator: Vec<String>,
        auth: HttpsAuth,
        sc_name: &str,
        is_primary: bool,
        control_set_size: Option<i32>,
    ) -> Self {
        HttpsAddSubclusterOp {
            base: OpBase::new("add_subcluster", initiator),
            auth,
            sc_name: sc_name.to_string(),
            is_primary,
            control_set_size,
        }
    }
}

#[async_trait]
impl Operation for HttpsAddSubclusterOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_https_endpoint("subclusters");
            request
                .query_params
                .insert("name".to_string(), self.sc_name.clone());
            request
                .query_params
                .insert("is-primary".to_string(), self.is_primary.to_string());
            if let Some(size) = self.control_set_size {
                request
                    .query_params
                    .insert("control-set-size".to_string(), size.to_string());
            }
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
