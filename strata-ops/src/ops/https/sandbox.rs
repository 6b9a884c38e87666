//! Sandboxing and unsandboxing subclusters.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;

/// POSTs `subclusters/{name}/sandbox` on a main-cluster initiator to clone
/// the subcluster into a named sandbox.
#[derive(Debug)]
pub struct HttpsSandboxOp {
    base: OpBase,
    auth: HttpsAuth,
    sc_name: String,
    sandbox: String,
}

impl HttpsSandboxOp {
    /// Sandbox `sc_name` as `sandbox` through the initiator.
    pub fn new(initiator: Vec<String>, auth: HttpsAuth, sc_name: &str, sandbox: &str) -> Self {
        HttpsSandboxOp {
            base: OpBase::new("sandbox_subcluster", initiator),
            auth,
            sc_name: sc_name.to_string(),
            sandbox: sandbox.to_string(),
        }
    }
}

#[async_trait]
impl Operation for HttpsSandboxOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_https_endpoint(&format!("subclusters/{}/sandbox", self.sc_name));
            request
                .query_params
                .insert("sandbox".to_string(), self.sandbox.clone());
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

/// POSTs `subclusters/{name}/unsandbox` against the hosts discovered by
/// up-node discovery: a node of the same sandbox (different subcluster)
/// plus one main-cluster node.
#[derive(Debug)]
pub struct HttpsUnsandboxOp {
    base: OpBase,
    auth: HttpsAuth,
    sc_name: String,
}

impl HttpsUnsandboxOp {
    /// Unsandbox `sc_name`; target hosts come from the context at prepare
    /// time.
    pub fn new(auth: HttpsAuth, sc_name: &str) -> Self {
        HttpsUnsandboxOp {
            base: OpBase::new("unsandbox_subcluster", Vec::new()),
            auth,
            sc_name: sc_name.to_string(),
        }
    }
}

#[async_trait]
impl Operation for HttpsUnsandboxOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        let mut hosts: Vec<String> = ctx.sandbox_info.keys().cloned().collect();
        hosts.sort();
        if hosts.is_empty() {
            return Err(OpsError::NoUpNodes);
        }
        self.base.hosts = hosts.clone();

        ctx.dispatcher.setup(&hosts);
        for host in &hosts {
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_https_endpoint(&format!("subclusters/{}/unsandbox", self.sc_name));
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
            }
        }
        errors.into_result()
    }
}
