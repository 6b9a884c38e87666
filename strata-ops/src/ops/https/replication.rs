//! Cross-database replication start.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;

/// POSTs `replicate/start` on a source UP host to begin replicating to a
/// target database. The target password travels in the body and is masked
/// in logs with the other credential fields.
#[derive(Debug)]
pub struct HttpsStartReplicationOp {
    base: OpBase,
    auth: HttpsAuth,
    target_db_name: String,
    target_hosts: Vec<String>,
    target_username: String,
    target_password: Option<String>,
}

impl HttpsStartReplicationOp {
    /// Start replication toward `target_db_name` on `target_hosts`.
    pub fn new(
        source_hosts: Vec<String>,
        auth: HttpsAuth,
        target_db_name: &str,
        target_hosts: Vec<String>,
        target_username: &str,
        target_password: Option<String>,
    ) -> Self {
        HttpsStartReplicationOp {
            base: OpBase::new("start_replication", source_hosts),
            auth,
            target_db_name: target_db_name.to_string(),
            target_hosts,
            target_username: target_username.to_string(),
            target_password,
        }
    }
}

#[async_trait]
impl Operation for HttpsStartReplicationOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        // with no source host given, the first up host discovered earlier is it
        if self.base.hosts.is_empty() {
            match ctx.up_hosts.first() {
                Some(host) => self.base.hosts = vec![host.clone()],
                None => return Err(OpsError::NoUpNodes),
            }
        }
        ctx.dispatcher.setup(&self.base.hosts);
        let body = serde_json::json!({
            "target_db_name": self.target_db_name,
            "target_hosts": self.target_hosts.join(","),
            "target_username": self.target_username,
            "db_password": self.target_password.clone().unwrap_or_default(),
        })
        .to_string();
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_https_endpoint("replicate/start");
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
