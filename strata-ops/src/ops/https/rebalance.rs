//! Data rebalancing after topology changes.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;
use std::time::Duration;

// rebalancing moves data; give it room before timing out
const REBALANCE_TIMEOUT: Duration = Duration::from_secs(600);

/// POSTs `cluster/rebalance` on the initiator (enterprise mode).
#[derive(Debug)]
pub struct HttpsRebalanceClusterOp {
    base: OpBase,
    auth: HttpsAuth,
}

impl HttpsRebalanceClusterOp {
    /// Rebalance the cluster through the initiator.
    pub fn new(initiator: Vec<String>, auth: HttpsAuth) -> Self {
        HttpsRebalanceClusterOp {
            base: OpBase::new("rebalance_cluster", initiator),
            auth,
        }
    }
}

#[async_trait]
impl Operation for HttpsRebalanceClusterOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_https_endpoint("cluster/rebalance");
            request.timeout = Some(REBALANCE_TIMEOUT);
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
            // the successful response reads {"detail": "REBALANCED"}
            let response = self.base.parse_map_response(&result.host, &result.content)?;
            match response.get("detail").map(String::as_str) {
                Some("REBALANCED") => return Ok(()),
                other => errors.push(OpsError::UnexpectedResponse {
                    op: self.base.name.clone(),
                    host: result.host.clone(),
                    cause: format!("detail should be \"REBALANCED\" but got {other:?}"),
                }),
            }
        }
        errors.into_result()
    }
}

/// POSTs `subclusters/{name}/rebalance` on the initiator (Eon mode).
#[derive(Debug)]
pub struct HttpsRebalanceShardsOp {
    base: OpBase,
    auth: HttpsAuth,
    sc_name: String,
}

impl HttpsRebalanceShardsOp {
    /// Rebalance the shards of `sc_name` through the initiator. An empty
    /// name targets the default subcluster.
    pub fn new(initiator: Vec<String>, auth: HttpsAuth, sc_name: &str) -> Self {
        HttpsRebalanceShardsOp {
            base: OpBase::new("rebalance_shards", initiator),
            auth,
            sc_name: sc_name.to_string(),
        }
    }
}

#[async_trait]
impl Operation for HttpsRebalanceShardsOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        // when no subcluster was named the default discovered earlier is used
        if self.sc_name.is_empty() {
            self.sc_name = ctx.default_sc_name.clone();
        }
        if self.sc_name.is_empty() {
            return Err(OpsError::OptionValidation {
                cause: "no subcluster name available for shard rebalance".to_string(),
            });
        }
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_https_endpoint(&format!("subclusters/{}/rebalance", self.sc_name));
            request.timeout = Some(REBALANCE_TIMEOUT);
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
