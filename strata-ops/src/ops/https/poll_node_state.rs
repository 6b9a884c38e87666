//! Polling until the expected nodes report UP.

use crate::engine::ExecutionContext;
use crate::error::{OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use strata_core::defaults::{
    NODE_STATE_POLLING_TIMEOUT_ENV, NODE_STATE_POLLING_TIMEOUT_SECS, POLLING_INTERVAL_SECS,
};
use strata_core::util::env_or_default;
use strata_core::{NodeState, NodesResponse};
use tokio::time::Instant;
use tracing::info;

/// Repeats GET `nodes` until every expected address reports UP or the
/// timeout elapses. The timeout is a constant overridable through the
/// `NODE_STATE_POLLING_TIMEOUT` environment variable (seconds). On expiry
/// the not-up addresses are sorted and surfaced.
#[derive(Debug)]
pub struct HttpsPollNodeStateOp {
    base: OpBase,
    auth: HttpsAuth,
    up_hosts: HashSet<String>,
    timeout: Option<Duration>,
    interval: Duration,
}

impl HttpsPollNodeStateOp {
    /// Poll until all of `hosts` report UP.
    pub fn new(hosts: Vec<String>, auth: HttpsAuth) -> Self {
        HttpsPollNodeStateOp {
            base: OpBase::new("poll_node_state", hosts),
            auth,
            up_hosts: HashSet::new(),
            timeout: None,
            interval: Duration::from_secs(POLLING_INTERVAL_SECS),
        }
    }

    /// Override the timeout and interval (tests, impatient callers).
    pub fn with_timing(mut self, timeout: Duration, interval: Duration) -> Self {
        self.timeout = Some(timeout);
        self.interval = interval;
        self
    }

    fn effective_timeout(&self) -> Result<Duration> {
        if let Some(timeout) = self.timeout {
            return Ok(timeout);
        }
        let raw = env_or_default(
            NODE_STATE_POLLING_TIMEOUT_ENV,
            &NODE_STATE_POLLING_TIMEOUT_SECS.to_string(),
        );
        let secs: u64 = raw.parse().map_err(|_| OpsError::OptionValidation {
            cause: format!("invalid {NODE_STATE_POLLING_TIMEOUT_ENV} value {raw:?}"),
        })?;
        Ok(Duration::from_secs(secs))
    }

    /// Record UP addresses from the latest responses. One usable response
    /// is enough: the endpoint reports the whole cluster.
    fn record_up_hosts(&mut self) -> Result<()> {
        let mut hosts: Vec<&String> = self.base.request.results.keys().collect();
        hosts.sort();
        for host in hosts {
            let result = &self.base.request.results[host];
            self.base.log_response(result);
            if !result.is_passing() {
                continue;
            }
            let response: NodesResponse = self.base.parse_response(host, &result.content)?;
            for node in &response.node_list {
                if node.state == NodeState::Up {
                    self.up_hosts.insert(node.address.clone());
                }
            }
            break;
        }
        Ok(())
    }

    fn not_up_hosts(&self) -> Vec<String> {
        let mut not_up: Vec<String> = self
            .base
            .hosts
            .iter()
            .filter(|host| !self.up_hosts.contains(*host))
            .cloned()
            .collect();
        not_up.sort();
        not_up
    }
}

#[async_trait]
impl Operation for HttpsPollNodeStateOp {
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

    async fn execute(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        let timeout = self.effective_timeout()?;
        let deadline = Instant::now() + timeout;
        let mut polled = false;

        while Instant::now() < deadline {
            if polled {
                tokio::time::sleep(self.interval).await;
            }
            polled = true;

            ctx.dispatcher.send_request(&mut self.base.request).await?;
            self.record_up_hosts()?;

            if self.not_up_hosts().is_empty() {
                info!(operation = %self.base.name, "all nodes are up");
                return Ok(());
            }
        }

        Err(OpsError::NodeStateTimeout {
            hosts: self.not_up_hosts(),
            timeout_secs: timeout.as_secs(),
        })
    }

    async fn process_result(&mut self, _ctx: &mut ExecutionContext) -> Result<()> {
        // polling happens inside execute
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_up_is_sorted_difference() {
        let mut op = HttpsPollNodeStateOp::new(
            vec!["10.0.0.3".into(), "10.0.0.1".into(), "10.0.0.2".into()],
            HttpsAuth::none(),
        );
        op.up_hosts.insert("10.0.0.2".into());
        assert_eq!(op.not_up_hosts(), vec!["10.0.0.1", "10.0.0.3"]);
    }

    #[test]
    fn explicit_timing_overrides_environment() {
        let op = HttpsPollNodeStateOp::new(vec!["10.0.0.1".into()], HttpsAuth::none())
            .with_timing(Duration::from_secs(1), Duration::from_millis(10));
        assert_eq!(op.effective_timeout().unwrap(), Duration::from_secs(1));
    }
}
