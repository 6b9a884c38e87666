//! Database shutdown.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;

/// POSTs the shutdown endpoint on one initiator per scope: a whole-cluster
/// stop fans out to one node per sandbox plus one main-cluster node, a
/// subcluster stop targets one node of that subcluster.
#[derive(Debug)]
pub struct HttpsStopDbOp {
    base: OpBase,
    auth: HttpsAuth,
    sc_name: String,
    drain_seconds: Option<u64>,
}

impl HttpsStopDbOp {
    /// Stop the whole database. With no initiator given, the hosts come
    /// from the sandbox map discovered earlier: one node per sandbox plus
    /// one main-cluster node, each shutdown reaching its own (sub)cluster.
    pub fn new(initiator: Vec<String>, auth: HttpsAuth, drain_seconds: Option<u64>) -> Self {
        HttpsStopDbOp {
            base: OpBase::new("stop_db", initiator),
            auth,
            sc_name: String::new(),
            drain_seconds,
        }
    }

    /// Stop a single subcluster. With no initiator given, the hosts come
    /// from the subcluster's up nodes discovered earlier.
    pub fn new_subcluster(
        initiator: Vec<String>,
        auth: HttpsAuth,
        sc_name: &str,
        drain_seconds: Option<u64>,
    ) -> Self {
        HttpsStopDbOp {
            base: OpBase::new("stop_subcluster", initiator),
            auth,
            sc_name: sc_name.to_string(),
            drain_seconds,
        }
    }
}

#[async_trait]
impl Operation for HttpsStopDbOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        if self.base.hosts.is_empty() {
            let mut hosts: Vec<String> = if self.sc_name.is_empty() {
                if ctx.sandbox_info.is_empty() {
                    ctx.up_hosts.first().cloned().into_iter().collect()
                } else {
                    ctx.sandbox_info.keys().cloned().collect()
                }
            } else {
                ctx.nodes_info
                    .iter()
                    .map(|node| node.address.clone())
                    .take(1)
                    .collect()
            };
            hosts.sort();
            if hosts.is_empty() {
                return Err(OpsError::NoUpNodes);
            }
            self.base.hosts = hosts;
        }

        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            if self.sc_name.is_empty() {
                request.build_https_endpoint("cluster/shutdown");
            } else {
                request.build_https_endpoint(&format!("subclusters/{}/shutdown", self.sc_name));
            }
            if let Some(timeout) = self.drain_seconds {
                request
                    .query_params
                    .insert("timeout".to_string(), timeout.to_string());
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
            if !result.is_passing() {
                if let Some(error) = result.error_for_join() {
                    errors.push(error);
                }
            }
        }
        errors.into_result()
    }
}
