//! Membership pre-check before adding or removing nodes.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;
use strata_core::{NodeDetails, NodeState, NodesResponse};

/// Which workflow the membership check runs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodesExistCaller {
    /// db_add_node: none of the targets may already be in the database.
    AddNode,
    /// db_remove_node: every target must be in the database; in
    /// enterprise mode no node may be DOWN, to preserve quorum during
    /// the drop.
    RemoveNode,
}

/// Fetches the node list from a reachable host and verifies the target
/// addresses against it.
#[derive(Debug)]
pub struct HttpsCheckNodesExistOp {
    base: OpBase,
    auth: HttpsAuth,
    target_hosts: Vec<String>,
    caller: NodesExistCaller,
}

impl HttpsCheckNodesExistOp {
    /// A membership check through `hosts` for the given targets.
    pub fn new(
        hosts: Vec<String>,
        target_hosts: Vec<String>,
        auth: HttpsAuth,
        caller: NodesExistCaller,
    ) -> Self {
        HttpsCheckNodesExistOp {
            base: OpBase::new("check_nodes_exist", hosts),
            auth,
            target_hosts,
            caller,
        }
    }

    fn targets_present(&self, nodes: &[NodeDetails]) -> Vec<String> {
        let mut present = Vec::new();
        for node in nodes {
            if self.target_hosts.contains(&node.address) {
                present.push(node.address.clone());
            }
        }
        present.sort();
        present
    }
}

#[async_trait]
impl Operation for HttpsCheckNodesExistOp {
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

    async fn process_result(&mut self, _ctx: &mut ExecutionContext) -> Result<()> {
        let mut errors = ErrorCollector::new();

        let mut hosts: Vec<String> = self.base.request.results.keys().cloned().collect();
        hosts.sort();

        for host in &hosts {
            let result = &self.base.request.results[host];
            self.base.log_response(result);

            if result.is_unauthorized() {
                // the other nodes would reject us the same way
                return Err(OpsError::Unauthorized { host: host.clone() });
            }
            if !result.is_passing() {
                if let Some(error) = result.error_for_join() {
                    errors.push(error);
                }
                continue;
            }

            let response: NodesResponse = self.base.parse_response(host, &result.content)?;
            let present = self.targets_present(&response.node_list);

            match self.caller {
                NodesExistCaller::AddNode => {
                    if !present.is_empty() {
                        return Err(OpsError::HostsAlreadyInDatabase { hosts: present });
                    }
                }
                NodesExistCaller::RemoveNode => {
                    if present.len() != self.target_hosts.len() {
                        let mut missing: Vec<String> = self
                            .target_hosts
                            .iter()
                            .filter(|target| !present.contains(target))
                            .cloned()
                            .collect();
                        missing.sort();
                        return Err(OpsError::HostsNotInDatabase { hosts: missing });
                    }
                    // an empty subcluster on the first node means the
                    // database runs in enterprise mode
                    let enterprise = response
                        .node_list
                        .first()
                        .map(|node| node.subcluster_name.is_empty())
                        .unwrap_or(false);
                    if enterprise
                        && response.node_list.iter().any(|node| node.state == NodeState::Down)
                    {
                        return Err(OpsError::NodesNotUpForRemoval);
                    }
                }
            }
            return Ok(());
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::HostResult;

    fn node(address: &str, state: &str, sc: &str) -> serde_json::Value {
        serde_json::json!({
            "address": address,
            "database": "test_db",
            "state": state,
            "subcluster_name": sc,
        })
    }

    fn op_with_response(
        targets: &[&str],
        caller: NodesExistCaller,
        nodes: Vec<serde_json::Value>,
    ) -> HttpsCheckNodesExistOp {
        let mut op = HttpsCheckNodesExistOp::new(
            vec!["10.0.0.1".to_string()],
            targets.iter().map(|h| h.to_string()).collect(),
            HttpsAuth::none(),
            caller,
        );
        let body = serde_json::json!({ "node_list": nodes }).to_string();
        op.base
            .request
            .results
            .insert("10.0.0.1".to_string(), HostResult::success("10.0.0.1", 200, body));
        op
    }

    #[tokio::test]
    async fn add_node_rejects_existing_hosts() {
        let mut op = op_with_response(
            &["10.0.0.2"],
            NodesExistCaller::AddNode,
            vec![node("10.0.0.1", "UP", "sc1"), node("10.0.0.2", "UP", "sc1")],
        );
        let mut ctx = ExecutionContext::new();
        let err = op.process_result(&mut ctx).await.unwrap_err();
        assert!(matches!(err, OpsError::HostsAlreadyInDatabase { .. }), "{err}");
    }

    #[tokio::test]
    async fn add_node_accepts_new_hosts() {
        let mut op = op_with_response(
            &["10.0.0.4"],
            NodesExistCaller::AddNode,
            vec![node("10.0.0.1", "UP", "sc1")],
        );
        let mut ctx = ExecutionContext::new();
        op.process_result(&mut ctx).await.unwrap();
    }

    #[tokio::test]
    async fn remove_node_requires_targets_present() {
        let mut op = op_with_response(
            &["10.0.0.9"],
            NodesExistCaller::RemoveNode,
            vec![node("10.0.0.1", "UP", "sc1")],
        );
        let mut ctx = ExecutionContext::new();
        let err = op.process_result(&mut ctx).await.unwrap_err();
        assert!(matches!(err, OpsError::HostsNotInDatabase { .. }), "{err}");
    }

    #[tokio::test]
    async fn enterprise_remove_rejects_down_nodes() {
        let mut op = op_with_response(
            &["10.0.0.2"],
            NodesExistCaller::RemoveNode,
            vec![node("10.0.0.1", "UP", ""), node("10.0.0.2", "DOWN", "")],
        );
        let mut ctx = ExecutionContext::new();
        let err = op.process_result(&mut ctx).await.unwrap_err();
        assert!(matches!(err, OpsError::NodesNotUpForRemoval), "{err}");
    }

    #[tokio::test]
    async fn eon_remove_tolerates_down_nodes() {
        let mut op = op_with_response(
            &["10.0.0.2"],
            NodesExistCaller::RemoveNode,
            vec![node("10.0.0.1", "UP", "sc1"), node("10.0.0.2", "DOWN", "sc1")],
        );
        let mut ctx = ExecutionContext::new();
        op.process_result(&mut ctx).await.unwrap();
    }
}
