//! Up-node discovery: the operation that turns per-host `nodes` responses
//! into the workflow's view of which hosts are alive.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, CommandPolicy, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use strata_core::util::slice_common;
use strata_core::{NodeDetails, NodeState, NodesResponse};
use tracing::warn;

/// Fans out GET `nodes` and reconciles the responses.
///
/// Hosts answering 401/500 are classified "exception" (the service runs but
/// rejects us); other failures are "down". Commands that need a complete
/// cluster view scan every response; the rest stop at the first usable one.
/// On success the context receives the sorted UP hosts, the matching
/// primary-UP list, host-to-subcluster and host-to-sandbox maps, and the
/// target subcluster's node lists.
#[derive(Debug)]
pub struct HttpsGetUpNodesOp {
    base: OpBase,
    auth: HttpsAuth,
    db_name: String,
    policy: CommandPolicy,
    sc_name: String,
    sandbox: String,
    main_cluster: bool,
    allow_no_up_hosts: bool,
}

impl HttpsGetUpNodesOp {
    /// Up-node discovery for `db_name` through the given hosts.
    pub fn new(db_name: &str, hosts: Vec<String>, auth: HttpsAuth, policy: CommandPolicy) -> Self {
        HttpsGetUpNodesOp {
            base: OpBase::new("get_up_nodes", hosts),
            auth,
            db_name: db_name.to_string(),
            policy,
            sc_name: String::new(),
            sandbox: String::new(),
            main_cluster: false,
            allow_no_up_hosts: false,
        }
    }

    /// Scope the discovery to a target subcluster.
    pub fn with_subcluster(mut self, sc_name: &str) -> Self {
        self.sc_name = sc_name.to_string();
        self
    }

    /// Scope the discovery to a target sandbox, optionally requiring a
    /// main-cluster UP node as well.
    pub fn with_sandbox(mut self, sandbox: &str, main_cluster: bool) -> Self {
        self.sandbox = sandbox.to_string();
        self.main_cluster = main_cluster;
        self
    }

    /// Do not fail when no UP node is found.
    pub fn allow_no_up_hosts(mut self) -> Self {
        self.allow_no_up_hosts = true;
        self
    }

    fn validate_hosts(&self, nodes: &[NodeDetails]) -> Result<()> {
        let mut db_hosts = Vec::new();
        let mut unexpected_db = None;
        for node in nodes {
            if node.database != self.db_name {
                unexpected_db = Some(node.database.clone());
            }
            db_hosts.push(node.address.clone());
        }
        if let Some(found) = unexpected_db {
            return Err(OpsError::DbNameMismatch {
                found,
                hosts: slice_common(&self.base.hosts, &db_hosts),
            });
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_up_hosts(
        &mut self,
        nodes: &[NodeDetails],
        host: &str,
        up_hosts: &mut BTreeSet<String>,
        primary_up: &mut BTreeSet<String>,
        up_sc_info: &mut HashMap<String, String>,
        sandbox_info: &mut HashMap<String, String>,
        up_sc_nodes: &mut Vec<NodeDetails>,
        sc_nodes: &mut Vec<NodeDetails>,
        main_node_found: &mut bool,
    ) -> Result<()> {
        let mut found_sc = false;
        for node in nodes {
            if node.database != self.db_name {
                return Err(OpsError::DbNameMismatch {
                    found: node.database.clone(),
                    hosts: vec![host.to_string()],
                });
            }
            if !self.sc_name.is_empty() && node.subcluster_name == self.sc_name {
                found_sc = true;
            }
            if node.state == NodeState::Up {
                up_hosts.insert(node.address.clone());
                if node.is_primary {
                    primary_up.insert(node.address.clone());
                }
                up_sc_info.insert(node.address.clone(), node.subcluster_name.clone());
                if self.policy == CommandPolicy::StopDb {
                    if !node.sandbox.is_empty() {
                        sandbox_info.insert(node.address.clone(), node.sandbox.clone());
                    } else if !*main_node_found {
                        // one main-cluster UP node is enough for the shutdown
                        sandbox_info.insert(node.address.clone(), node.sandbox.clone());
                        *main_node_found = true;
                    }
                }
            }
            if !self.sc_name.is_empty() && node.subcluster_name == self.sc_name {
                self.sandbox = node.sandbox.clone();
                // UP nodes come with a version, DOWN nodes without one;
                // UNKNOWN duplicates a sandbox node's main-cluster report
                match node.state {
                    NodeState::Up => {
                        up_sc_nodes.push(node.clone());
                        sc_nodes.push(node.clone());
                    }
                    NodeState::Down => sc_nodes.push(node.clone()),
                    _ => {}
                }
            }
        }
        if !found_sc && self.policy == CommandPolicy::StopSubcluster {
            return Err(OpsError::SubclusterNotFound { name: self.sc_name.clone() });
        }
        Ok(())
    }

    fn collect_unsandboxing_hosts(
        &self,
        nodes: &[NodeDetails],
        sandbox_info: &mut HashMap<String, String>,
        main_node_found: &mut bool,
    ) {
        for node in nodes {
            if node.state != NodeState::Up {
                continue;
            }
            // a sandbox can hold several subclusters; unsandbox runs against
            // a node of the same sandbox but a different subcluster
            if node.sandbox == self.sandbox && node.subcluster_name != self.sc_name {
                sandbox_info.insert(node.address.clone(), node.sandbox.clone());
            }
            if node.sandbox.is_empty() && !*main_node_found {
                sandbox_info.insert(node.address.clone(), String::new());
                *main_node_found = true;
            }
        }
    }
}

#[async_trait]
impl Operation for HttpsGetUpNodesOp {
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

    async fn process_result(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        let mut errors = ErrorCollector::new();
        let mut up_hosts = BTreeSet::new();
        let mut primary_up = BTreeSet::new();
        let mut up_sc_info = HashMap::new();
        let mut sandbox_info = HashMap::new();
        let mut exception_hosts = Vec::new();
        let mut down_hosts = Vec::new();
        let mut unauthorized_hosts = Vec::new();
        let mut up_sc_nodes = Vec::new();
        let mut sc_nodes = Vec::new();
        let mut main_node_found = false;

        // scan in sorted host order so partial scans are deterministic
        let mut hosts: Vec<String> = self.base.request.results.keys().cloned().collect();
        hosts.sort();

        for host in &hosts {
            let result = match self.base.request.results.get(host) {
                Some(result) => result,
                None => continue,
            };
            self.base.log_response(result);

            if !result.is_passing() {
                if let Some(error) = result.error_for_join() {
                    errors.push(error);
                }
                if result.is_unauthorized() {
                    unauthorized_hosts.push(host.clone());
                }
            }

            // all hosts belong to one cluster: a rejection from one means
            // the others will reject us too
            if result.is_failing() && result.is_http_running() {
                exception_hosts.push(host.clone());
                continue;
            }
            if !result.is_passing() {
                down_hosts.push(host.clone());
                continue;
            }

            let response: NodesResponse = match self.base.parse_response(host, &result.content) {
                Ok(response) => response,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };

            if matches!(self.policy, CommandPolicy::StopDb | CommandPolicy::StopSubcluster) {
                if let Err(e) = self.validate_hosts(&response.node_list) {
                    errors.push(e);
                    break;
                }
            }

            if let Err(e) = self.collect_up_hosts(
                &response.node_list,
                host,
                &mut up_hosts,
                &mut primary_up,
                &mut up_sc_info,
                &mut sandbox_info,
                &mut up_sc_nodes,
                &mut sc_nodes,
                &mut main_node_found,
            ) {
                errors.push(e);
                return errors.into_result();
            }

            if self.policy == CommandPolicy::Unsandbox {
                self.collect_unsandboxing_hosts(
                    &response.node_list,
                    &mut sandbox_info,
                    &mut main_node_found,
                );
            }

            if !up_hosts.is_empty() && !self.policy.requires_complete_scan() {
                break;
            }
        }

        ctx.nodes_info = up_sc_nodes;
        ctx.sc_nodes_info = sc_nodes;
        ctx.up_sc_info = up_sc_info;
        ctx.sandbox_info = sandbox_info.clone();

        // no UP node in the target subcluster while the database itself is up
        if self.policy == CommandPolicy::StopSubcluster
            && !up_hosts.is_empty()
            && ctx.nodes_info.is_empty()
        {
            errors.push(OpsError::SubclusterAlreadyDown { name: self.sc_name.clone() });
            return errors.into_result();
        }

        if !self.sandbox.is_empty() && self.policy != CommandPolicy::Unsandbox {
            let sandbox_up = sandbox_info.values().any(|sb| sb == &self.sandbox);
            if !sandbox_up {
                warn!(sandbox = %self.sandbox, db = %self.db_name,
                      "no UP nodes in the sandbox, the database is already down there");
            }
        }
        if self.main_cluster {
            let main_up = sandbox_info.values().any(|sb| sb.is_empty());
            if !main_up {
                warn!(db = %self.db_name, "no UP nodes in the main cluster");
            }
        }

        if !up_hosts.is_empty() {
            // sorted up hosts feed initiator selection later on; the primary
            // list is populated here so the two stay consistent
            ctx.up_hosts = up_hosts.into_iter().collect();
            ctx.primary_up_nodes = primary_up.into_iter().collect();
            return Ok(());
        }

        if !exception_hosts.is_empty() {
            warn!(db = %self.db_name, hosts = ?exception_hosts,
                  "fail to call the https endpoint of the database on these hosts");
        }
        if !down_hosts.is_empty() {
            warn!(db = %self.db_name, hosts = ?down_hosts,
                  "did not detect the database running on these hosts");
        }

        if self.allow_no_up_hosts {
            return Ok(());
        }
        if !unauthorized_hosts.is_empty() {
            errors.push(OpsError::Unauthorized { host: unauthorized_hosts[0].clone() });
        }
        errors.push(OpsError::NoUpNodes);
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::HostResult;
    use strata_core::Problem;

    fn node(address: &str, db: &str, state: &str, primary: bool, sc: &str) -> serde_json::Value {
        serde_json::json!({
            "address": address,
            "database": db,
            "state": state,
            "is_primary": primary,
            "subcluster_name": sc,
        })
    }

    fn success(host: &str, nodes: Vec<serde_json::Value>) -> HostResult {
        let body = serde_json::json!({ "node_list": nodes }).to_string();
        HostResult::success(host, 200, body)
    }

    fn unauthorized(host: &str) -> HostResult {
        let body = r#"{"title": "Unauthorized-request", "detail": "Wrong password", "status": 401}"#;
        HostResult::failure(host, 401, body.to_string(), Problem::parse(body).unwrap())
    }

    fn op(db: &str, hosts: &[&str], policy: CommandPolicy) -> HttpsGetUpNodesOp {
        HttpsGetUpNodesOp::new(
            db,
            hosts.iter().map(|h| h.to_string()).collect(),
            HttpsAuth::none(),
            policy,
        )
    }

    #[tokio::test]
    async fn collects_sorted_up_hosts_and_consistent_primaries() {
        let mut op = op("test_db", &["10.0.0.1"], CommandPolicy::AddNode);
        op.base.request.results.insert(
            "10.0.0.1".to_string(),
            success(
                "10.0.0.1",
                vec![
                    node("10.0.0.2", "test_db", "UP", true, "default_subcluster"),
                    node("10.0.0.1", "test_db", "UP", true, "default_subcluster"),
                    node("10.0.0.3", "test_db", "DOWN", false, "default_subcluster"),
                ],
            ),
        );
        let mut ctx = ExecutionContext::new();
        op.process_result(&mut ctx).await.unwrap();
        assert_eq!(ctx.up_hosts, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(ctx.primary_up_nodes, vec!["10.0.0.1", "10.0.0.2"]);
        for primary in &ctx.primary_up_nodes {
            assert!(ctx.up_hosts.contains(primary));
        }
        assert_eq!(ctx.up_sc_info["10.0.0.1"], "default_subcluster");
    }

    #[tokio::test]
    async fn stop_subcluster_with_no_up_nodes_fails_already_down() {
        let mut op = op("test_db", &["10.0.0.1"], CommandPolicy::StopSubcluster)
            .with_subcluster("sc1");
        op.base.request.results.insert(
            "10.0.0.1".to_string(),
            success(
                "10.0.0.1",
                vec![
                    node("10.0.0.1", "test_db", "UP", true, "default_subcluster"),
                    node("10.0.0.2", "test_db", "DOWN", false, "sc1"),
                ],
            ),
        );
        let mut ctx = ExecutionContext::new();
        let err = op.process_result(&mut ctx).await.unwrap_err();
        assert!(err.to_string().contains("already down"), "{err}");
    }

    #[tokio::test]
    async fn all_hosts_unauthorized_surfaces_an_auth_error() {
        let mut op = op("test_db", &["10.0.0.1", "10.0.0.2"], CommandPolicy::StopDb);
        op.base
            .request
            .results
            .insert("10.0.0.1".to_string(), unauthorized("10.0.0.1"));
        op.base
            .request
            .results
            .insert("10.0.0.2".to_string(), unauthorized("10.0.0.2"));
        let mut ctx = ExecutionContext::new();
        let err = op.process_result(&mut ctx).await.unwrap_err();
        assert!(err.is_unauthorized(), "{err}");
    }

    #[tokio::test]
    async fn stop_db_rejects_foreign_database() {
        let mut op = op("test_db", &["10.0.0.1"], CommandPolicy::StopDb);
        op.base.request.results.insert(
            "10.0.0.1".to_string(),
            success(
                "10.0.0.1",
                vec![node("10.0.0.1", "other_db", "UP", true, "default_subcluster")],
            ),
        );
        let mut ctx = ExecutionContext::new();
        let err = op.process_result(&mut ctx).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("unexpected database \"other_db\""), "{message}");
        assert!(message.contains("10.0.0.1"), "{message}");
    }

    #[tokio::test]
    async fn allow_no_up_hosts_suppresses_the_failure() {
        let mut op = op("test_db", &["10.0.0.1"], CommandPolicy::StartDb).allow_no_up_hosts();
        op.base.request.results.insert(
            "10.0.0.1".to_string(),
            HostResult::exception("10.0.0.1", "connection refused".to_string(), false),
        );
        let mut ctx = ExecutionContext::new();
        op.process_result(&mut ctx).await.unwrap();
        assert!(ctx.up_hosts.is_empty());
    }
}
