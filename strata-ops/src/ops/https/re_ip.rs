//! Catalog re-IP: rewriting node address assignments.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct ReIpInfo {
    node_name: String,
    target_address: String,
    target_control_address: String,
    target_control_broadcast: String,
}

/// PUTs `nodes/{name}/ip` for each (node, new address) pair, one pairing
/// per UP host.
///
/// Precondition: at least as many UP hosts as pairs. Falling short almost
/// certainly means quorum was lost, so the operation emits a typed
/// quorum error before any PUT is issued; callers map it to "start the
/// database first".
#[derive(Debug)]
pub struct HttpsReIpOp {
    base: OpBase,
    auth: HttpsAuth,
    node_names_to_re_ip: Vec<String>,
    hosts_to_re_ip: Vec<String>,
    re_ip_list: HashMap<String, ReIpInfo>,
    up_hosts: Vec<String>,
}

impl HttpsReIpOp {
    /// Re-IP `node_names_to_re_ip[i]` to `hosts_to_re_ip[i]`.
    pub fn new(
        node_names_to_re_ip: Vec<String>,
        hosts_to_re_ip: Vec<String>,
        auth: HttpsAuth,
    ) -> Self {
        HttpsReIpOp {
            base: OpBase::new("re_ip", Vec::new()),
            auth,
            node_names_to_re_ip,
            hosts_to_re_ip,
            re_ip_list: HashMap::new(),
            up_hosts: Vec::new(),
        }
    }
}

#[async_trait]
impl Operation for HttpsReIpOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        // pair each node name with its new address and network profile
        for (node_name, target_address) in
            self.node_names_to_re_ip.iter().zip(&self.hosts_to_re_ip)
        {
            let profile = ctx.network_profiles.get(target_address).ok_or_else(|| {
                OpsError::MissingNetworkProfile { host: target_address.clone() }
            })?;
            self.re_ip_list.insert(
                node_name.clone(),
                ReIpInfo {
                    node_name: node_name.clone(),
                    target_address: target_address.clone(),
                    target_control_address: profile.address.clone(),
                    target_control_broadcast: profile.broadcast.clone(),
                },
            );
        }

        // the requests run on UP hosts, one pairing per up host
        self.up_hosts = ctx.up_hosts.clone();
        if self.up_hosts.len() < self.hosts_to_re_ip.len() {
            return Err(OpsError::NoClusterQuorum {
                detail: format!(
                    "[{}] {} up nodes are not enough for re-ip",
                    self.base.name,
                    self.up_hosts.len()
                ),
            });
        }
        self.base.hosts = self.up_hosts.clone();
        ctx.dispatcher.setup(&self.up_hosts);

        for (index, node_name) in self.node_names_to_re_ip.iter().enumerate() {
            let info = &self.re_ip_list[node_name];
            let mut request = HostRequest { method: Method::Put, ..Default::default() };
            request.build_https_endpoint(&format!("nodes/{}/ip", info.node_name));
            request
                .query_params
                .insert("host".to_string(), info.target_address.clone());
            request
                .query_params
                .insert("control-host".to_string(), info.target_control_address.clone());
            request
                .query_params
                .insert("broadcast".to_string(), info.target_control_broadcast.clone());
            self.auth.apply(&mut request);
            self.base.set_request(&self.up_hosts[index].clone(), request);
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
            // the successful response reads {"detail": ""}
            let response = self.base.parse_map_response(&result.host, &result.content)?;
            match response.get("detail") {
                Some(detail) if detail.is_empty() => {}
                Some(detail) => {
                    errors.push(OpsError::UnexpectedResponse {
                        op: self.base.name.clone(),
                        host: result.host.clone(),
                        cause: format!("response detail should be empty but got {detail:?}"),
                    });
                    break;
                }
                None => {
                    errors.push(OpsError::UnexpectedResponse {
                        op: self.base.name.clone(),
                        host: result.host.clone(),
                        cause: "response does not contain field \"detail\"".to_string(),
                    });
                    break;
                }
            }
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::NetworkProfile;

    fn profile(address: &str) -> NetworkProfile {
        NetworkProfile {
            name: "eth0".into(),
            address: address.into(),
            subnet: "10.0.0.0/24".into(),
            netmask: "255.255.255.0".into(),
            broadcast: "10.0.0.255".into(),
        }
    }

    #[tokio::test]
    async fn insufficient_quorum_is_a_typed_error_before_any_request() {
        let mut op = HttpsReIpOp::new(
            vec!["v_db_node0002".into(), "v_db_node0003".into()],
            vec!["10.0.0.2".into(), "10.0.0.3".into()],
            HttpsAuth::none(),
        );
        let mut ctx = ExecutionContext::new();
        ctx.network_profiles.insert("10.0.0.2".into(), profile("10.0.0.2"));
        ctx.network_profiles.insert("10.0.0.3".into(), profile("10.0.0.3"));
        ctx.up_hosts = vec!["10.0.0.1".into()];

        let err = op.prepare(&mut ctx).await.unwrap_err();
        assert!(err.is_quorum_loss(), "{err}");
        assert!(err.to_string().contains("not enough for re-ip"), "{err}");
        assert!(op.base.request.requests.is_empty());
    }

    #[tokio::test]
    async fn requests_pair_nodes_with_up_hosts() {
        let mut op = HttpsReIpOp::new(
            vec!["v_db_node0002".into()],
            vec!["10.0.0.2".into()],
            HttpsAuth::none(),
        );
        let mut ctx = ExecutionContext::new();
        ctx.network_profiles.insert("10.0.0.2".into(), profile("10.0.0.2"));
        ctx.up_hosts = vec!["10.0.0.1".into(), "10.0.0.3".into()];

        op.prepare(&mut ctx).await.unwrap();
        assert_eq!(op.base.request.requests.len(), 1);
        let request = &op.base.request.requests["10.0.0.1"];
        assert_eq!(request.endpoint, "v1/nodes/v_db_node0002/ip");
        assert_eq!(request.query_params["host"], "10.0.0.2");
        assert_eq!(request.query_params["broadcast"], "10.0.0.255");
    }

    #[tokio::test]
    async fn missing_profile_aborts_prepare() {
        let mut op = HttpsReIpOp::new(
            vec!["v_db_node0002".into()],
            vec!["10.0.0.2".into()],
            HttpsAuth::none(),
        );
        let mut ctx = ExecutionContext::new();
        ctx.up_hosts = vec!["10.0.0.1".into()];
        let err = op.prepare(&mut ctx).await.unwrap_err();
        assert!(matches!(err, OpsError::MissingNetworkProfile { .. }), "{err}");
    }
}
