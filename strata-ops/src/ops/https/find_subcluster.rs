//! Subcluster lookup: resolve a target subcluster and discover the default.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
struct SubclusterInfo {
    #[serde(default)]
    subcluster_name: String,
    #[serde(default)]
    is_default: bool,
    #[serde(default)]
    sandbox: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SubclustersResponse {
    #[serde(default)]
    subcluster_list: Vec<SubclusterInfo>,
}

/// Fetches the subcluster list, records the default subcluster in the
/// context, and verifies the target subcluster when one is named.
///
/// A missing target yields a typed subcluster-not-found error unless the
/// caller asked to tolerate it; a sandboxed target is rejected for
/// workflows that cannot operate on sandboxed subclusters.
#[derive(Debug)]
pub struct HttpsFindSubclusterOp {
    base: OpBase,
    auth: HttpsAuth,
    sc_name: String,
    ignore_not_found: bool,
    reject_sandboxed: bool,
}

impl HttpsFindSubclusterOp {
    /// A lookup through `hosts` for `sc_name` (may be empty to only
    /// discover the default).
    pub fn new(
        hosts: Vec<String>,
        auth: HttpsAuth,
        sc_name: &str,
        ignore_not_found: bool,
        reject_sandboxed: bool,
    ) -> Self {
        HttpsFindSubclusterOp {
            base: OpBase::new("find_subcluster", hosts),
            auth,
            sc_name: sc_name.to_string(),
            ignore_not_found,
            reject_sandboxed,
        }
    }
}

#[async_trait]
impl Operation for HttpsFindSubclusterOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Get, ..Default::default() };
            request.build_https_endpoint("subclusters");
            self.auth.apply(&mut request);
            self.base.set_request(host, request);
        }
        Ok(())
    }

    async fn process_result(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        let mut errors = ErrorCollector::new();

        let mut hosts: Vec<String> = self.base.request.results.keys().cloned().collect();
        hosts.sort();

        for host in &hosts {
            let result = &self.base.request.results[host];
            self.base.log_response(result);

            if result.is_unauthorized() {
                return Err(OpsError::Unauthorized { host: host.clone() });
            }
            if !result.is_passing() {
                if let Some(error) = result.error_for_join() {
                    errors.push(error);
                }
                continue;
            }

            let response: SubclustersResponse = self.base.parse_response(host, &result.content)?;
            for subcluster in &response.subcluster_list {
                if subcluster.is_default {
                    ctx.default_sc_name = subcluster.subcluster_name.clone();
                }
            }

            if !self.sc_name.is_empty() {
                let target = response
                    .subcluster_list
                    .iter()
                    .find(|sc| sc.subcluster_name == self.sc_name);
                match target {
                    Some(subcluster) => {
                        if self.reject_sandboxed && !subcluster.sandbox.is_empty() {
                            return Err(OpsError::SandboxedSubcluster {
                                name: self.sc_name.clone(),
                                sandbox: subcluster.sandbox.clone(),
                            });
                        }
                    }
                    None if !self.ignore_not_found => {
                        return Err(OpsError::SubclusterNotFound { name: self.sc_name.clone() });
                    }
                    None => {}
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

    fn op_with_response(
        sc_name: &str,
        ignore_not_found: bool,
        reject_sandboxed: bool,
        body: serde_json::Value,
    ) -> HttpsFindSubclusterOp {
        let mut op = HttpsFindSubclusterOp::new(
            vec!["10.0.0.1".to_string()],
            HttpsAuth::none(),
            sc_name,
            ignore_not_found,
            reject_sandboxed,
        );
        op.base.request.results.insert(
            "10.0.0.1".to_string(),
            HostResult::success("10.0.0.1", 200, body.to_string()),
        );
        op
    }

    fn subclusters() -> serde_json::Value {
        serde_json::json!({
            "subcluster_list": [
                {"subcluster_name": "default_subcluster", "is_default": true, "sandbox": ""},
                {"subcluster_name": "sc1", "is_default": false, "sandbox": ""},
                {"subcluster_name": "sc2", "is_default": false, "sandbox": "sand1"},
            ]
        })
    }

    #[tokio::test]
    async fn records_default_subcluster() {
        let mut op = op_with_response("", false, false, subclusters());
        let mut ctx = ExecutionContext::new();
        op.process_result(&mut ctx).await.unwrap();
        assert_eq!(ctx.default_sc_name, "default_subcluster");
    }

    #[tokio::test]
    async fn missing_target_is_a_typed_error() {
        let mut op = op_with_response("sc9", false, false, subclusters());
        let mut ctx = ExecutionContext::new();
        let err = op.process_result(&mut ctx).await.unwrap_err();
        assert!(err.is_subcluster_not_found(), "{err}");
    }

    #[tokio::test]
    async fn sandboxed_target_is_rejected_when_asked() {
        let mut op = op_with_response("sc2", false, true, subclusters());
        let mut ctx = ExecutionContext::new();
        let err = op.process_result(&mut ctx).await.unwrap_err();
        assert!(matches!(err, OpsError::SandboxedSubcluster { .. }), "{err}");
    }

    #[tokio::test]
    async fn existing_target_passes() {
        let mut op = op_with_response("sc1", false, true, subclusters());
        let mut ctx = ExecutionContext::new();
        op.process_result(&mut ctx).await.unwrap();
    }
}
