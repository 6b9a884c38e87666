//! Node creation through the initiator.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct CreateNodeResponse {
    #[serde(default)]
    created_nodes: Option<Vec<serde_json::Value>>,
}

/// POSTs `nodes` on the initiator to create catalog entries for the new
/// hosts. The endpoint takes everything through query parameters; the
/// broadcast address comes from the new host's network profile discovered
/// earlier in the workflow.
#[derive(Debug)]
pub struct HttpsCreateNodeOp {
    base: OpBase,
    auth: HttpsAuth,
    new_hosts: Vec<String>,
    catalog_prefix: String,
    data_prefix: String,
    sc_name: String,
}

impl HttpsCreateNodeOp {
    /// Create `new_hosts` through the `initiator`.
    ///
    /// `catalog_prefix` and `data_prefix` already include the database
    /// name; `sc_name` may be empty to target the default subcluster.
    pub fn new(
        initiator: Vec<String>,
        new_hosts: Vec<String>,
        auth: HttpsAuth,
        catalog_prefix: &str,
        data_prefix: &str,
        sc_name: &str,
    ) -> Self {
        HttpsCreateNodeOp {
            base: OpBase::new("create_node", initiator),
            auth,
            new_hosts,
            catalog_prefix: catalog_prefix.to_string(),
            data_prefix: data_prefix.to_string(),
            sc_name: sc_name.to_string(),
        }
    }
}

#[async_trait]
impl Operation for HttpsCreateNodeOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        // the endpoint wants one broadcast address; all new hosts share a
        // subnet, so the first host's profile serves
        let first_new = self.new_hosts.first().ok_or_else(|| OpsError::OptionValidation {
            cause: "no new hosts to create".to_string(),
        })?;
        let profile = ctx
            .network_profiles
            .get(first_new)
            .ok_or_else(|| OpsError::MissingNetworkProfile { host: first_new.clone() })?;
        let broadcast = profile.broadcast.clone();

        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_https_endpoint("nodes");
            request
                .query_params
                .insert("catalog-prefix".to_string(), self.catalog_prefix.clone());
            request
                .query_params
                .insert("data-prefix".to_string(), self.data_prefix.clone());
            request
                .query_params
                .insert("hosts".to_string(), self.new_hosts.join(","));
            request
                .query_params
                .insert("broadcast".to_string(), broadcast.clone());
            if !self.sc_name.is_empty() {
                request
                    .query_params
                    .insert("subcluster".to_string(), self.sc_name.clone());
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
                continue;
            }

            let response: CreateNodeResponse =
                self.base.parse_response(&result.host, &result.content)?;
            if response.created_nodes.is_none() {
                errors.push(OpsError::UnexpectedResponse {
                    op: self.base.name.clone(),
                    host: result.host.clone(),
                    cause: "response does not contain field \"created_nodes\"".to_string(),
                });
            }
        }
        errors.into_result()
    }
}
