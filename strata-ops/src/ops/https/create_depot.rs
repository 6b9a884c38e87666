//! Depot creation on new Eon nodes.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;
use std::collections::HashMap;
use strata_core::CoordinationDatabase;

/// POSTs `nodes/{name}/depot` on each new host so the node builds its
/// depot at the path recorded in the model.
#[derive(Debug)]
pub struct HttpsCreateDepotOp {
    base: OpBase,
    auth: HttpsAuth,
    node_names: HashMap<String, String>,
    depot_paths: HashMap<String, String>,
    depot_size: String,
}

impl HttpsCreateDepotOp {
    /// Depot creation for `new_hosts` of the model. `depot_size` may be
    /// empty to use the server default.
    pub fn new(
        vdb: &CoordinationDatabase,
        new_hosts: Vec<String>,
        auth: HttpsAuth,
        depot_size: &str,
    ) -> Result<Self> {
        let mut node_names = HashMap::new();
        let mut depot_paths = HashMap::new();
        for host in &new_hosts {
            let node = vdb
                .nodes
                .get(host)
                .ok_or_else(|| OpsError::MissingCatalogPath { host: host.clone() })?;
            node_names.insert(host.clone(), node.name.clone());
            depot_paths.insert(host.clone(), node.depot_path.clone());
        }
        Ok(HttpsCreateDepotOp {
            base: OpBase::new("create_depot", new_hosts),
            auth,
            node_names,
            depot_paths,
            depot_size: depot_size.to_string(),
        })
    }
}

#[async_trait]
impl Operation for HttpsCreateDepotOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let node_name = &self.node_names[host];
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_https_endpoint(&format!("nodes/{node_name}/depot"));
            request
                .query_params
                .insert("path".to_string(), self.depot_paths[host].clone());
            if !self.depot_size.is_empty() {
                request
                    .query_params
                    .insert("size".to_string(), self.depot_size.clone());
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
