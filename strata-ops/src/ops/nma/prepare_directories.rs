//! Directory preparation on hosts about to receive new nodes.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, OpBase, Operation};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use strata_core::CoordinationDatabase;

#[derive(Debug, Clone, Serialize)]
struct DirectoriesBody {
    catalog_path: String,
    data_paths: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    depot_path: String,
    force_cleanup: bool,
}

/// Creates the catalog, data, and depot directories for each new node
/// before the node itself is created.
#[derive(Debug)]
pub struct NmaPrepareDirectoriesOp {
    base: OpBase,
    bodies: HashMap<String, DirectoriesBody>,
}

impl NmaPrepareDirectoriesOp {
    /// Directory preparation for every host in the (new-hosts) model.
    pub fn new(new_hosts_vdb: &CoordinationDatabase, force_cleanup: bool) -> Result<Self> {
        let mut bodies = HashMap::new();
        for (host, node) in &new_hosts_vdb.nodes {
            bodies.insert(
                host.clone(),
                DirectoriesBody {
                    catalog_path: node.catalog_path.clone(),
                    data_paths: node.storage_locations.clone(),
                    depot_path: node.depot_path.clone(),
                    force_cleanup,
                },
            );
        }
        let hosts = new_hosts_vdb.hosts.clone();
        Ok(NmaPrepareDirectoriesOp {
            base: OpBase::new("prepare_directories", hosts),
            bodies,
        })
    }
}

#[async_trait]
impl Operation for NmaPrepareDirectoriesOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let body = self
                .bodies
                .get(host)
                .ok_or_else(|| OpsError::MissingCatalogPath { host: host.clone() })?;
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_nma_endpoint("directories/prepare");
            request.body = Some(serde_json::to_string(body).map_err(|e| {
                OpsError::OptionValidation { cause: format!("cannot encode directories body: {e}") }
            })?);
            self.base.set_request(host, request);
        }
        Ok(())
    }

    async fn process_result(&mut self, _ctx: &mut ExecutionContext) -> Result<()> {
        let mut errors = ErrorCollector::new();
        for result in self.base.request.results.values() {
            self.base.log_response(result);
            if !result.is_passing() {
                if let Some(error) = result.error_for_join() {
                    errors.push(error);
                }
            }
        }
        errors.into_result()
    }
}
