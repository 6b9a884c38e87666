//! Directory removal for dropped nodes.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, OpBase, Operation};
use async_trait::async_trait;
use std::collections::HashMap;
use strata_core::CoordinationDatabase;

/// Deletes the catalog, data, and depot directories of removed nodes.
#[derive(Debug)]
pub struct NmaDeleteDirectoriesOp {
    base: OpBase,
    directories: HashMap<String, Vec<String>>,
    force_delete: bool,
}

impl NmaDeleteDirectoriesOp {
    /// Directory removal for every host in the (hosts-to-remove) model.
    pub fn new(removed_hosts_vdb: &CoordinationDatabase, force_delete: bool) -> Self {
        let mut directories = HashMap::new();
        for (host, node) in &removed_hosts_vdb.nodes {
            let mut paths = vec![node.catalog_path.clone()];
            paths.extend(node.storage_locations.iter().cloned());
            if !node.depot_path.is_empty() {
                paths.push(node.depot_path.clone());
            }
            paths.retain(|path| !path.is_empty());
            directories.insert(host.clone(), paths);
        }
        NmaDeleteDirectoriesOp {
            base: OpBase::new("delete_directories", removed_hosts_vdb.hosts.clone()),
            directories,
            force_delete,
        }
    }
}

#[async_trait]
impl Operation for NmaDeleteDirectoriesOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let paths = self.directories.get(host).cloned().unwrap_or_default();
            let body = serde_json::json!({
                "directories": paths,
                "force_delete": self.force_delete,
            });
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_nma_endpoint("directories/delete");
            request.body = Some(body.to_string());
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
