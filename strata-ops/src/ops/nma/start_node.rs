//! Node process startup through the NMA.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, OpBase, Operation};
use async_trait::async_trait;
use std::collections::HashMap;
use strata_core::CoordinationDatabase;

/// Starts the database process on each target host.
///
/// The start command is taken from the catalog snapshot when an earlier
/// operation read one; otherwise the agent starts the node from its
/// catalog directory.
#[derive(Debug)]
pub struct NmaStartNodeOp {
    base: OpBase,
    catalog_paths: HashMap<String, String>,
}

impl NmaStartNodeOp {
    /// Start the nodes on the given hosts of the model.
    pub fn new(hosts: Vec<String>, vdb: &CoordinationDatabase) -> Result<Self> {
        let mut catalog_paths = HashMap::new();
        for host in &hosts {
            let node = vdb
                .nodes
                .get(host)
                .ok_or_else(|| OpsError::MissingCatalogPath { host: host.clone() })?;
            catalog_paths.insert(host.clone(), node.catalog_path.clone());
        }
        Ok(NmaStartNodeOp {
            base: OpBase::new("start_node", hosts),
            catalog_paths,
        })
    }
}

#[async_trait]
impl Operation for NmaStartNodeOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);

        // prefer the start command recorded in the catalog
        let mut start_commands: HashMap<String, Vec<String>> = HashMap::new();
        if let Some(snapshot) = &ctx.catalog_snapshot {
            for node in &snapshot.nodes {
                if !node.start_command.is_empty() {
                    start_commands.insert(node.address.clone(), node.start_command.clone());
                }
            }
        }

        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let catalog_path = self
                .catalog_paths
                .get(host)
                .ok_or_else(|| OpsError::MissingCatalogPath { host: host.clone() })?;
            let body = match start_commands.get(host) {
                Some(command) => serde_json::json!({
                    "start_command": command,
                    "catalog_path": catalog_path,
                }),
                None => serde_json::json!({ "catalog_path": catalog_path }),
            };
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_nma_endpoint("startdb");
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
