//! Local node discovery through the NMA, used when the database is down.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, OpBase, Operation};
use async_trait::async_trait;
use serde::Deserialize;

/// Node identity as known by the agent on its own host.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NmaNodeInfo {
    /// Node name.
    #[serde(default)]
    pub name: String,
    /// Node address.
    #[serde(default)]
    pub address: String,
    /// Catalog directory.
    #[serde(default)]
    pub catalog_path: String,
}

/// Collects each host's local node identity (name, catalog path) from the
/// NMA `nodes` endpoint. This maps input hosts to node names when the
/// database is down and the HTTPS service cannot answer.
#[derive(Debug)]
pub struct NmaNodesInfoOp {
    base: OpBase,
    db_name: String,
}

impl NmaNodesInfoOp {
    /// Node discovery over the given hosts.
    pub fn new(hosts: Vec<String>, db_name: &str) -> Self {
        NmaNodesInfoOp {
            base: OpBase::new("nma_nodes_info", hosts),
            db_name: db_name.to_string(),
        }
    }
}

#[async_trait]
impl Operation for NmaNodesInfoOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Get, ..Default::default() };
            request.build_nma_endpoint("nodes");
            request
                .query_params
                .insert("db_name".to_string(), self.db_name.clone());
            self.base.set_request(host, request);
        }
        Ok(())
    }

    async fn process_result(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        let mut errors = ErrorCollector::new();
        for result in self.base.request.results.values() {
            self.base.log_response(result);
            if !result.is_passing() {
                if let Some(error) = result.error_for_join() {
                    errors.push(error);
                }
                continue;
            }
            let mut info: NmaNodeInfo = self.base.parse_response(&result.host, &result.content)?;
            if info.address.is_empty() {
                info.address = result.host.clone();
            }
            ctx.nma_node_info.insert(result.host.clone(), info);
        }
        errors.into_result()
    }
}
