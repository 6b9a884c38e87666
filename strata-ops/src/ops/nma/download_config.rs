//! Config file transfer: download from a node that has the latest catalog,
//! upload to nodes that need it.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, OpBase, Operation};
use async_trait::async_trait;
use std::collections::HashMap;
use strata_core::CoordinationDatabase;
use tracing::info;

/// Downloads one config file (e.g. `config/vertica`, `config/spread`) from
/// the first source host that can serve it and stores the content in the
/// execution context keyed by endpoint.
#[derive(Debug)]
pub struct NmaDownloadConfigOp {
    base: OpBase,
    endpoint: String,
    catalog_paths: HashMap<String, String>,
}

impl NmaDownloadConfigOp {
    /// Download `endpoint` through the given source hosts.
    pub fn new(
        name: &str,
        source_hosts: Vec<String>,
        endpoint: &str,
        vdb: &CoordinationDatabase,
    ) -> Result<Self> {
        let mut catalog_paths = HashMap::new();
        for host in &source_hosts {
            let node = vdb
                .nodes
                .get(host)
                .ok_or_else(|| OpsError::MissingCatalogPath { host: host.clone() })?;
            catalog_paths.insert(host.clone(), node.catalog_path.clone());
        }
        Ok(NmaDownloadConfigOp {
            base: OpBase::new(name, source_hosts),
            endpoint: endpoint.to_string(),
            catalog_paths,
        })
    }
}

#[async_trait]
impl Operation for NmaDownloadConfigOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let catalog_path = self
                .catalog_paths
                .get(host)
                .ok_or_else(|| OpsError::MissingCatalogPath { host: host.clone() })?
                .clone();
            let mut request = HostRequest { method: Method::Get, ..Default::default() };
            request.build_nma_endpoint(&self.endpoint);
            request.query_params.insert("catalog_path".to_string(), catalog_path);
            self.base.set_request(host, request);
        }
        Ok(())
    }

    async fn process_result(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        let mut errors = ErrorCollector::new();
        for result in self.base.request.results.values() {
            self.base.log_response(result);
            if result.is_passing() {
                // the config file content is the response body
                ctx.config_content
                    .insert(self.endpoint.clone(), result.content.clone());
                return Ok(());
            }
            if let Some(error) = result.error_for_join() {
                errors.push(error);
            }
        }
        errors.into_result()
    }
}

/// Uploads a previously downloaded config file to the hosts that need it.
///
/// When the download step stored nothing (every node already carries the
/// latest catalog information), there is no work to do and execute is
/// skipped.
#[derive(Debug)]
pub struct NmaUploadConfigOp {
    base: OpBase,
    endpoint: String,
}

impl NmaUploadConfigOp {
    /// Upload the content stored under `endpoint` to the target hosts.
    pub fn new(name: &str, target_hosts: Vec<String>, endpoint: &str) -> Self {
        NmaUploadConfigOp {
            base: OpBase::new(name, target_hosts),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl Operation for NmaUploadConfigOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        let content = match ctx.config_content.get(&self.endpoint) {
            Some(content) => content.clone(),
            None => {
                info!(operation = %self.base.name, endpoint = %self.endpoint,
                      "no config content captured, nothing to upload");
                self.base.skip_execute = true;
                return Ok(());
            }
        };

        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let body = serde_json::json!({ "content": content });
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_nma_endpoint(&self.endpoint);
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
