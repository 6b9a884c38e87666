//! Catalog bootstrap: creating the very first node of a new database.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, OpBase, Operation};
use async_trait::async_trait;
use std::collections::HashMap;
use strata_core::CoordinationDatabase;

/// POSTs `catalog/bootstrap` on the bootstrap host to create the initial
/// catalog before any node runs. The request body carries the database
/// password and any cloud credentials; both are masked in logs.
#[derive(Debug)]
pub struct NmaBootstrapCatalogOp {
    base: OpBase,
    db_name: String,
    catalog_path: String,
    data_path: String,
    communal_storage_location: String,
    db_password: String,
    parameters: HashMap<String, String>,
}

impl NmaBootstrapCatalogOp {
    /// Bootstrap the catalog on the first host of the model.
    pub fn new(
        vdb: &CoordinationDatabase,
        db_password: &str,
        parameters: HashMap<String, String>,
    ) -> Result<Self> {
        let bootstrap_host = vdb
            .hosts
            .first()
            .cloned()
            .ok_or_else(|| OpsError::OptionValidation {
                cause: "no hosts to bootstrap the database on".to_string(),
            })?;
        let node = vdb
            .nodes
            .get(&bootstrap_host)
            .ok_or_else(|| OpsError::MissingCatalogPath { host: bootstrap_host.clone() })?;
        Ok(NmaBootstrapCatalogOp {
            base: OpBase::new("bootstrap_catalog", vec![bootstrap_host]),
            db_name: vdb.name.clone(),
            catalog_path: node.catalog_path.clone(),
            data_path: node.storage_locations.first().cloned().unwrap_or_default(),
            communal_storage_location: vdb.communal_storage_location.clone(),
            db_password: db_password.to_string(),
            parameters,
        })
    }
}

#[async_trait]
impl Operation for NmaBootstrapCatalogOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let body = serde_json::json!({
            "db_name": self.db_name,
            "catalog_path": self.catalog_path,
            "data_path": self.data_path,
            "communal_storage_location": self.communal_storage_location,
            "db_password": self.db_password,
            "parameters": self.parameters,
        })
        .to_string();
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_nma_endpoint("catalog/bootstrap");
            request.body = Some(body.clone());
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
