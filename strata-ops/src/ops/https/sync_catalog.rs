//! Catalog sync to communal storage (Eon).

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;
use std::time::Duration;
use strata_core::defaults::DEFAULT_RETRY_COUNT;
use tracing::info;

// a full catalog sync can take minutes on a large catalog
const SYNC_CATALOG_TIMEOUT: Duration = Duration::from_secs(600);

/// POSTs `cluster/catalog/sync` on the initiator; the response must carry
/// the new truncation version.
#[derive(Debug)]
pub struct HttpsSyncCatalogOp {
    base: OpBase,
    auth: HttpsAuth,
}

impl HttpsSyncCatalogOp {
    /// Sync the catalog through the initiator.
    pub fn new(initiator: Vec<String>, auth: HttpsAuth) -> Self {
        HttpsSyncCatalogOp { base: OpBase::new("sync_catalog", initiator), auth }
    }
}

#[async_trait]
impl Operation for HttpsSyncCatalogOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        // with no initiator given, the first up host discovered earlier is it
        if self.base.hosts.is_empty() {
            match ctx.up_hosts.first() {
                Some(host) => self.base.hosts = vec![host.clone()],
                None => return Err(OpsError::NoUpNodes),
            }
        }
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Post, ..Default::default() };
            request.build_https_endpoint("cluster/catalog/sync");
            request
                .query_params
                .insert("retry-count".to_string(), DEFAULT_RETRY_COUNT.to_string());
            request.timeout = Some(SYNC_CATALOG_TIMEOUT);
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
            // the successful response reads {"new_truncation_version": "18"}
            let response = self.base.parse_map_response(&result.host, &result.content)?;
            match response.get("new_truncation_version") {
                Some(version) => {
                    info!(operation = %self.base.name, version = %version,
                          "catalog synced to truncation version");
                    return Ok(());
                }
                None => errors.push(OpsError::UnexpectedResponse {
                    op: self.base.name.clone(),
                    host: result.host.clone(),
                    cause: "response does not contain field \"new_truncation_version\"".to_string(),
                }),
            }
        }
        errors.into_result()
    }
}
