//! Restore point listing for Eon databases.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One restore point in communal storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestorePoint {
    /// Archive the restore point belongs to.
    #[serde(default)]
    pub archive: String,
    /// Unique restore point id.
    #[serde(default)]
    pub id: String,
    /// Index within the archive (1-based, newest first).
    #[serde(default)]
    pub index: u64,
    /// Creation timestamp.
    #[serde(default)]
    pub timestamp: String,
}

/// GETs `restore-points` on a reachable host, optionally filtered by
/// archive name, and stores the list in the context.
#[derive(Debug)]
pub struct HttpsShowRestorePointsOp {
    base: OpBase,
    auth: HttpsAuth,
    archive_filter: String,
}

impl HttpsShowRestorePointsOp {
    /// List restore points through the given hosts. An empty filter lists
    /// every archive.
    pub fn new(hosts: Vec<String>, auth: HttpsAuth, archive_filter: &str) -> Self {
        HttpsShowRestorePointsOp {
            base: OpBase::new("show_restore_points", hosts),
            auth,
            archive_filter: archive_filter.to_string(),
        }
    }
}

#[async_trait]
impl Operation for HttpsShowRestorePointsOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        // with no hosts given, scan the up hosts discovered earlier
        if self.base.hosts.is_empty() {
            if ctx.up_hosts.is_empty() {
                return Err(OpsError::NoUpNodes);
            }
            self.base.hosts = ctx.up_hosts.clone();
        }
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Get, ..Default::default() };
            request.build_https_endpoint("restore-points");
            if !self.archive_filter.is_empty() {
                request
                    .query_params
                    .insert("archive".to_string(), self.archive_filter.clone());
            }
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
            let restore_points: Vec<RestorePoint> =
                self.base.parse_response(host, &result.content)?;
            ctx.restore_points = restore_points;
            return Ok(());
        }
        errors.into_result()
    }
}
