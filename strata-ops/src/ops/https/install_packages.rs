//! Package installation on a running database.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, HttpsAuth, OpBase, Operation};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

// installing every default package can take a while
const INSTALL_PACKAGES_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Default, Deserialize)]
struct InstallPackagesResponse {
    packages: Option<Vec<PackageStatus>>,
}

#[derive(Debug, Default, Deserialize)]
struct PackageStatus {
    #[serde(default)]
    package_name: String,
    #[serde(default)]
    install_status: String,
}

/// POSTs `packages` on the initiator; the response lists the per-package
/// install status.
#[derive(Debug)]
pub struct HttpsInstallPackagesOp {
    base: OpBase,
    auth: HttpsAuth,
    force_reinstall: bool,
}

impl HttpsInstallPackagesOp {
    /// Install the default packages through the initiator.
    pub fn new(initiator: Vec<String>, auth: HttpsAuth, force_reinstall: bool) -> Self {
        HttpsInstallPackagesOp {
            base: OpBase::new("install_packages", initiator),
            auth,
            force_reinstall,
        }
    }
}

#[async_trait]
impl Operation for HttpsInstallPackagesOp {
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
            request.build_https_endpoint("packages");
            if self.force_reinstall {
                request
                    .query_params
                    .insert("force-install".to_string(), "true".to_string());
            }
            request.timeout = Some(INSTALL_PACKAGES_TIMEOUT);
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
            let response: InstallPackagesResponse =
                self.base.parse_response(&result.host, &result.content)?;
            match response.packages {
                Some(packages) => {
                    for package in &packages {
                        info!(operation = %self.base.name,
                              package = %package.package_name,
                              status = %package.install_status,
                              "package installed");
                    }
                    return Ok(());
                }
                None => errors.push(OpsError::UnexpectedResponse {
                    op: self.base.name.clone(),
                    host: result.host.clone(),
                    cause: "response does not contain field \"packages\"".to_string(),
                }),
            }
        }
        errors.into_result()
    }
}
