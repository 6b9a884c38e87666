//! Per-host network profile discovery.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, OpBase, Operation};
use async_trait::async_trait;
use std::collections::HashMap;
use strata_core::NetworkProfile;

/// Discovers each host's {interface, address, subnet, netmask, broadcast}
/// and stores the profiles in the execution context for node creation and
/// re-IP.
#[derive(Debug)]
pub struct NmaNetworkProfileOp {
    base: OpBase,
}

impl NmaNetworkProfileOp {
    /// Profile discovery over the given hosts.
    pub fn new(hosts: Vec<String>) -> Self {
        NmaNetworkProfileOp { base: OpBase::new("network_profile", hosts) }
    }
}

#[async_trait]
impl Operation for NmaNetworkProfileOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Get, ..Default::default() };
            request.build_nma_endpoint("network-profiles");
            request
                .query_params
                .insert("broadcast-hint".to_string(), host.clone());
            self.base.set_request(host, request);
        }
        Ok(())
    }

    async fn process_result(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        let mut errors = ErrorCollector::new();
        let mut profiles = HashMap::new();

        for result in self.base.request.results.values() {
            self.base.log_response(result);
            if !result.is_passing() {
                if let Some(error) = result.error_for_join() {
                    errors.push(error);
                }
                continue;
            }
            let profile: NetworkProfile =
                self.base.parse_response(&result.host, &result.content)?;
            if let Some(field) = profile.missing_field() {
                return Err(OpsError::UnexpectedResponse {
                    op: self.base.name.clone(),
                    host: result.host.clone(),
                    cause: format!("network profile is missing field {field:?}"),
                });
            }
            profiles.insert(result.host.clone(), profile);
        }

        // later operations read whatever was discovered even on partial failure
        ctx.network_profiles.extend(profiles);
        errors.into_result()
    }
}
