//! NMA server-version check.

use crate::engine::ExecutionContext;
use crate::error::{OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, OpBase, Operation};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::info;

/// Fans out GET `vertica/version` and collects each host's version string.
///
/// Any host that reports no version fails the operation. With
/// `require_same`, the first-seen version becomes the reference and any
/// differing host fails the operation.
#[derive(Debug)]
pub struct NmaVersionOp {
    base: OpBase,
    require_same: bool,
    host_versions: BTreeMap<String, String>,
}

impl NmaVersionOp {
    /// A version check over the given hosts.
    pub fn new(hosts: Vec<String>, require_same: bool) -> Self {
        NmaVersionOp {
            base: OpBase::new("nma_version", hosts),
            require_same,
            host_versions: BTreeMap::new(),
        }
    }
}

#[async_trait]
impl Operation for NmaVersionOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let mut request = HostRequest { method: Method::Get, ..Default::default() };
            request.build_nma_endpoint("vertica/version");
            self.base.set_request(host, request);
        }
        Ok(())
    }

    async fn process_result(&mut self, _ctx: &mut ExecutionContext) -> Result<()> {
        for result in self.base.request.results.values() {
            self.base.log_response(result);
            if !result.is_passing() {
                if let Some(error) = result.error_for_join() {
                    return Err(error);
                }
            }
            // each response is a pair {"vertica_version": "<version string>"}
            let response = self.base.parse_map_response(&result.host, &result.content)?;
            let version = response.get("vertica_version").cloned().unwrap_or_default();
            self.host_versions.insert(result.host.clone(), version);
        }
        check_versions(&self.host_versions, self.require_same)?;
        Ok(())
    }
}

/// Verify the collected versions: every host must report one, and with
/// `require_same` they must all match the first-seen (lowest host) version.
fn check_versions(host_versions: &BTreeMap<String, String>, require_same: bool) -> Result<String> {
    let mut reference: Option<&String> = None;
    for (host, version) in host_versions {
        info!(host = %host, version = %version, "version check");
        if version.is_empty() {
            return Err(OpsError::MissingVersion { host: host.clone() });
        }
        match reference {
            None => reference = Some(version),
            Some(first) if first != version && require_same => {
                return Err(OpsError::VersionMismatch {
                    first: first.clone(),
                    second: version.clone(),
                });
            }
            Some(_) => {}
        }
    }
    reference
        .cloned()
        .ok_or(OpsError::MissingVersion { host: "any host".to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(h, v)| (h.to_string(), v.to_string())).collect()
    }

    #[test]
    fn matching_versions_pass() {
        let map = versions(&[("10.0.0.1", "v12.0.4"), ("10.0.0.2", "v12.0.4")]);
        assert_eq!(check_versions(&map, true).unwrap(), "v12.0.4");
    }

    #[test]
    fn empty_version_fails_regardless_of_require_same() {
        let map = versions(&[("10.0.0.1", "")]);
        assert!(matches!(
            check_versions(&map, false),
            Err(OpsError::MissingVersion { .. })
        ));
        assert!(matches!(
            check_versions(&map, true),
            Err(OpsError::MissingVersion { .. })
        ));
    }

    #[test]
    fn distinct_versions_fail_when_same_required() {
        let map = versions(&[("10.0.0.1", "v12.0.3"), ("10.0.0.2", "v12.0.4")]);
        match check_versions(&map, true) {
            Err(OpsError::VersionMismatch { first, second }) => {
                assert_eq!(first, "v12.0.3");
                assert_eq!(second, "v12.0.4");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn distinct_versions_pass_when_same_not_required() {
        let map = versions(&[("10.0.0.1", "v12.0.3"), ("10.0.0.2", "v12.0.4")]);
        assert!(check_versions(&map, false).is_ok());
    }

    #[test]
    fn no_hosts_yields_missing_version() {
        assert!(check_versions(&BTreeMap::new(), true).is_err());
    }
}
