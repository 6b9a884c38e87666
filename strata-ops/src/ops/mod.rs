//! The operation abstraction: a four-phase unit the engine drives.
//!
//! Concrete operations are the verbs of the protocol. Each one embeds an
//! [`OpBase`] with the shared fields (name, hosts, built request, skip
//! flag, TLS material) and implements `prepare` / `process_result`; the
//! default `execute` dispatches the built request and hands the collected
//! results to `process_result`.

pub mod https;
pub mod nma;

use crate::engine::ExecutionContext;
use crate::error::{OpsError, Result};
use crate::http::request::{ClusterRequest, HostRequest, TlsCerts};
use crate::http::response::HostResult;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

/// A unit of work the engine can run.
///
/// Lifecycle: `prepare` derives the host set and fills the cluster request
/// from the execution context without performing I/O; `execute` dispatches
/// the request, waits for every response, and calls `process_result`;
/// `finalize` is best-effort cleanup that always runs.
#[async_trait]
pub trait Operation: Send {
    /// The embedded shared fields.
    fn base(&self) -> &OpBase;

    /// The embedded shared fields, mutably.
    fn base_mut(&mut self) -> &mut OpBase;

    /// Operation name used in log lines and error prefixes.
    fn name(&self) -> &str {
        &self.base().name
    }

    /// Store the workflow's TLS material; applied to every request the
    /// operation builds.
    fn load_certs(&mut self, certs: &TlsCerts) {
        self.base_mut().certs = Some(certs.clone());
    }

    /// Whether prepare determined there is no work to do.
    fn skip_execute(&self) -> bool {
        self.base().skip_execute
    }

    /// Derive hosts and build the cluster request. No I/O beyond reading
    /// the context.
    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()>;

    /// Dispatch the built request and process the collected results.
    async fn execute(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.send_request(&mut self.base_mut().request).await?;
        self.process_result(ctx).await
    }

    /// Parse per-host responses, classify success, and update the context.
    async fn process_result(&mut self, ctx: &mut ExecutionContext) -> Result<()>;

    /// Best-effort cleanup; always invoked.
    async fn finalize(&mut self, _ctx: &mut ExecutionContext) -> Result<()> {
        Ok(())
    }
}

/// Implements the two base accessors for an operation struct whose shared
/// fields live in a field named `base`.
macro_rules! impl_op_base {
    () => {
        fn base(&self) -> &$crate::ops::OpBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut $crate::ops::OpBase {
            &mut self.base
        }
    };
}
pub(crate) use impl_op_base;

/// Shared fields of every operation.
#[derive(Debug, Default)]
pub struct OpBase {
    /// Operation name.
    pub name: String,
    /// Target hosts.
    pub hosts: Vec<String>,
    /// The built request and its collected results.
    pub request: ClusterRequest,
    /// Set during prepare when no work is needed.
    pub skip_execute: bool,
    /// TLS material stored by the engine before prepare.
    pub certs: Option<TlsCerts>,
}

impl OpBase {
    /// Shared fields for a named operation over the given hosts.
    pub fn new(name: &str, hosts: Vec<String>) -> Self {
        OpBase {
            name: name.to_string(),
            hosts,
            request: ClusterRequest::new(name),
            skip_execute: false,
            certs: None,
        }
    }

    /// Register a host request, attaching the stored TLS material.
    pub fn set_request(&mut self, host: &str, mut request: HostRequest) {
        if request.certs.is_none() {
            request.certs = self.certs.clone();
        }
        self.request.requests.insert(host.to_string(), request);
    }

    /// The collected per-host results.
    pub fn results(&self) -> &HashMap<String, HostResult> {
        &self.request.results
    }

    /// Log one host's result the way every operation does.
    pub fn log_response(&self, result: &HostResult) {
        info!(
            operation = %self.name,
            host = %result.host,
            status = ?result.status,
            code = ?result.status_code,
            "result from host"
        );
    }

    /// Decode a JSON response body, mapping failures to a parse error
    /// carrying the operation name and host.
    pub fn parse_response<T: DeserializeOwned>(&self, host: &str, content: &str) -> Result<T> {
        serde_json::from_str(content).map_err(|e| OpsError::ResponseFormat {
            op: self.name.clone(),
            host: host.to_string(),
            cause: e.to_string(),
        })
    }

    /// Decode a flat string-to-string JSON object response.
    pub fn parse_map_response(&self, host: &str, content: &str) -> Result<HashMap<String, String>> {
        self.parse_response(host, content)
    }

    /// Verify the in-body `status` field some HTTPS endpoints carry.
    pub fn check_response_status(&self, host: &str, content: &str) -> Result<()> {
        #[derive(Deserialize)]
        struct ResponseStatus {
            #[serde(default)]
            status: i32,
        }
        let parsed: ResponseStatus = self.parse_response(host, content)?;
        if parsed.status != 0 {
            return Err(OpsError::UnexpectedResponse {
                op: self.name.clone(),
                host: host.to_string(),
                cause: format!("status code in response body is {}", parsed.status),
            });
        }
        Ok(())
    }
}

/// Basic-auth material for HTTPS operations.
///
/// `use_password` is explicit so a deliberately empty password (create_db
/// before a password is set) is distinguishable from "no credentials".
#[derive(Debug, Clone, Default)]
pub struct HttpsAuth {
    /// Whether to attach username and password.
    pub use_password: bool,
    /// Username for basic auth.
    pub username: String,
    /// Password for basic auth.
    pub password: Option<String>,
}

impl HttpsAuth {
    /// Validated auth material. A username is required when a password is
    /// to be used.
    pub fn new(use_password: bool, username: &str, password: Option<String>) -> Result<Self> {
        if use_password && username.is_empty() {
            return Err(OpsError::OptionValidation {
                cause: "a username is required when a password is used".to_string(),
            });
        }
        Ok(HttpsAuth {
            use_password,
            username: username.to_string(),
            password,
        })
    }

    /// No credentials.
    pub fn none() -> Self {
        Self::default()
    }

    /// Attach the credentials to a host request.
    pub fn apply(&self, request: &mut HostRequest) {
        if self.use_password {
            request.username = self.username.clone();
            request.password = Some(self.password.clone().unwrap_or_default());
        }
    }
}

/// The command a workflow is running on behalf of.
///
/// A handful of operations behave differently per command (which hosts to
/// scan, which absences are errors); they branch on this single enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPolicy {
    /// create_db
    CreateDb,
    /// drop_db
    DropDb,
    /// start_db
    StartDb,
    /// stop_db
    StopDb,
    /// db_add_node
    AddNode,
    /// db_remove_node
    RemoveNode,
    /// db_add_subcluster
    AddSubcluster,
    /// db_remove_subcluster
    RemoveSubcluster,
    /// stop_subcluster
    StopSubcluster,
    /// sandbox_subcluster
    Sandbox,
    /// unsandbox_subcluster
    Unsandbox,
    /// re_ip
    ReIp,
    /// fetch_nodes_details
    FetchNodeState,
    /// install_packages
    InstallPackages,
    /// show_restore_points
    ShowRestorePoints,
    /// replication_start
    Replication,
    /// manage_config_recover
    ConfigRecover,
}

impl CommandPolicy {
    /// Commands that must scan every host response to build a complete
    /// cluster view; other commands may stop at the first usable response.
    pub fn requires_complete_scan(self) -> bool {
        matches!(
            self,
            CommandPolicy::Sandbox
                | CommandPolicy::Unsandbox
                | CommandPolicy::StopDb
                | CommandPolicy::StopSubcluster
        )
    }

    /// The user-facing command name.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandPolicy::CreateDb => "create_db",
            CommandPolicy::DropDb => "drop_db",
            CommandPolicy::StartDb => "start_db",
            CommandPolicy::StopDb => "stop_db",
            CommandPolicy::AddNode => "db_add_node",
            CommandPolicy::RemoveNode => "db_remove_node",
            CommandPolicy::AddSubcluster => "db_add_subcluster",
            CommandPolicy::RemoveSubcluster => "db_remove_subcluster",
            CommandPolicy::StopSubcluster => "stop_subcluster",
            CommandPolicy::Sandbox => "sandbox_subcluster",
            CommandPolicy::Unsandbox => "unsandbox_subcluster",
            CommandPolicy::ReIp => "re_ip",
            CommandPolicy::FetchNodeState => "fetch_nodes_details",
            CommandPolicy::InstallPackages => "install_packages",
            CommandPolicy::ShowRestorePoints => "show_restore_points",
            CommandPolicy::Replication => "replication_start",
            CommandPolicy::ConfigRecover => "manage_config_recover",
        }
    }
}

/// Choose the initiator: the first primary-UP host, in sorted address
/// order, that is not excluded. Deterministic given its inputs.
pub fn choose_initiator(primary_up_nodes: &[String], exclude: &[String]) -> Result<String> {
    let mut candidates: Vec<&String> = primary_up_nodes.iter().collect();
    candidates.sort();
    candidates
        .into_iter()
        .find(|host| !exclude.contains(host))
        .cloned()
        .ok_or(OpsError::NoEligibleInitiator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initiator_is_first_sorted_primary_up() {
        let primaries = vec!["10.0.0.3".to_string(), "10.0.0.1".to_string(), "10.0.0.2".to_string()];
        assert_eq!(choose_initiator(&primaries, &[]).unwrap(), "10.0.0.1");
    }

    #[test]
    fn initiator_never_in_exclusion_set() {
        let primaries = vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()];
        let exclude = vec!["10.0.0.1".to_string()];
        let initiator = choose_initiator(&primaries, &exclude).unwrap();
        assert_eq!(initiator, "10.0.0.2");
        assert!(!exclude.contains(&initiator));
    }

    #[test]
    fn initiator_selection_is_deterministic() {
        let primaries = vec!["10.0.0.2".to_string(), "10.0.0.1".to_string()];
        let first = choose_initiator(&primaries, &[]).unwrap();
        for _ in 0..10 {
            assert_eq!(choose_initiator(&primaries, &[]).unwrap(), first);
        }
    }

    #[test]
    fn all_excluded_fails() {
        let primaries = vec!["10.0.0.1".to_string()];
        let exclude = vec!["10.0.0.1".to_string()];
        assert!(matches!(
            choose_initiator(&primaries, &exclude),
            Err(OpsError::NoEligibleInitiator)
        ));
    }

    #[test]
    fn auth_requires_username_with_password() {
        assert!(HttpsAuth::new(true, "", Some("secret".into())).is_err());
        let auth = HttpsAuth::new(true, "dbadmin", Some("secret".into())).unwrap();
        let mut request = HostRequest::default();
        auth.apply(&mut request);
        assert_eq!(request.username, "dbadmin");
        assert_eq!(request.password.as_deref(), Some("secret"));
    }

    #[test]
    fn auth_empty_password_still_applies() {
        let auth = HttpsAuth::new(true, "dbadmin", None).unwrap();
        let mut request = HostRequest::default();
        auth.apply(&mut request);
        assert_eq!(request.password.as_deref(), Some(""));
    }

    #[test]
    fn complete_scan_policies() {
        assert!(CommandPolicy::StopDb.requires_complete_scan());
        assert!(CommandPolicy::StopSubcluster.requires_complete_scan());
        assert!(CommandPolicy::Sandbox.requires_complete_scan());
        assert!(CommandPolicy::Unsandbox.requires_complete_scan());
        assert!(!CommandPolicy::AddNode.requires_complete_scan());
        assert!(!CommandPolicy::InstallPackages.requires_complete_scan());
    }
}
