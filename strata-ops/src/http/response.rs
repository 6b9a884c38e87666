//! Per-host results and their status classification.

use crate::error::OpsError;
use strata_core::Problem;

const WRONG_CREDENTIAL_MESSAGES: [&str; 2] = ["Wrong password", "Wrong certificate"];

/// Outcome classification of one host request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    /// The remote daemon answered 2xx.
    Success,
    /// The remote daemon answered non-2xx.
    Failure,
    /// The request never produced an HTTP response (transport failure).
    Exception,
}

/// Result of one HTTP call against one host.
#[derive(Debug)]
pub struct HostResult {
    /// Outcome classification.
    pub status: ResultStatus,
    /// HTTP status code, when an HTTP response was received.
    pub status_code: Option<u16>,
    /// The host that was called.
    pub host: String,
    /// The raw response body.
    pub content: String,
    /// Set when the call ended in a failure scenario.
    pub error: Option<OpsError>,
}

impl HostResult {
    /// A 2xx result.
    pub fn success(host: &str, status_code: u16, content: String) -> Self {
        HostResult {
            status: ResultStatus::Success,
            status_code: Some(status_code),
            host: host.to_string(),
            content,
            error: None,
        }
    }

    /// A non-2xx result carrying the decoded problem body.
    pub fn failure(host: &str, status_code: u16, content: String, problem: Problem) -> Self {
        HostResult {
            status: ResultStatus::Failure,
            status_code: Some(status_code),
            host: host.to_string(),
            content,
            error: Some(OpsError::Remote { host: host.to_string(), problem }),
        }
    }

    /// A transport failure.
    pub fn exception(host: &str, cause: String, timeout: bool) -> Self {
        HostResult {
            status: ResultStatus::Exception,
            status_code: None,
            host: host.to_string(),
            content: String::new(),
            error: Some(OpsError::Transport { host: host.to_string(), cause, timeout }),
        }
    }

    /// Whether the call succeeded.
    pub fn is_passing(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the remote daemon rejected the call.
    pub fn is_failing(&self) -> bool {
        self.status == ResultStatus::Failure
    }

    /// Whether the call never produced an HTTP response.
    pub fn is_exception(&self) -> bool {
        self.status == ResultStatus::Exception
    }

    /// Whether the call failed with a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self.error, Some(OpsError::Transport { timeout: true, .. }))
    }

    /// Whether the remote daemon answered 401.
    ///
    /// A 401 can mean a wrong password, a wrong certificate, or a node that
    /// has not yet joined the cluster; see [`HostResult::is_credential_error`]
    /// for the narrower check.
    pub fn is_unauthorized(&self) -> bool {
        self.status_code == Some(401)
    }

    /// Whether the remote daemon answered 500.
    pub fn is_internal_error(&self) -> bool {
        self.status_code == Some(500)
    }

    /// Whether the remote HTTP service answered at all: success, 401, or 500.
    pub fn is_http_running(&self) -> bool {
        self.is_passing() || self.is_unauthorized() || self.is_internal_error()
    }

    /// Whether a 401 specifically reports a wrong password or certificate.
    pub fn is_credential_error(&self) -> bool {
        if !self.is_unauthorized() {
            return false;
        }
        WRONG_CREDENTIAL_MESSAGES
            .iter()
            .any(|message| self.content.contains(message))
    }

    /// The decoded problem body of a failing result.
    pub fn problem(&self) -> Option<&Problem> {
        match &self.error {
            Some(OpsError::Remote { problem, .. }) => Some(problem),
            _ => None,
        }
    }

    /// Take the error out of the result for aggregation.
    pub fn take_error(&mut self) -> Option<OpsError> {
        self.error.take()
    }

    /// A copy of the error, for aggregation without consuming the result.
    pub fn error_for_join(&self) -> Option<OpsError> {
        match &self.error {
            Some(OpsError::Remote { host, problem }) => Some(OpsError::Remote {
                host: host.clone(),
                problem: problem.clone(),
            }),
            Some(OpsError::Transport { host, cause, timeout }) => Some(OpsError::Transport {
                host: host.clone(),
                cause: cause.clone(),
                timeout: *timeout,
            }),
            Some(_) | None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unauthorized(content: &str) -> HostResult {
        let problem = Problem::parse(content).unwrap_or_default();
        HostResult::failure("10.0.0.1", 401, content.to_string(), problem)
    }

    #[test]
    fn success_is_passing_and_http_running() {
        let result = HostResult::success("10.0.0.1", 200, "{}".into());
        assert!(result.is_passing());
        assert!(result.is_http_running());
        assert!(!result.is_failing());
        assert!(!result.is_exception());
    }

    #[test]
    fn wrong_password_is_a_credential_error() {
        let result = unauthorized(r#"{"detail": "Wrong password", "status": 401}"#);
        assert!(result.is_unauthorized());
        assert!(result.is_credential_error());
        assert!(result.is_http_running());
    }

    #[test]
    fn node_not_joined_is_unauthorized_but_not_credential_error() {
        let result = unauthorized(
            r#"{"detail": "Local node has not joined cluster yet, HTTP server will accept connections when the node has joined the cluster", "status": 401}"#,
        );
        assert!(result.is_unauthorized());
        assert!(!result.is_credential_error());
        assert!(result.is_http_running());
    }

    #[test]
    fn internal_error_counts_as_http_running() {
        let problem = Problem { status: 500, ..Default::default() };
        let result = HostResult::failure("10.0.0.1", 500, String::new(), problem);
        assert!(result.is_internal_error());
        assert!(result.is_http_running());
        assert!(result.is_failing());
    }

    #[test]
    fn timeouts_are_distinguished() {
        let result = HostResult::exception("10.0.0.1", "read timed out".into(), true);
        assert!(result.is_exception());
        assert!(result.is_timeout());
        assert!(!result.is_http_running());

        let result = HostResult::exception("10.0.0.1", "connection refused".into(), false);
        assert!(result.is_exception());
        assert!(!result.is_timeout());
    }
}
