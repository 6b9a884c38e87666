//! RFC 7807 problem bodies returned by the per-host daemons.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An RFC 7807 `application/problem+json` body.
///
/// Both the node management agent and the in-database HTTPS service answer
/// non-2xx requests with this shape. All fields are optional on the wire;
/// missing fields default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// URI identifying the problem type.
    #[serde(rename = "type", default)]
    pub problem_type: String,
    /// Short human-readable summary.
    #[serde(default)]
    pub title: String,
    /// Detailed explanation specific to this occurrence.
    #[serde(default)]
    pub detail: String,
    /// The host that produced the problem.
    #[serde(default)]
    pub host: String,
    /// The HTTP status code carried in the body.
    #[serde(default)]
    pub status: u16,
}

impl Problem {
    /// Try to decode a response body as a problem document.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    /// The most specific message available: detail, then title.
    pub fn message(&self) -> &str {
        if !self.detail.is_empty() {
            &self.detail
        } else {
            &self.title
        }
    }

    /// Whether this problem reports an unauthorized request.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401 || self.problem_type.ends_with("unauthorized-request")
    }

    /// Whether this problem reports a missing subcluster.
    pub fn is_subcluster_not_found(&self) -> bool {
        self.problem_type.ends_with("subcluster-not-found")
            || self.detail.contains("does not exist in the database")
    }

    /// Whether this problem reports a missing database.
    pub fn is_database_not_found(&self) -> bool {
        self.problem_type.ends_with("database-not-found")
    }

    /// A 401 issued because the node has not yet joined the cluster.
    ///
    /// The HTTP server answers but is not ready; this is not a credential
    /// error.
    pub fn is_node_not_joined(&self) -> bool {
        self.detail.contains("has not joined cluster")
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.is_empty() {
            write!(f, "{} (status {})", self.message(), self.status)
        } else {
            write!(f, "{} (status {}, host {})", self.message(), self.status, self.host)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_unauthorized_body() {
        let body = r#"{
            "type": "https://example.com/rest/errors/unauthorized-request",
            "title": "Unauthorized-request",
            "detail": "Local node has not joined cluster yet, HTTP server will accept connections when the node has joined the cluster\n",
            "host": "0.0.0.0",
            "status": 401
        }"#;
        let problem = Problem::parse(body).unwrap();
        assert!(problem.is_unauthorized());
        assert!(problem.is_node_not_joined());
        assert!(!problem.is_subcluster_not_found());
    }

    #[test]
    fn missing_fields_default() {
        let problem = Problem::parse(r#"{"detail": "boom"}"#).unwrap();
        assert_eq!(problem.status, 0);
        assert_eq!(problem.message(), "boom");
    }

    #[test]
    fn subcluster_not_found_by_detail() {
        let problem = Problem::parse(
            r#"{"detail": "subcluster sc1 does not exist in the database", "status": 404}"#,
        )
        .unwrap();
        assert!(problem.is_subcluster_not_found());
    }

    #[test]
    fn non_json_body_is_none() {
        assert!(Problem::parse("<html>502</html>").is_none());
    }
}
