//! Request value types: one HTTP call per host, grouped per operation.

use crate::http::response::HostResult;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;
use strata_core::SemVer;
use tracing::warn;

/// Version prefix of node management agent endpoints.
pub const NMA_VERSION_1: &str = "v1/";
/// Version prefix of in-database HTTPS endpoints.
pub const HTTPS_VERSION_1: &str = "v1/";
/// The NMA endpoint version currently spoken.
pub const NMA_CUR_VERSION: &str = NMA_VERSION_1;
/// The HTTPS endpoint version currently spoken.
pub const HTTPS_CUR_VERSION: &str = HTTPS_VERSION_1;

/// Mask substituted for sensitive values in logs.
pub const MASKED_VALUE: &str = "******";

/// HTTP method of a host request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    /// GET.
    #[default]
    Get,
    /// PUT.
    Put,
    /// POST.
    Post,
    /// DELETE.
    Delete,
}

impl Method {
    /// The method as a wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TLS material propagated into requests by the engine.
#[derive(Debug, Clone, Default)]
pub struct TlsCerts {
    /// Client private key (PEM).
    pub key: String,
    /// Client certificate (PEM).
    pub cert: String,
    /// CA certificate used to verify the daemons (PEM).
    pub ca_cert: String,
}

impl TlsCerts {
    /// Whether any material is present.
    pub fn is_empty(&self) -> bool {
        self.key.is_empty() && self.cert.is_empty() && self.ca_cert.is_empty()
    }
}

/// One HTTP call against one host.
#[derive(Debug, Clone, Default)]
pub struct HostRequest {
    /// HTTP method.
    pub method: Method,
    /// Versioned endpoint path, e.g. `v1/nodes`.
    pub endpoint: String,
    /// Whether the request targets the NMA (selects the port).
    pub is_nma: bool,
    /// Query parameters. Ordered so built URLs are deterministic.
    pub query_params: BTreeMap<String, String>,
    /// JSON-encoded request body, when present.
    pub body: Option<String>,
    /// Username for basic auth (HTTPS endpoints only).
    pub username: String,
    /// Password for basic auth; `Some("")` is a valid empty password.
    pub password: Option<String>,
    /// Per-request timeout for slow endpoints.
    pub timeout: Option<Duration>,
    /// TLS material injected by the engine.
    pub certs: Option<TlsCerts>,
}

impl HostRequest {
    /// Target an NMA endpoint, prefixing the current NMA version.
    pub fn build_nma_endpoint(&mut self, path: &str) {
        self.is_nma = true;
        self.endpoint = format!("{NMA_CUR_VERSION}{path}");
    }

    /// Target an HTTPS-service endpoint, prefixing the current version.
    pub fn build_https_endpoint(&mut self, path: &str) {
        self.is_nma = false;
        self.endpoint = format!("{HTTPS_CUR_VERSION}{path}");
    }

    /// The body with credential-bearing fields masked, for logging.
    pub fn masked_body(&self) -> Option<String> {
        let body = self.body.as_ref()?;
        match serde_json::from_str::<SensitiveFields>(body) {
            Ok(mut fields) => {
                fields.mask();
                serde_json::to_string(&fields).ok()
            }
            Err(_) => {
                warn!(endpoint = %self.endpoint, "request body is not maskable, not logging it");
                None
            }
        }
    }
}

/// Projection of a request body used to mask credentials in logs.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SensitiveFields {
    /// Database password.
    #[serde(default)]
    pub db_password: String,
    /// AWS access key id.
    #[serde(default)]
    pub aws_access_key_id: String,
    /// AWS secret access key.
    #[serde(default)]
    pub aws_secret_access_key: String,
    /// Free-form configuration parameters; credential-bearing keys are
    /// masked by lowercase name.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    /// Everything else in the body, passed through untouched.
    #[serde(flatten)]
    pub rest: HashMap<String, serde_json::Value>,
}

impl SensitiveFields {
    const SENSITIVE_KEYS: [&'static str; 4] =
        ["awsauth", "awssessiontoken", "gcsauth", "azurestoragecredentials"];

    /// Replace credential values with [`MASKED_VALUE`].
    pub fn mask(&mut self) {
        self.db_password = MASKED_VALUE.to_string();
        self.aws_access_key_id = MASKED_VALUE.to_string();
        self.aws_secret_access_key = MASKED_VALUE.to_string();
        for (key, value) in self.parameters.iter_mut() {
            if Self::SENSITIVE_KEYS.contains(&key.to_lowercase().as_str()) {
                *value = MASKED_VALUE.to_string();
            }
        }
    }
}

/// All per-host requests of one operation, plus the collected results.
#[derive(Debug, Default)]
pub struct ClusterRequest {
    /// Operation name, used in log lines.
    pub name: String,
    /// Version tag of the request set.
    pub semver: SemVer,
    /// Host to request.
    pub requests: HashMap<String, HostRequest>,
    /// Host to result, filled by dispatch.
    pub results: HashMap<String, HostResult>,
}

impl ClusterRequest {
    /// An empty request set for the named operation.
    pub fn new(name: &str) -> Self {
        ClusterRequest {
            name: name.to_string(),
            semver: SemVer::new(1, 0, 0),
            requests: HashMap::new(),
            results: HashMap::new(),
        }
    }

    /// Whether no host request was built.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_builders_prefix_version() {
        let mut request = HostRequest::default();
        request.build_nma_endpoint("health");
        assert_eq!(request.endpoint, "v1/health");
        assert!(request.is_nma);

        request.build_https_endpoint("nodes");
        assert_eq!(request.endpoint, "v1/nodes");
        assert!(!request.is_nma);
    }

    #[test]
    fn masking_covers_fixed_fields_and_parameter_keys() {
        let mut fields = SensitiveFields {
            db_password: "secret".into(),
            aws_access_key_id: "AKIA".into(),
            aws_secret_access_key: "aws-secret".into(),
            parameters: HashMap::from([
                ("AWSAuth".to_string(), "key:secret".to_string()),
                ("GCSAuth".to_string(), "key:secret".to_string()),
                ("SomeOtherParam".to_string(), "visible".to_string()),
            ]),
            rest: HashMap::new(),
        };
        fields.mask();
        assert_eq!(fields.db_password, MASKED_VALUE);
        assert_eq!(fields.aws_access_key_id, MASKED_VALUE);
        assert_eq!(fields.aws_secret_access_key, MASKED_VALUE);
        assert_eq!(fields.parameters["AWSAuth"], MASKED_VALUE);
        assert_eq!(fields.parameters["GCSAuth"], MASKED_VALUE);
        assert_eq!(fields.parameters["SomeOtherParam"], "visible");
    }

    #[test]
    fn masked_body_preserves_other_fields() {
        let mut request = HostRequest::default();
        request.body = Some(
            r#"{"db_password": "secret", "db_name": "test_db", "parameters": {"awssessiontoken": "tok"}}"#
                .to_string(),
        );
        let masked = request.masked_body().unwrap();
        assert!(masked.contains(MASKED_VALUE));
        assert!(masked.contains("test_db"));
        assert!(!masked.contains("secret"));
        assert!(!masked.contains("tok"));
    }
}
