//! The adapter that performs one HTTP call against one host.

use crate::error::{OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::http::response::HostResult;
use strata_core::defaults::{DEFAULT_HTTPS_PORT, DEFAULT_NMA_PORT};
use strata_core::Problem;
use tracing::debug;

/// Performs HTTP calls against a single host.
///
/// One adapter exists per host in the process-wide pool and is reused across
/// workflows. The adapter owns URL construction, credential and TLS
/// attachment, and outcome classification; it knows nothing about
/// operations.
#[derive(Debug)]
pub struct HttpAdapter {
    host: String,
    nma_port: u16,
    https_port: u16,
    use_tls: bool,
}

impl HttpAdapter {
    /// An adapter for the given host with default daemon ports.
    pub fn new(host: &str) -> Self {
        Self::with_ports(host, DEFAULT_NMA_PORT, DEFAULT_HTTPS_PORT, true)
    }

    /// An adapter with explicit ports, optionally speaking plain HTTP.
    pub fn with_ports(host: &str, nma_port: u16, https_port: u16, use_tls: bool) -> Self {
        HttpAdapter {
            host: host.to_string(),
            nma_port,
            https_port,
            use_tls,
        }
    }

    /// The host this adapter talks to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Perform one call and classify the outcome. Transport failures are
    /// folded into the returned [`HostResult`] rather than an `Err`, so the
    /// pool can always collect one result per host.
    pub async fn send(&self, request: &HostRequest) -> HostResult {
        if let Some(masked) = request.masked_body() {
            debug!(host = %self.host, endpoint = %request.endpoint, body = %masked, "sending request");
        } else {
            debug!(host = %self.host, endpoint = %request.endpoint, "sending request");
        }
        match self.send_inner(request).await {
            Ok(result) => result,
            Err(OpsError::Transport { cause, timeout, .. }) => {
                HostResult::exception(&self.host, cause, timeout)
            }
            Err(other) => HostResult::exception(&self.host, other.to_string(), false),
        }
    }

    fn build_url(&self, request: &HostRequest) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        let port = if request.is_nma { self.nma_port } else { self.https_port };
        let host = if self.host.contains(':') {
            // bracket bare IPv6 addresses
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!("{}://{}:{}/{}", scheme, host, port, request.endpoint)
    }

    fn build_client(&self, request: &HostRequest) -> Result<reqwest::Client> {
        let transport = |cause: String| OpsError::Transport {
            host: self.host.clone(),
            cause,
            timeout: false,
        };

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        match &request.certs {
            Some(certs) if !certs.is_empty() => {
                if !certs.cert.is_empty() && !certs.key.is_empty() {
                    let identity = reqwest::Identity::from_pkcs8_pem(
                        certs.cert.as_bytes(),
                        certs.key.as_bytes(),
                    )
                    .map_err(|e| transport(format!("invalid client certificate: {e}")))?;
                    builder = builder.identity(identity);
                }
                if certs.ca_cert.is_empty() {
                    builder = builder.danger_accept_invalid_certs(true);
                } else {
                    let ca = reqwest::Certificate::from_pem(certs.ca_cert.as_bytes())
                        .map_err(|e| transport(format!("invalid CA certificate: {e}")))?;
                    builder = builder.add_root_certificate(ca);
                }
            }
            // the daemons use self-signed certificates unless a CA is given
            _ => builder = builder.danger_accept_invalid_certs(true),
        }

        builder.build().map_err(|e| transport(e.to_string()))
    }

    async fn send_inner(&self, request: &HostRequest) -> Result<HostResult> {
        let client = self.build_client(request)?;
        let url = self.build_url(request);

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = client.request(method, &url);
        if !request.query_params.is_empty() {
            let pairs: Vec<(&str, &str)> = request
                .query_params
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            builder = builder.query(&pairs);
        }
        if request.password.is_some() || !request.username.is_empty() {
            builder = builder.basic_auth(&request.username, request.password.as_deref());
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = builder.send().await.map_err(|e| OpsError::Transport {
            host: self.host.clone(),
            cause: e.to_string(),
            timeout: e.is_timeout(),
        })?;

        let status_code = response.status().as_u16();
        let content = response.text().await.map_err(|e| OpsError::Transport {
            host: self.host.clone(),
            cause: e.to_string(),
            timeout: e.is_timeout(),
        })?;

        if (200..300).contains(&status_code) {
            return Ok(HostResult::success(&self.host, status_code, content));
        }

        // non-2xx bodies follow RFC 7807; synthesize a problem when the body
        // is not one
        let problem = Problem::parse(&content).unwrap_or_else(|| Problem {
            detail: content.clone(),
            host: self.host.clone(),
            status: status_code,
            ..Default::default()
        });
        Ok(HostResult::failure(&self.host, status_code, content, problem))
    }
}
