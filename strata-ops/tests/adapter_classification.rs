//! Adapter outcome classification against a mock daemon.

use std::time::Duration;
use strata_ops::http::{HostRequest, HttpAdapter, Method};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter_for(server: &MockServer) -> HttpAdapter {
    let port = server.address().port();
    HttpAdapter::with_ports("127.0.0.1", port, port, false)
}

fn nma_get(endpoint: &str) -> HostRequest {
    let mut request = HostRequest { method: Method::Get, ..Default::default() };
    request.build_nma_endpoint(endpoint);
    request
}

#[tokio::test]
async fn success_response_is_passing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let result = adapter_for(&server).send(&nma_get("health")).await;
    assert!(result.is_passing());
    assert!(result.is_http_running());
    assert_eq!(result.status_code, Some(200));
}

#[tokio::test]
async fn unauthorized_problem_body_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/nodes"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "type": "https://example.com/rest/errors/unauthorized-request",
            "title": "Unauthorized-request",
            "detail": "Wrong password",
            "host": "127.0.0.1",
            "status": 401
        })))
        .mount(&server)
        .await;

    let mut request = HostRequest { method: Method::Get, ..Default::default() };
    request.build_https_endpoint("nodes");
    request.username = "dbadmin".to_string();
    request.password = Some("bad".to_string());

    let result = adapter_for(&server).send(&request).await;
    assert!(result.is_failing());
    assert!(result.is_unauthorized());
    assert!(result.is_credential_error());
    assert!(result.is_http_running());
    assert_eq!(result.problem().unwrap().detail, "Wrong password");
}

#[tokio::test]
async fn internal_error_counts_as_http_running() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/nodes"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "title": "Internal Server Error",
            "status": 500
        })))
        .mount(&server)
        .await;

    let mut request = HostRequest { method: Method::Get, ..Default::default() };
    request.build_https_endpoint("nodes");
    let result = adapter_for(&server).send(&request).await;
    assert!(result.is_internal_error());
    assert!(result.is_http_running());
}

#[tokio::test]
async fn non_problem_error_body_is_synthesized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/health"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let result = adapter_for(&server).send(&nma_get("health")).await;
    assert!(result.is_failing());
    let problem = result.problem().unwrap();
    assert_eq!(problem.status, 502);
    assert!(problem.detail.contains("bad gateway"));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut request = nma_get("health");
    request.timeout = Some(Duration::from_millis(100));
    let result = adapter_for(&server).send(&request).await;
    assert!(result.is_exception());
    assert!(result.is_timeout());
    assert!(!result.is_http_running());
}

#[tokio::test]
async fn unreachable_daemon_is_an_exception() {
    let server = MockServer::start().await;
    let port = server.address().port();
    drop(server);

    let adapter = HttpAdapter::with_ports("127.0.0.1", port, port, false);
    let result = adapter.send(&nma_get("health")).await;
    assert!(result.is_exception());
    assert!(!result.is_timeout());
    assert!(!result.is_http_running());
}

#[tokio::test]
async fn query_parameters_reach_the_daemon() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/network-profiles"))
        .and(query_param("broadcast-hint", "10.0.0.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "eth0",
            "address": "10.0.0.4",
            "subnet": "10.0.0.0/24",
            "netmask": "255.255.255.0",
            "broadcast": "10.0.0.255"
        })))
        .mount(&server)
        .await;

    let mut request = nma_get("network-profiles");
    request
        .query_params
        .insert("broadcast-hint".to_string(), "10.0.0.4".to_string());
    let result = adapter_for(&server).send(&request).await;
    assert!(result.is_passing());
    assert!(result.content.contains("eth0"));
}
