//! Engine and workflow behavior against mock daemons.
//!
//! The adapter pool is process-wide, so every test uses its own loopback
//! alias (127.0.0.x) as the host key; the mock servers listen on 0.0.0.0
//! to accept connections through any alias.

use std::net::TcpListener;
use std::time::Duration;
use strata_ops::http::{AdapterPool, ClusterRequest, HostRequest, HttpAdapter, Method};
use strata_ops::ops::https::{HttpsGetUpNodesOp, HttpsInstallPackagesOp, HttpsPollNodeStateOp};
use strata_ops::ops::nma::NmaUploadConfigOp;
use strata_ops::workflows::{re_ip, DatabaseOptions, ReIpOptions, ReIpPair};
use strata_ops::{CommandPolicy, HttpsAuth, Operation, OperationEngine, OpsError};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Start a mock daemon and register a plain-HTTP adapter for `host`
/// pointing at it.
async fn server_for(host: &str) -> MockServer {
    let listener = TcpListener::bind("0.0.0.0:0").expect("bind mock listener");
    let server = MockServer::builder().listener(listener).start().await;
    let port = server.address().port();
    AdapterPool::instance().insert_adapter(host, HttpAdapter::with_ports(host, port, port, false));
    server
}

fn nodes_body(entries: &[(&str, &str, bool)]) -> serde_json::Value {
    let node_list: Vec<serde_json::Value> = entries
        .iter()
        .map(|(address, state, primary)| {
            serde_json::json!({
                "name": format!("v_test_db_node_{address}"),
                "address": address,
                "database": "test_db",
                "state": state,
                "is_primary": primary,
                "subcluster_name": "default_subcluster",
            })
        })
        .collect();
    serde_json::json!({ "node_list": node_list })
}

async fn mount_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn pool_collects_one_result_per_host() {
    let server_a = server_for("127.0.0.2").await;
    let server_b = server_for("127.0.0.3").await;
    mount_health(&server_a).await;
    mount_health(&server_b).await;

    let mut request = ClusterRequest::new("nma_health");
    for host in ["127.0.0.2", "127.0.0.3"] {
        let mut host_request = HostRequest { method: Method::Get, ..Default::default() };
        host_request.build_nma_endpoint("health");
        request.requests.insert(host.to_string(), host_request);
    }

    AdapterPool::instance().send_request(&mut request).await.unwrap();
    assert_eq!(request.results.len(), request.requests.len());
    assert!(request.results["127.0.0.2"].is_passing());
    assert!(request.results["127.0.0.3"].is_passing());
}

#[tokio::test]
async fn unknown_host_fails_the_whole_batch() {
    let mut request = ClusterRequest::new("nma_health");
    let mut host_request = HostRequest { method: Method::Get, ..Default::default() };
    host_request.build_nma_endpoint("health");
    request.requests.insert("10.255.255.1".to_string(), host_request);

    let err = AdapterPool::instance().send_request(&mut request).await.unwrap_err();
    assert!(matches!(err, OpsError::HostNotInPool { .. }), "{err}");
    assert!(request.results.is_empty());
}

#[tokio::test]
async fn skip_execute_bypasses_dispatch() {
    // no config content was captured, so the upload has nothing to do and
    // never touches the (nonexistent) adapters
    let upload = NmaUploadConfigOp::new(
        "transfer_config",
        vec!["10.255.255.2".to_string()],
        "config/vertica",
    );
    let instructions: Vec<Box<dyn Operation>> = vec![Box::new(upload)];
    let mut engine = OperationEngine::new(instructions, None);
    engine.run().await.unwrap();
}

#[tokio::test]
async fn up_node_discovery_feeds_the_next_operation() {
    let server = server_for("127.0.0.4").await;

    Mock::given(method("GET"))
        .and(path("/v1/nodes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(nodes_body(&[("127.0.0.4", "UP", true)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/packages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "packages": [
                {"package_name": "ComplexTypes", "install_status": "skipped"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = HttpsAuth::none();
    let instructions: Vec<Box<dyn Operation>> = vec![
        Box::new(HttpsGetUpNodesOp::new(
            "test_db",
            vec!["127.0.0.4".to_string()],
            auth.clone(),
            CommandPolicy::InstallPackages,
        )),
        Box::new(HttpsInstallPackagesOp::new(Vec::new(), auth, false)),
    ];
    let mut engine = OperationEngine::new(instructions, None);
    engine.run().await.unwrap();
    assert_eq!(engine.context.up_hosts, vec!["127.0.0.4"]);
    assert_eq!(engine.context.primary_up_nodes, vec!["127.0.0.4"]);
}

#[tokio::test]
async fn poll_node_state_waits_for_up() {
    let server = server_for("127.0.0.5").await;

    // the first answer reports the node down, later answers report it up
    Mock::given(method("GET"))
        .and(path("/v1/nodes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(nodes_body(&[("127.0.0.5", "DOWN", true)])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/nodes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(nodes_body(&[("127.0.0.5", "UP", true)])),
        )
        .mount(&server)
        .await;

    let poll = HttpsPollNodeStateOp::new(vec!["127.0.0.5".to_string()], HttpsAuth::none())
        .with_timing(Duration::from_secs(10), Duration::from_millis(20));
    let instructions: Vec<Box<dyn Operation>> = vec![Box::new(poll)];
    let mut engine = OperationEngine::new(instructions, None);
    engine.run().await.unwrap();
}

#[tokio::test]
async fn poll_node_state_times_out_with_sorted_hosts() {
    let server = server_for("127.0.0.6").await;

    Mock::given(method("GET"))
        .and(path("/v1/nodes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(nodes_body(&[("127.0.0.6", "DOWN", true)])),
        )
        .mount(&server)
        .await;

    let poll = HttpsPollNodeStateOp::new(vec!["127.0.0.6".to_string()], HttpsAuth::none())
        .with_timing(Duration::from_millis(100), Duration::from_millis(20));
    let instructions: Vec<Box<dyn Operation>> = vec![Box::new(poll)];
    let mut engine = OperationEngine::new(instructions, None);
    let err = engine.run().await.unwrap_err();
    match err {
        OpsError::NodeStateTimeout { hosts, .. } => assert_eq!(hosts, vec!["127.0.0.6"]),
        other => panic!("unexpected: {other}"),
    }
}

#[tokio::test]
async fn re_ip_without_quorum_dispatches_no_puts() {
    let server = server_for("127.0.0.7").await;
    let second = server_for("127.0.0.8").await;

    for server in [&server, &second] {
        mount_health(server).await;
        Mock::given(method("GET"))
            .and(path("/v1/network-profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "eth0",
                "address": "127.0.0.7",
                "subnet": "127.0.0.0/8",
                "netmask": "255.0.0.0",
                "broadcast": "127.255.255.255"
            })))
            .mount(server)
            .await;
        // quorum is checked before any address rewrite goes out
        Mock::given(method("PUT"))
            .and(path_regex(r"^/v1/nodes/.*/ip$"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"detail": ""})),
            )
            .expect(0)
            .mount(server)
            .await;
    }
    // one up node only, while two pairs need re-ip
    Mock::given(method("GET"))
        .and(path("/v1/nodes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(nodes_body(&[("127.0.0.7", "UP", true)])),
        )
        .mount(&server)
        .await;

    let mut options = ReIpOptions {
        db: DatabaseOptions {
            db_name: "test_db".into(),
            hosts: vec!["127.0.0.7".into()],
            ..Default::default()
        },
        pairs: vec![
            ReIpPair { node_name: "v_test_db_node0002".into(), new_address: "127.0.0.7".into() },
            ReIpPair { node_name: "v_test_db_node0003".into(), new_address: "127.0.0.8".into() },
        ],
    };
    let err = re_ip(&mut options).await.unwrap_err();
    assert!(err.is_quorum_loss(), "{err}");
    assert!(err.to_string().contains("not enough for re-ip"), "{err}");
}
