//! The process-wide adapter pool.

use crate::error::{OpsError, Result};
use crate::http::adapter::HttpAdapter;
use crate::http::request::{ClusterRequest, HostRequest};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

static POOL: Lazy<AdapterPool> = Lazy::new(AdapterPool::new);

/// Process-wide registry mapping host to adapter.
///
/// Adapters are keyed by host and reused across workflows; isolation
/// between concurrent workflows comes from their disjoint execution
/// contexts, not from separate pools. Insertion is safe under concurrent
/// workflow setup.
#[derive(Debug)]
pub struct AdapterPool {
    connections: DashMap<String, Arc<HttpAdapter>>,
}

impl AdapterPool {
    fn new() -> Self {
        AdapterPool { connections: DashMap::new() }
    }

    /// The singleton pool, constructed on first use.
    pub fn instance() -> &'static AdapterPool {
        &POOL
    }

    /// Ensure an adapter exists for the host.
    pub fn ensure_host(&self, host: &str) {
        self.connections
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(HttpAdapter::new(host)));
    }

    /// Register a specific adapter for a host, replacing any existing one.
    pub fn insert_adapter(&self, host: &str, adapter: HttpAdapter) {
        self.connections.insert(host.to_string(), Arc::new(adapter));
    }

    /// Dispatch every host request of `request` concurrently and collect
    /// exactly one result per host into the request's result collection.
    ///
    /// A host with no adapter in the pool fails the whole batch before any
    /// request is sent. Results arrive in arbitrary order and are keyed by
    /// host; the call returns only after all outstanding requests have
    /// responded or timed out.
    pub async fn send_request(&self, request: &mut ClusterRequest) -> Result<()> {
        debug!(operation = %request.name, hosts = request.requests.len(), "dispatching cluster request");

        let mut batch: Vec<(Arc<HttpAdapter>, HostRequest)> =
            Vec::with_capacity(request.requests.len());
        for (host, host_request) in &request.requests {
            let adapter = self
                .connections
                .get(host)
                .ok_or_else(|| OpsError::HostNotInPool { host: host.clone() })?
                .clone();
            batch.push((adapter, host_request.clone()));
        }

        let host_count = batch.len();
        if host_count == 0 {
            request.results.clear();
            return Ok(());
        }

        let (sender, mut receiver) = mpsc::channel(host_count);
        for (adapter, host_request) in batch {
            let sender = sender.clone();
            tokio::spawn(async move {
                let result = adapter.send(&host_request).await;
                // the receiver never drops before collecting host_count results
                let _ = sender.send(result).await;
            });
        }
        drop(sender);

        request.results.clear();
        for _ in 0..host_count {
            match receiver.recv().await {
                Some(result) => {
                    request.results.insert(result.host.clone(), result);
                }
                None => break,
            }
        }

        Ok(())
    }
}
