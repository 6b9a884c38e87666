//! Per-workflow facade over the adapter pool.

use crate::error::Result;
use crate::http::pool::AdapterPool;
use crate::http::request::ClusterRequest;
use tracing::debug;

/// Owns which hosts participate in a workflow and delegates batch dispatch
/// to the process-wide pool.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher;

impl Dispatcher {
    /// Ensure an adapter exists for each participating host.
    pub fn setup(&self, hosts: &[String]) {
        let pool = AdapterPool::instance();
        for host in hosts {
            pool.ensure_host(host);
        }
    }

    /// Send every host request of the cluster request and collect results.
    pub async fn send_request(&self, request: &mut ClusterRequest) -> Result<()> {
        debug!(operation = %request.name, "dispatcher sending request");
        AdapterPool::instance().send_request(request).await
    }
}
