//! HTTP plumbing: per-host requests and results, the adapter that performs
//! one call, the process-wide adapter pool, and the per-workflow dispatcher.

pub mod adapter;
pub mod dispatcher;
pub mod pool;
pub mod request;
pub mod response;

pub use adapter::HttpAdapter;
pub use dispatcher::Dispatcher;
pub use pool::AdapterPool;
pub use request::{ClusterRequest, HostRequest, Method, TlsCerts};
pub use response::{HostResult, ResultStatus};
