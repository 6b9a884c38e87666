//! Port, retry, and polling defaults shared across the workspace.

/// Default client (SQL) port of the database.
pub const DEFAULT_CLIENT_PORT: u16 = 5433;

/// Offset between the client port and the in-database HTTPS service port.
pub const DEFAULT_HTTP_PORT_OFFSET: u16 = 3010;

/// Default port of the in-database HTTPS service.
pub const DEFAULT_HTTPS_PORT: u16 = DEFAULT_CLIENT_PORT + DEFAULT_HTTP_PORT_OFFSET;

/// Default port of the node management agent.
pub const DEFAULT_NMA_PORT: u16 = 5554;

/// Retry count passed to the catalog sync endpoint.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Seconds between node-state polling attempts.
pub const POLLING_INTERVAL_SECS: u64 = 5;

/// Default node-state polling timeout in seconds.
pub const NODE_STATE_POLLING_TIMEOUT_SECS: u64 = 300;

/// Environment variable overriding the node-state polling timeout (seconds).
pub const NODE_STATE_POLLING_TIMEOUT_ENV: &str = "NODE_STATE_POLLING_TIMEOUT";

/// Sandbox name denoting the main cluster.
pub const MAIN_CLUSTER_SANDBOX: &str = "";

/// Below this node count a database cannot keep design K-safety at 1.
pub const KSAFETY_THRESHOLD: usize = 3;
