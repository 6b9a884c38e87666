//! Core value types for the strata cluster administration library.
//!
//! This crate holds the leaf types shared by the operation engine and the
//! CLI: the node and database model, network profiles, semantic versions,
//! RFC 7807 problem bodies, the persisted cluster config, and the option
//! validation helpers. It performs no network I/O.

pub mod config;
pub mod database;
pub mod defaults;
pub mod error;
pub mod network;
pub mod node;
pub mod problem;
pub mod util;
pub mod version;

pub use config::{ClusterConfig, NodeConfig};
pub use database::{CoordinationDatabase, CoordinationNode};
pub use error::{CoreError, Result};
pub use network::NetworkProfile;
pub use node::{NodeDetails, NodeState, NodesResponse};
pub use problem::Problem;
pub use version::SemVer;
