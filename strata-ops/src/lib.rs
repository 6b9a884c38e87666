//! Cluster operation engine for a distributed analytic database.
//!
//! Administrative workflows (create, start, stop, add/remove node, …) are
//! expressed as ordered lists of typed operations. Each operation fans one
//! HTTP request out to a selected subset of hosts in parallel — against
//! either the privileged node management agent or the in-database HTTPS
//! service — and reconciles the per-host responses into shared execution
//! context that later operations consume.
//!
//! The pieces, bottom up: [`http`] performs and classifies individual
//! calls, [`ops`] defines the four-phase operation contract and the
//! concrete verbs, [`engine`] runs an operation list against one execution
//! context, and [`workflows`] validates options and assembles the per-
//! command operation lists.

pub mod engine;
pub mod error;
pub mod http;
pub mod ops;
pub mod workflows;

pub use engine::{ExecutionContext, OperationEngine};
pub use error::{OpsError, Result};
pub use http::{ClusterRequest, Dispatcher, HostRequest, HostResult, Method, TlsCerts};
pub use ops::{choose_initiator, CommandPolicy, HttpsAuth, OpBase, Operation};
