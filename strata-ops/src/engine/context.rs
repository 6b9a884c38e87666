//! Mutable shared state threaded through one workflow.

use crate::http::Dispatcher;
use crate::ops::https::restore_points::RestorePoint;
use crate::ops::nma::nodes_info::NmaNodeInfo;
use crate::ops::nma::read_catalog_editor::CatalogSnapshot;
use std::collections::HashMap;
use strata_core::{NetworkProfile, NodeDetails};

/// Execution context of one workflow run.
///
/// Constructed by the engine, mutated by operations as they discover
/// cluster state, and discarded when the workflow ends. Fields are written
/// once logically: the operation that discovers a field writes it, later
/// operations read it. The engine runs operations one at a time, so no
/// locking is needed.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    /// Per-workflow dispatcher over the process-wide adapter pool.
    pub dispatcher: Dispatcher,

    /// Network profiles keyed by host; written by the network-profile
    /// operation, read by node creation and re-IP.
    pub network_profiles: HashMap<String, NetworkProfile>,

    /// Addresses of UP nodes matching the target database, sorted.
    pub up_hosts: Vec<String>,

    /// Addresses of UP primary nodes, sorted. Populated together with
    /// `up_hosts` so initiator selection sees a consistent pair.
    pub primary_up_nodes: Vec<String>,

    /// UP host address to its subcluster.
    pub up_sc_info: HashMap<String, String>,

    /// UP host address to its sandbox (empty string = main cluster).
    pub sandbox_info: HashMap<String, String>,

    /// UP nodes of the target subcluster.
    pub nodes_info: Vec<NodeDetails>,

    /// All (UP and DOWN) nodes of the target subcluster.
    pub sc_nodes_info: Vec<NodeDetails>,

    /// Node details fetched for the caller (fetch_nodes_details).
    pub node_details: Vec<NodeDetails>,

    /// Name of the default subcluster, discovered by find-subcluster.
    pub default_sc_name: String,

    /// Catalog snapshot read from the catalog editor.
    pub catalog_snapshot: Option<CatalogSnapshot>,

    /// Config file contents captured by download operations, keyed by
    /// endpoint (e.g. `config/vertica`).
    pub config_content: HashMap<String, String>,

    /// Restore points listed for the caller.
    pub restore_points: Vec<RestorePoint>,

    /// Per-host local node identity discovered through the NMA when the
    /// database is down.
    pub nma_node_info: HashMap<String, NmaNodeInfo>,
}

impl ExecutionContext {
    /// A fresh context for one workflow run.
    pub fn new() -> Self {
        Self::default()
    }
}
