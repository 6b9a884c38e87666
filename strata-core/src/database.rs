//! The coordination model of a database: hosts, nodes, and path layout.

use crate::defaults::MAIN_CLUSTER_SANDBOX;
use crate::node::{NodeDetails, NodeState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One node in the coordination model.
///
/// Nodes reference their subcluster by name only; the reverse direction
/// (subcluster to nodes) is answered by scanning [`CoordinationDatabase::nodes`].
/// This keeps the model serializable and copyable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinationNode {
    /// Stable node identifier, e.g. `v_db_node0001`.
    pub name: String,
    /// Current address.
    pub address: String,
    /// Current state.
    pub state: NodeState,
    /// Whether the node is a primary node.
    pub is_primary: bool,
    /// Subcluster name; empty in enterprise mode.
    pub subcluster: String,
    /// Sandbox name; empty for the main cluster.
    pub sandbox: String,
    /// Catalog directory.
    pub catalog_path: String,
    /// Data storage locations.
    pub storage_locations: Vec<String>,
    /// Depot directory; empty when the depot is unused.
    pub depot_path: String,
}

/// The workflow's working model of the database.
///
/// Built from the running database (or the persisted config when the
/// database is down), mutated by the workflow as it adds or removes hosts,
/// and discarded when the workflow ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinationDatabase {
    /// Database name.
    pub name: String,
    /// Whether the database runs in Eon mode.
    pub is_eon: bool,
    /// Whether the database uses a depot.
    pub use_depot: bool,
    /// All host addresses, sorted.
    pub hosts: Vec<String>,
    /// Host address to node.
    pub nodes: HashMap<String, CoordinationNode>,
    /// Addresses of UP primary nodes, sorted. Kept consistent with the
    /// up-host discovery that populates it.
    pub primary_up_nodes: Vec<String>,
    /// Catalog path prefix.
    pub catalog_prefix: String,
    /// Data path prefix.
    pub data_prefix: String,
    /// Depot path prefix; empty when unused.
    pub depot_prefix: String,
    /// Communal storage location (Eon only).
    pub communal_storage_location: String,
}

impl CoordinationDatabase {
    /// An empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the model from one host's `nodes` response.
    ///
    /// Eon mode is inferred from subcluster membership: in Eon mode every
    /// node carries a non-empty subcluster name.
    pub fn from_node_details(db_name: &str, details: &[NodeDetails]) -> Self {
        let mut vdb = CoordinationDatabase {
            name: db_name.to_string(),
            ..Default::default()
        };
        for node in details {
            vdb.is_eon = vdb.is_eon || !node.subcluster_name.is_empty();
            if node.state == NodeState::Up && node.is_primary {
                vdb.primary_up_nodes.push(node.address.clone());
            }
            vdb.hosts.push(node.address.clone());
            vdb.nodes.insert(
                node.address.clone(),
                CoordinationNode {
                    name: node.name.clone(),
                    address: node.address.clone(),
                    state: node.state,
                    is_primary: node.is_primary,
                    subcluster: node.subcluster_name.clone(),
                    sandbox: node.sandbox.clone(),
                    catalog_path: node.catalog_path.clone(),
                    storage_locations: Vec::new(),
                    depot_path: String::new(),
                },
            );
        }
        vdb.hosts.sort();
        vdb.primary_up_nodes.sort();
        vdb
    }

    /// Whether a host is part of the database.
    pub fn contains_host(&self, host: &str) -> bool {
        self.nodes.contains_key(host)
    }

    /// Hosts of the given subcluster.
    pub fn hosts_in_subcluster(&self, sc_name: &str) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .nodes
            .values()
            .filter(|node| node.subcluster == sc_name)
            .map(|node| node.address.clone())
            .collect();
        hosts.sort();
        hosts
    }

    /// Hosts of the main cluster (not sandboxed).
    pub fn main_cluster_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .nodes
            .values()
            .filter(|node| node.sandbox == MAIN_CLUSTER_SANDBOX)
            .map(|node| node.address.clone())
            .collect();
        hosts.sort();
        hosts
    }

    /// Generated data directory for a node name.
    pub fn gen_data_path(&self, node_name: &str) -> String {
        format!("{}/{}/{}_data", self.data_prefix, self.name, node_name)
    }

    /// Generated depot directory for a node name.
    pub fn gen_depot_path(&self, node_name: &str) -> String {
        format!("{}/{}/{}_depot", self.depot_prefix, self.name, node_name)
    }

    /// Generated catalog directory for a node name.
    pub fn gen_catalog_path(&self, node_name: &str) -> String {
        format!("{}/{}/{}_catalog", self.catalog_prefix, self.name, node_name)
    }

    /// Add new hosts to the model, generating node names that continue the
    /// existing `v_<db>_node<NNNN>` numbering and deriving catalog, data,
    /// and depot paths from the prefixes.
    pub fn add_hosts(&mut self, new_hosts: &[String], subcluster: &str) {
        let mut ordinal = self
            .nodes
            .values()
            .filter_map(|node| node_ordinal(&node.name))
            .max()
            .unwrap_or(0);
        for host in new_hosts {
            ordinal += 1;
            let name = format!("v_{}_node{:04}", self.name.to_lowercase(), ordinal);
            let node = CoordinationNode {
                address: host.clone(),
                state: NodeState::Down,
                is_primary: false,
                subcluster: subcluster.to_string(),
                sandbox: String::new(),
                catalog_path: self.gen_catalog_path(&name),
                storage_locations: vec![self.gen_data_path(&name)],
                depot_path: if self.depot_prefix.is_empty() {
                    String::new()
                } else {
                    self.gen_depot_path(&name)
                },
                name,
            };
            self.hosts.push(host.clone());
            self.nodes.insert(host.clone(), node);
        }
        self.hosts.sort();
    }

    /// A copy of the model restricted to the given hosts.
    pub fn subset(&self, hosts: &[String]) -> CoordinationDatabase {
        let mut sub = CoordinationDatabase {
            name: self.name.clone(),
            is_eon: self.is_eon,
            use_depot: self.use_depot,
            catalog_prefix: self.catalog_prefix.clone(),
            data_prefix: self.data_prefix.clone(),
            depot_prefix: self.depot_prefix.clone(),
            communal_storage_location: self.communal_storage_location.clone(),
            ..Default::default()
        };
        for host in hosts {
            if let Some(node) = self.nodes.get(host) {
                sub.hosts.push(host.clone());
                sub.nodes.insert(host.clone(), node.clone());
            }
        }
        sub.hosts.sort();
        sub
    }
}

/// Number of primary nodes required for catalog availability:
/// `ceil((primary + 1) / 2)`.
pub fn quorum_count(primary_node_count: usize) -> usize {
    (primary_node_count + 1) / 2
}

fn node_ordinal(name: &str) -> Option<u32> {
    let index = name.rfind("node")?;
    name[index + 4..].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vdb() -> CoordinationDatabase {
        let details = vec![
            NodeDetails {
                name: "v_test_db_node0001".into(),
                address: "10.0.0.1".into(),
                database: "test_db".into(),
                state: NodeState::Up,
                is_primary: true,
                subcluster_name: "default_subcluster".into(),
                ..sample_node()
            },
            NodeDetails {
                name: "v_test_db_node0002".into(),
                address: "10.0.0.2".into(),
                database: "test_db".into(),
                state: NodeState::Up,
                is_primary: true,
                subcluster_name: "default_subcluster".into(),
                ..sample_node()
            },
            NodeDetails {
                name: "v_test_db_node0003".into(),
                address: "10.0.0.3".into(),
                database: "test_db".into(),
                state: NodeState::Down,
                is_primary: false,
                subcluster_name: "sc1".into(),
                ..sample_node()
            },
        ];
        CoordinationDatabase::from_node_details("test_db", &details)
    }

    fn sample_node() -> NodeDetails {
        NodeDetails {
            name: String::new(),
            address: String::new(),
            database: String::new(),
            state: NodeState::Unknown,
            is_primary: false,
            is_readonly: false,
            subcluster_name: String::new(),
            sandbox: String::new(),
            catalog_path: String::new(),
            build_info: String::new(),
            last_msg_from_node_at: String::new(),
            version: String::new(),
        }
    }

    #[test]
    fn builds_from_node_details() {
        let vdb = sample_vdb();
        assert!(vdb.is_eon);
        assert_eq!(vdb.hosts, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        assert_eq!(vdb.primary_up_nodes, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(vdb.hosts_in_subcluster("sc1"), vec!["10.0.0.3"]);
    }

    #[test]
    fn add_hosts_continues_numbering() {
        let mut vdb = sample_vdb();
        vdb.catalog_prefix = "/catalog".into();
        vdb.data_prefix = "/data".into();
        vdb.add_hosts(&["10.0.0.4".to_string()], "default_subcluster");
        let node = &vdb.nodes["10.0.0.4"];
        assert_eq!(node.name, "v_test_db_node0004");
        assert_eq!(node.catalog_path, "/catalog/test_db/v_test_db_node0004_catalog");
        assert_eq!(node.storage_locations, vec!["/data/test_db/v_test_db_node0004_data"]);
        assert!(vdb.contains_host("10.0.0.4"));
        assert_eq!(vdb.hosts.len(), 4);
    }

    #[test]
    fn subset_keeps_only_requested_hosts() {
        let vdb = sample_vdb();
        let sub = vdb.subset(&["10.0.0.3".to_string(), "10.0.0.9".to_string()]);
        assert_eq!(sub.hosts, vec!["10.0.0.3"]);
        assert_eq!(sub.nodes.len(), 1);
        assert_eq!(sub.name, "test_db");
    }

    #[test]
    fn quorum_is_strict_majority() {
        assert_eq!(quorum_count(1), 1);
        assert_eq!(quorum_count(2), 1);
        assert_eq!(quorum_count(3), 2);
        assert_eq!(quorum_count(4), 2);
        assert_eq!(quorum_count(5), 3);
    }
}
