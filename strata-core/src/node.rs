//! Node state and per-node details as reported by the HTTPS `nodes` endpoint.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a database node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeState {
    /// The node is up and participating in the cluster.
    Up,
    /// The node is down.
    Down,
    /// The node is a standby.
    Standby,
    /// The node state could not be determined. A sandboxed node is
    /// reported as UNKNOWN by the main cluster; the sandbox report is
    /// authoritative when its state is UP.
    #[serde(other)]
    Unknown,
}

impl Default for NodeState {
    fn default() -> Self {
        NodeState::Unknown
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Up => "UP",
            NodeState::Down => "DOWN",
            NodeState::Unknown => "UNKNOWN",
            NodeState::Standby => "STANDBY",
        };
        f.write_str(s)
    }
}

/// One node as reported by the in-database HTTPS `nodes` endpoint.
///
/// A DOWN node carries no version. An empty `subcluster_name` means the
/// database runs in enterprise mode; an empty `sandbox` means the node
/// belongs to the main cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDetails {
    /// Stable node identifier, e.g. `v_db_node0001`.
    #[serde(default)]
    pub name: String,
    /// Current address of the node.
    pub address: String,
    /// Name of the database the node belongs to.
    #[serde(default)]
    pub database: String,
    /// Current state.
    pub state: NodeState,
    /// Whether the node is a primary node.
    #[serde(default)]
    pub is_primary: bool,
    /// Whether the node is read-only.
    #[serde(default)]
    pub is_readonly: bool,
    /// Subcluster the node belongs to; empty in enterprise mode.
    #[serde(default)]
    pub subcluster_name: String,
    /// Sandbox the node belongs to; empty for the main cluster.
    #[serde(default)]
    pub sandbox: String,
    /// Catalog directory of the node.
    #[serde(default)]
    pub catalog_path: String,
    /// Server build info string.
    #[serde(default)]
    pub build_info: String,
    /// Timestamp of the last message received from the node.
    #[serde(default)]
    pub last_msg_from_node_at: String,
    /// Server version; absent for DOWN nodes.
    #[serde(default)]
    pub version: String,
}

impl NodeDetails {
    /// Whether the node is currently UP.
    pub fn is_up(&self) -> bool {
        self.state == NodeState::Up
    }
}

/// Response shape of the HTTPS `nodes` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodesResponse {
    /// All nodes known to the responding host.
    #[serde(default)]
    pub node_list: Vec<NodeDetails>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trip() {
        for (state, wire) in [
            (NodeState::Up, "\"UP\""),
            (NodeState::Down, "\"DOWN\""),
            (NodeState::Unknown, "\"UNKNOWN\""),
            (NodeState::Standby, "\"STANDBY\""),
        ] {
            assert_eq!(serde_json::to_string(&state).unwrap(), wire);
            assert_eq!(serde_json::from_str::<NodeState>(wire).unwrap(), state);
        }
    }

    #[test]
    fn unrecognized_state_maps_to_unknown() {
        let state: NodeState = serde_json::from_str("\"RECOVERING\"").unwrap();
        assert_eq!(state, NodeState::Unknown);
    }

    #[test]
    fn parse_nodes_response() {
        let body = r#"{
            "details": [],
            "node_list": [{
                "name": "v_test_db_node0001",
                "address": "192.168.1.101",
                "state": "UP",
                "database": "test_db",
                "is_primary": true,
                "is_readonly": false,
                "catalog_path": "/data/test_db/v_test_db_node0001_catalog/Catalog",
                "subcluster_name": "default_subcluster",
                "last_msg_from_node_at": "2023-01-23T15:18:18.44866",
                "build_info": "v12.0.4-7142c8b01f373cc1aa60b1a8feff6c40bfb7afe8"
            }]
        }"#;
        let response: NodesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.node_list.len(), 1);
        let node = &response.node_list[0];
        assert!(node.is_up());
        assert!(node.version.is_empty());
        assert_eq!(node.subcluster_name, "default_subcluster");
    }
}
