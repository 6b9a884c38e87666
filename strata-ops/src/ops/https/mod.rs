//! Operations against the in-database HTTPS service.

pub mod check_nodes_exist;
pub mod create_depot;
pub mod create_node;
pub mod drop_node;
pub mod drop_subcluster;
pub mod find_subcluster;
pub mod get_up_nodes;
pub mod install_packages;
pub mod mark_ephemeral;
pub mod mark_ksafe;
pub mod node_state;
pub mod poll_node_state;
pub mod re_ip;
pub mod rebalance;
pub mod replication;
pub mod restore_points;
pub mod sandbox;
pub mod spread;
pub mod stop_db;
pub mod subcluster;
pub mod sync_catalog;

pub use check_nodes_exist::{HttpsCheckNodesExistOp, NodesExistCaller};
pub use create_depot::HttpsCreateDepotOp;
pub use create_node::HttpsCreateNodeOp;
pub use drop_node::HttpsDropNodeOp;
pub use drop_subcluster::HttpsDropSubclusterOp;
pub use find_subcluster::HttpsFindSubclusterOp;
pub use get_up_nodes::HttpsGetUpNodesOp;
pub use install_packages::HttpsInstallPackagesOp;
pub use mark_ephemeral::HttpsMarkEphemeralOp;
pub use mark_ksafe::HttpsMarkDesignKsafeOp;
pub use node_state::HttpsNodeStateOp;
pub use poll_node_state::HttpsPollNodeStateOp;
pub use re_ip::HttpsReIpOp;
pub use rebalance::{HttpsRebalanceClusterOp, HttpsRebalanceShardsOp};
pub use replication::HttpsStartReplicationOp;
pub use restore_points::{HttpsShowRestorePointsOp, RestorePoint};
pub use sandbox::{HttpsSandboxOp, HttpsUnsandboxOp};
pub use spread::{HttpsReloadSpreadOp, HttpsSpreadRemoveNodeOp};
pub use stop_db::HttpsStopDbOp;
pub use subcluster::HttpsAddSubclusterOp;
pub use sync_catalog::HttpsSyncCatalogOp;
