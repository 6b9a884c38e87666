//! Operations against the node management agent.

pub mod bootstrap_catalog;
pub mod delete_directories;
pub mod download_config;
pub mod health;
pub mod network_profile;
pub mod nodes_info;
pub mod prepare_directories;
pub mod read_catalog_editor;
pub mod start_node;
pub mod version;

pub use bootstrap_catalog::NmaBootstrapCatalogOp;
pub use delete_directories::NmaDeleteDirectoriesOp;
pub use download_config::{NmaDownloadConfigOp, NmaUploadConfigOp};
pub use health::NmaHealthOp;
pub use network_profile::NmaNetworkProfileOp;
pub use nodes_info::{NmaNodeInfo, NmaNodesInfoOp};
pub use prepare_directories::NmaPrepareDirectoriesOp;
pub use read_catalog_editor::{CatalogNode, CatalogSnapshot, NmaReadCatalogEditorOp};
pub use start_node::NmaStartNodeOp;
pub use version::NmaVersionOp;
