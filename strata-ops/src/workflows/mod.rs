//! Workflow builders: one per administrative command.
//!
//! A builder validates its options, derives the topology, emits the ordered
//! operation list, and hands it to the engine. Builders never retry and
//! never roll back; every verb is independently safe or explicitly
//! idempotent.

pub mod add_node;
pub mod add_subcluster;
pub mod config_recover;
pub mod create_db;
pub mod drop_db;
pub mod fetch_node_state;
pub mod install_packages;
pub mod re_ip;
pub mod remove_node;
pub mod remove_subcluster;
pub mod replication;
pub mod sandbox;
pub mod show_restore_points;
pub mod start_db;
pub mod stop_db;
pub mod stop_subcluster;

pub use add_node::{add_node, AddNodeOptions};
pub use add_subcluster::{add_subcluster, AddSubclusterOptions};
pub use config_recover::{config_recover, ConfigRecoverOptions};
pub use create_db::{create_db, CreateDbOptions};
pub use drop_db::{drop_db, DropDbOptions};
pub use fetch_node_state::{fetch_node_state, FetchNodeStateOptions};
pub use install_packages::{install_packages, InstallPackagesOptions};
pub use re_ip::{re_ip, ReIpOptions, ReIpPair};
pub use remove_node::{remove_node, RemoveNodeOptions};
pub use remove_subcluster::{remove_subcluster, RemoveSubclusterOptions};
pub use replication::{replication_start, ReplicationOptions};
pub use sandbox::{sandbox_subcluster, unsandbox_subcluster, SandboxOptions};
pub use show_restore_points::{show_restore_points, ShowRestorePointsOptions};
pub use start_db::{start_db, StartDbOptions};
pub use stop_db::{stop_db, StopDbOptions};
pub use stop_subcluster::{stop_subcluster, StopSubclusterOptions};

use crate::engine::OperationEngine;
use crate::error::{OpsError, Result};
use crate::http::TlsCerts;
use crate::ops::https::HttpsNodeStateOp;
use crate::ops::{CommandPolicy, HttpsAuth, Operation};
use std::collections::HashMap;
use std::path::PathBuf;
use strata_core::util::{clean_path_prefix, validate_absolute_path, validate_db_name};
use strata_core::{ClusterConfig, CoordinationDatabase, CoordinationNode, NodeState};

/// Options shared by every command.
///
/// Hosts are expected to be IP addresses: resolving host names happens
/// before the engine. TLS fields hold PEM contents, loaded from disk by
/// the caller.
#[derive(Debug, Clone, Default)]
pub struct DatabaseOptions {
    /// Database name.
    pub db_name: String,
    /// Host addresses to contact.
    pub hosts: Vec<String>,
    /// Whether addresses are IPv6.
    pub ipv6: bool,
    /// Catalog path prefix.
    pub catalog_prefix: String,
    /// Data path prefix.
    pub data_prefix: String,
    /// Depot path prefix (Eon).
    pub depot_prefix: String,
    /// Whether the database runs in Eon mode (create_db input; otherwise
    /// discovered).
    pub is_eon: bool,
    /// Communal storage location (Eon).
    pub communal_storage_location: String,
    /// Directory holding the persisted cluster config, when one is used.
    pub config_dir: Option<PathBuf>,
    /// Username for the HTTPS service.
    pub username: String,
    /// Password for the HTTPS service; `None` disables basic auth.
    pub password: Option<String>,
    /// Client TLS key (PEM).
    pub key: String,
    /// Client TLS certificate (PEM).
    pub cert: String,
    /// CA certificate (PEM).
    pub ca_cert: String,
    /// Free-form configuration parameters.
    pub parameters: HashMap<String, String>,
}

impl DatabaseOptions {
    /// Validate the common options for a command.
    pub fn validate(&self, command: CommandPolicy) -> Result<()> {
        validate_db_name(&self.db_name)?;
        if self.hosts.is_empty() {
            return Err(OpsError::OptionValidation {
                cause: "must specify a host or host list".to_string(),
            });
        }
        // path options are only mandatory where the workflow touches disk
        if matches!(
            command,
            CommandPolicy::CreateDb | CommandPolicy::DropDb | CommandPolicy::ConfigRecover
        ) {
            validate_absolute_path(&self.catalog_prefix, "catalog path")?;
            if command != CommandPolicy::ConfigRecover {
                validate_absolute_path(&self.data_prefix, "data path")?;
            }
            if self.is_eon {
                validate_absolute_path(&self.depot_prefix, "depot path")?;
            }
        }
        Ok(())
    }

    /// Normalize path prefixes and host casing.
    pub fn analyze(&mut self) {
        for host in &mut self.hosts {
            *host = host.trim().to_lowercase();
        }
        if !self.catalog_prefix.is_empty() {
            self.catalog_prefix = clean_path_prefix(&self.catalog_prefix);
        }
        if !self.data_prefix.is_empty() {
            self.data_prefix = clean_path_prefix(&self.data_prefix);
        }
        if !self.depot_prefix.is_empty() {
            self.depot_prefix = clean_path_prefix(&self.depot_prefix);
        }
    }

    /// Basic-auth material derived from the options.
    pub fn auth(&self) -> Result<HttpsAuth> {
        HttpsAuth::new(self.password.is_some(), &self.username, self.password.clone())
    }

    /// TLS material derived from the options, when any is present.
    pub fn certs(&self) -> Option<TlsCerts> {
        let certs = TlsCerts {
            key: self.key.clone(),
            cert: self.cert.clone(),
            ca_cert: self.ca_cert.clone(),
        };
        if certs.is_empty() {
            None
        } else {
            Some(certs)
        }
    }
}

/// Fetch the coordination model from the running database and fill in the
/// path prefixes the endpoints cannot report yet.
pub(crate) async fn get_vdb_from_running_db(
    options: &DatabaseOptions,
) -> Result<CoordinationDatabase> {
    let node_state = HttpsNodeStateOp::new(options.hosts.clone(), options.auth()?);
    let instructions: Vec<Box<dyn Operation>> = vec![Box::new(node_state)];
    let mut engine = OperationEngine::new(instructions, options.certs());
    engine.run().await?;

    let details: Vec<_> = engine
        .context
        .node_details
        .iter()
        .filter(|node| node.database == options.db_name)
        .cloned()
        .collect();
    if details.is_empty() {
        return Err(OpsError::DatabaseNotFound { name: options.db_name.clone() });
    }

    let mut vdb = CoordinationDatabase::from_node_details(&options.db_name, &details);
    vdb.catalog_prefix = options.catalog_prefix.clone();
    vdb.data_prefix = options.data_prefix.clone();
    vdb.communal_storage_location = options.communal_storage_location.clone();
    if !options.depot_prefix.is_empty() {
        vdb.depot_prefix = options.depot_prefix.clone();
        vdb.use_depot = true;
        // depot paths are not reported by the endpoint yet
        let names: Vec<(String, String)> = vdb
            .nodes
            .iter()
            .map(|(host, node)| (host.clone(), node.name.clone()))
            .collect();
        for (host, name) in names {
            let depot_path = vdb.gen_depot_path(&name);
            if let Some(node) = vdb.nodes.get_mut(&host) {
                node.depot_path = depot_path;
            }
        }
    }
    Ok(vdb)
}

/// Build a coordination model from the persisted cluster config, deriving
/// paths from the option prefixes. Used when the database is down.
pub(crate) fn vdb_from_config(
    config: &ClusterConfig,
    options: &DatabaseOptions,
) -> CoordinationDatabase {
    let mut vdb = CoordinationDatabase {
        name: config.db_name.clone(),
        is_eon: config.is_eon,
        use_depot: !options.depot_prefix.is_empty(),
        catalog_prefix: options.catalog_prefix.clone(),
        data_prefix: options.data_prefix.clone(),
        depot_prefix: options.depot_prefix.clone(),
        communal_storage_location: options.communal_storage_location.clone(),
        ..Default::default()
    };
    for node_config in &config.nodes {
        let node = CoordinationNode {
            name: node_config.name.clone(),
            address: node_config.address.clone(),
            state: NodeState::Unknown,
            is_primary: false,
            subcluster: String::new(),
            sandbox: String::new(),
            catalog_path: vdb.gen_catalog_path(&node_config.name),
            storage_locations: vec![vdb.gen_data_path(&node_config.name)],
            depot_path: if vdb.use_depot {
                vdb.gen_depot_path(&node_config.name)
            } else {
                String::new()
            },
        };
        vdb.hosts.push(node_config.address.clone());
        vdb.nodes.insert(node_config.address.clone(), node);
    }
    vdb.hosts.sort();
    vdb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_requires_db_name_and_hosts() {
        let mut options = DatabaseOptions::default();
        assert!(options.validate(CommandPolicy::AddNode).is_err());

        options.db_name = "test_db".into();
        assert!(options.validate(CommandPolicy::AddNode).is_err());

        options.hosts = vec!["10.0.0.1".into()];
        options.validate(CommandPolicy::AddNode).unwrap();
    }

    #[test]
    fn create_db_requires_absolute_paths() {
        let mut options = DatabaseOptions {
            db_name: "test_db".into(),
            hosts: vec!["10.0.0.1".into()],
            catalog_prefix: "catalog".into(),
            data_prefix: "/data".into(),
            ..Default::default()
        };
        assert!(options.validate(CommandPolicy::CreateDb).is_err());
        options.catalog_prefix = "/catalog".into();
        options.validate(CommandPolicy::CreateDb).unwrap();
    }

    #[test]
    fn analyze_normalizes_hosts_and_paths() {
        let mut options = DatabaseOptions {
            db_name: "test_db".into(),
            hosts: vec![" 10.0.0.1 ".into(), "HOST2".into()],
            catalog_prefix: "/catalog//db/".into(),
            ..Default::default()
        };
        options.analyze();
        assert_eq!(options.hosts, vec!["10.0.0.1", "host2"]);
        assert_eq!(options.catalog_prefix, "/catalog/db");
    }

    #[test]
    fn vdb_from_config_derives_paths() {
        let config = ClusterConfig {
            db_name: "test_db".into(),
            hosts: vec!["10.0.0.1".into()],
            nodes: vec![strata_core::NodeConfig {
                name: "v_test_db_node0001".into(),
                address: "10.0.0.1".into(),
            }],
            is_eon: true,
        };
        let options = DatabaseOptions {
            catalog_prefix: "/catalog".into(),
            data_prefix: "/data".into(),
            depot_prefix: "/depot".into(),
            ..Default::default()
        };
        let vdb = vdb_from_config(&config, &options);
        let node = &vdb.nodes["10.0.0.1"];
        assert_eq!(node.catalog_path, "/catalog/test_db/v_test_db_node0001_catalog");
        assert_eq!(node.depot_path, "/depot/test_db/v_test_db_node0001_depot");
        assert!(vdb.use_depot);
    }
}
