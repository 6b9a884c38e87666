//! Shared argument plumbing: flags common to every subcommand and their
//! conversion into engine options.

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;
use strata_core::config::{config_file_path, ClusterConfig};
use strata_core::util::split_host_list;
use strata_core::CoordinationDatabase;
use strata_ops::workflows::DatabaseOptions;
use tracing::info;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct DbArgs {
    /// Name of the database
    #[arg(long = "db-name")]
    pub db_name: String,

    /// Comma-separated list of hosts (read from the config file when omitted)
    #[arg(long)]
    pub hosts: Option<String>,

    /// Directory where the cluster config file is located
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Database password
    #[arg(long)]
    pub password: Option<String>,

    /// File holding the database password
    #[arg(long = "password-file")]
    pub password_file: Option<PathBuf>,

    /// Username for the HTTPS service
    #[arg(long, default_value = "dbadmin")]
    pub username: String,

    /// Client TLS key file (PEM)
    #[arg(long = "key-file")]
    pub key_file: Option<PathBuf>,

    /// Client TLS certificate file (PEM)
    #[arg(long = "cert-file")]
    pub cert_file: Option<PathBuf>,

    /// CA certificate file (PEM)
    #[arg(long = "ca-cert-file")]
    pub ca_cert_file: Option<PathBuf>,

    /// Hosts are IPv6 addresses
    #[arg(long)]
    pub ipv6: bool,

    /// The database runs in Eon mode
    #[arg(long = "eon-mode")]
    pub eon_mode: bool,

    /// Path of the catalog directory
    #[arg(long = "catalog-path", default_value = "")]
    pub catalog_path: String,

    /// Path of the data directory
    #[arg(long = "data-path", default_value = "")]
    pub data_path: String,

    /// Path of the depot directory
    #[arg(long = "depot-path", default_value = "")]
    pub depot_path: String,

    /// Communal storage location
    #[arg(long = "communal-storage-location", default_value = "")]
    pub communal_storage_location: String,
}

/// Flags describing a replication target.
#[derive(Debug, Clone, Args)]
pub struct ReplicationArgs {
    /// Name of the target database
    #[arg(long = "target-db-name")]
    pub target_db_name: String,

    /// Comma-separated list of target hosts
    #[arg(long = "target-hosts")]
    pub target_hosts: String,

    /// Username on the target database
    #[arg(long = "target-username", default_value = "dbadmin")]
    pub target_username: String,

    /// File holding the target database password
    #[arg(long = "target-password-file")]
    pub target_password_file: Option<PathBuf>,
}

impl DbArgs {
    /// Read the persisted cluster config, when a config directory is in
    /// use and the file exists.
    pub fn load_config(&self) -> Result<Option<ClusterConfig>> {
        let path = config_file_path(&self.db_name, self.config.as_deref())?;
        if !path.exists() {
            return Ok(None);
        }
        let config = ClusterConfig::read(&path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Ok(Some(config))
    }

    /// Persist the cluster config derived from a coordination model.
    pub fn write_config(&self, vdb: &CoordinationDatabase) -> Result<()> {
        let path = config_file_path(&self.db_name, self.config.as_deref())?;
        ClusterConfig::from_database(vdb)
            .write(&path)
            .with_context(|| format!("cannot write config file {}", path.display()))?;
        info!(path = %path.display(), "cluster config written");
        Ok(())
    }

    /// Build engine options from the flags (and the config file, for the
    /// host list, when the flag is omitted).
    pub fn to_options(&self) -> Result<DatabaseOptions> {
        let hosts = match &self.hosts {
            Some(hosts) => split_host_list(hosts)?,
            None => match self.load_config()? {
                Some(config) => config.hosts,
                None => Vec::new(),
            },
        };

        let password = match (&self.password, &self.password_file) {
            (Some(password), _) => Some(password.clone()),
            (None, Some(file)) => Some(
                fs::read_to_string(file)
                    .with_context(|| format!("cannot read password file {}", file.display()))?
                    .trim_end()
                    .to_string(),
            ),
            (None, None) => None,
        };

        let read_pem = |file: &Option<PathBuf>, what: &str| -> Result<String> {
            match file {
                Some(file) => fs::read_to_string(file)
                    .with_context(|| format!("cannot read {what} file {}", file.display())),
                None => Ok(String::new()),
            }
        };

        Ok(DatabaseOptions {
            db_name: self.db_name.clone(),
            hosts,
            ipv6: self.ipv6,
            catalog_prefix: self.catalog_path.clone(),
            data_prefix: self.data_path.clone(),
            depot_prefix: self.depot_path.clone(),
            is_eon: self.eon_mode,
            communal_storage_location: self.communal_storage_location.clone(),
            config_dir: self.config.clone(),
            username: self.username.clone(),
            password,
            key: read_pem(&self.key_file, "key")?,
            cert: read_pem(&self.cert_file, "certificate")?,
            ca_cert: read_pem(&self.ca_cert_file, "CA certificate")?,
            parameters: Default::default(),
        })
    }
}
