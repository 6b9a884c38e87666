//! The persisted cluster config file (`vertica_cluster.yaml`).
//!
//! The engine only consumes the parsed structure; the file itself is read
//! and written here on behalf of the CLI. Rewrites copy an existing file to
//! a `.backup` sibling first.

use crate::database::CoordinationDatabase;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the persisted cluster config.
pub const CONFIG_FILE_NAME: &str = "vertica_cluster.yaml";

/// File name of the backup written before a rewrite.
pub const CONFIG_BACKUP_NAME: &str = "vertica_cluster.yaml.backup";

#[cfg(unix)]
const CONFIG_DIR_MODE: u32 = 0o755;
#[cfg(unix)]
const CONFIG_FILE_MODE: u32 = 0o600;

/// One node entry in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node name.
    pub name: String,
    /// Node address.
    pub address: String,
}

/// The cluster config file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Database name.
    pub db_name: String,
    /// Host addresses.
    pub hosts: Vec<String>,
    /// Per-node name and address.
    pub nodes: Vec<NodeConfig>,
    /// Whether the database runs in Eon mode.
    #[serde(rename = "eon_mode")]
    pub is_eon: bool,
}

impl ClusterConfig {
    /// Build a config from a coordination model.
    pub fn from_database(vdb: &CoordinationDatabase) -> Self {
        let mut nodes: Vec<NodeConfig> = vdb
            .nodes
            .values()
            .map(|node| NodeConfig {
                name: node.name.clone(),
                address: node.address.clone(),
            })
            .collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        ClusterConfig {
            db_name: vdb.name.clone(),
            hosts: vdb.hosts.clone(),
            nodes,
            is_eon: vdb.is_eon,
        }
    }

    /// Read a config file.
    pub fn read(path: &Path) -> Result<Self, CoreError> {
        let content = fs::read_to_string(path).map_err(|source| CoreError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigFormat {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })
    }

    /// Write the config file, backing up any existing file first and
    /// restricting the file mode to owner read/write.
    pub fn write(&self, path: &Path) -> Result<(), CoreError> {
        let io_err = |source| CoreError::ConfigIo { path: path.to_path_buf(), source };

        backup_config_file(path).map_err(io_err)?;

        let content = serde_yaml::to_string(self).map_err(|e| CoreError::ConfigFormat {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;
        fs::write(path, content).map_err(io_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(CONFIG_FILE_MODE))
                .map_err(io_err)?;
        }
        Ok(())
    }
}

/// Resolve the config file path: under an explicit directory when given,
/// otherwise under `<cwd>/<db_name>/`. The parent directory is created with
/// mode 0755.
pub fn config_file_path(db_name: &str, config_dir: Option<&Path>) -> Result<PathBuf, CoreError> {
    let dir = match config_dir {
        Some(dir) => dir.to_path_buf(),
        None => {
            let cwd = std::env::current_dir().map_err(|source| CoreError::ConfigIo {
                path: PathBuf::from("."),
                source,
            })?;
            cwd.join(db_name)
        }
    };
    fs::create_dir_all(&dir).map_err(|source| CoreError::ConfigIo {
        path: dir.clone(),
        source,
    })?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&dir, fs::Permissions::from_mode(CONFIG_DIR_MODE)).map_err(
            |source| CoreError::ConfigIo { path: dir.clone(), source },
        )?;
    }
    Ok(dir.join(CONFIG_FILE_NAME))
}

fn backup_config_file(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let backup = path.with_file_name(CONFIG_BACKUP_NAME);
    info!(config = %path.display(), backup = %backup.display(), "backing up existing config file");
    fs::copy(path, &backup)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&backup, fs::Permissions::from_mode(CONFIG_FILE_MODE))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_config() -> ClusterConfig {
        ClusterConfig {
            db_name: "practice_db".into(),
            hosts: vec!["ip_1".into(), "ip_2".into(), "ip_3".into()],
            nodes: vec![
                NodeConfig { name: "node_name_1".into(), address: "ip_1".into() },
                NodeConfig { name: "node_name_2".into(), address: "ip_2".into() },
                NodeConfig { name: "node_name_3".into(), address: "ip_3".into() },
            ],
            is_eon: false,
        }
    }

    #[test]
    fn write_and_read_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = sample_config();
        config.write(&path).unwrap();

        let loaded = ClusterConfig::read(&path).unwrap();
        assert_eq!(loaded, config);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("db_name: practice_db"));
        assert!(raw.contains("eon_mode: false"));
    }

    #[test]
    fn rewrite_creates_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = sample_config();
        config.write(&path).unwrap();
        assert!(!dir.path().join(CONFIG_BACKUP_NAME).exists());

        config.write(&path).unwrap();
        assert!(dir.path().join(CONFIG_BACKUP_NAME).exists());
    }

    #[cfg(unix)]
    #[test]
    fn config_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        sample_config().write(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn path_resolution_creates_directory() {
        let dir = tempdir().unwrap();
        let explicit = config_file_path("practice_db", Some(dir.path())).unwrap();
        assert_eq!(explicit, dir.path().join(CONFIG_FILE_NAME));
        assert!(dir.path().exists());
    }
}
