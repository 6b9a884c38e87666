//! Catalog editor read: the NMA's view of the database catalog.

use crate::engine::ExecutionContext;
use crate::error::{ErrorCollector, OpsError, Result};
use crate::http::request::{HostRequest, Method};
use crate::ops::{impl_op_base, OpBase, Operation};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use strata_core::database::quorum_count;
use strata_core::CoordinationDatabase;

/// Catalog version counters reported by the catalog editor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogVersions {
    /// Global catalog version.
    #[serde(default)]
    pub global: u64,
    /// Spread configuration version; advances on every topology change.
    #[serde(default)]
    pub spread: u64,
}

/// One node as recorded in the catalog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogNode {
    /// Node name.
    #[serde(default)]
    pub name: String,
    /// Node address.
    #[serde(default)]
    pub address: String,
    /// Catalog directory.
    #[serde(default)]
    pub catalog_path: String,
    /// Whether the node is primary.
    #[serde(default)]
    pub is_primary: bool,
    /// Command line used to start the node process.
    #[serde(default)]
    pub start_command: Vec<String>,
}

/// The catalog editor's snapshot of the database.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSnapshot {
    /// Database name.
    #[serde(default)]
    pub name: String,
    /// Version counters.
    #[serde(default)]
    pub versions: CatalogVersions,
    /// Nodes recorded in the catalog.
    #[serde(default)]
    pub nodes: Vec<CatalogNode>,
    /// Communal storage location (Eon only).
    #[serde(default)]
    pub communal_storage_location: String,
}

impl CatalogSnapshot {
    /// Number of primary nodes in the snapshot.
    pub fn primary_node_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_primary).count()
    }
}

/// Reads the catalog editor on the initiator (or every host of the model)
/// and stores the snapshot with the highest spread version in the context.
#[derive(Debug)]
pub struct NmaReadCatalogEditorOp {
    base: OpBase,
    catalog_paths: HashMap<String, String>,
    // set when reading every host: enough hosts must carry the latest
    // catalog to guarantee it is authoritative
    check_quorum: bool,
}

impl NmaReadCatalogEditorOp {
    /// Read the catalog through the given initiator hosts; an empty
    /// initiator list reads every host of the model and enforces the
    /// quorum check.
    pub fn new(initiator: Vec<String>, vdb: &CoordinationDatabase) -> Result<Self> {
        let check_quorum = initiator.is_empty();
        let mut catalog_paths = HashMap::new();
        let hosts = if initiator.is_empty() {
            vdb.hosts.clone()
        } else {
            initiator
        };
        for host in &hosts {
            let node = vdb
                .nodes
                .get(host)
                .ok_or_else(|| OpsError::MissingCatalogPath { host: host.clone() })?;
            catalog_paths.insert(host.clone(), node.catalog_path.clone());
        }
        Ok(NmaReadCatalogEditorOp {
            base: OpBase::new("read_catalog_editor", hosts),
            catalog_paths,
            check_quorum,
        })
    }
}

#[async_trait]
impl Operation for NmaReadCatalogEditorOp {
    impl_op_base!();

    async fn prepare(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.dispatcher.setup(&self.base.hosts);
        let hosts = self.base.hosts.clone();
        for host in &hosts {
            let catalog_path = self
                .catalog_paths
                .get(host)
                .ok_or_else(|| OpsError::MissingCatalogPath { host: host.clone() })?
                .clone();
            let mut request = HostRequest { method: Method::Get, ..Default::default() };
            request.build_nma_endpoint("catalog/database");
            request.query_params.insert("catalog_path".to_string(), catalog_path);
            self.base.set_request(host, request);
        }
        Ok(())
    }

    async fn process_result(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        let mut errors = ErrorCollector::new();
        let mut latest: Option<CatalogSnapshot> = None;
        let mut hosts_with_latest = 0usize;

        for result in self.base.request.results.values() {
            self.base.log_response(result);
            if !result.is_passing() {
                if let Some(error) = result.error_for_join() {
                    errors.push(error);
                }
                continue;
            }
            let snapshot: CatalogSnapshot =
                self.base.parse_response(&result.host, &result.content)?;
            match &latest {
                Some(current) if snapshot.versions.spread == current.versions.spread => {
                    hosts_with_latest += 1;
                }
                Some(current) if snapshot.versions.spread > current.versions.spread => {
                    latest = Some(snapshot);
                    hosts_with_latest = 1;
                }
                Some(_) => {}
                None => {
                    latest = Some(snapshot);
                    hosts_with_latest = 1;
                }
            }
        }

        match latest {
            Some(snapshot) => {
                let primary_count = snapshot.primary_node_count();
                if self.check_quorum
                    && primary_count > 0
                    && hosts_with_latest < quorum_count(primary_count)
                {
                    return Err(OpsError::NoClusterQuorum {
                        detail: format!(
                            "[{}] only {} hosts carry the latest catalog, \
                             fewer than half of the {} primary nodes",
                            self.base.name, hosts_with_latest, primary_count
                        ),
                    });
                }
                ctx.catalog_snapshot = Some(snapshot);
                Ok(())
            }
            None => {
                errors.push(OpsError::UnexpectedResponse {
                    op: self.base.name.clone(),
                    host: self.base.hosts.join(","),
                    cause: "no host returned catalog information".to_string(),
                });
                errors.into_result()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_count() {
        let snapshot = CatalogSnapshot {
            nodes: vec![
                CatalogNode { is_primary: true, ..Default::default() },
                CatalogNode { is_primary: true, ..Default::default() },
                CatalogNode { is_primary: false, ..Default::default() },
            ],
            ..Default::default()
        };
        assert_eq!(snapshot.primary_node_count(), 2);
    }

    #[test]
    fn parses_catalog_body() {
        let body = r#"{
            "name": "test_db",
            "versions": {"global": 42, "spread": 7},
            "nodes": [
                {"name": "v_test_db_node0001", "address": "10.0.0.1",
                 "catalog_path": "/catalog/test_db/v_test_db_node0001_catalog",
                 "is_primary": true, "start_command": ["vertica", "-D", "/catalog"]}
            ]
        }"#;
        let snapshot: CatalogSnapshot = serde_json::from_str(body).unwrap();
        assert_eq!(snapshot.versions.spread, 7);
        assert_eq!(snapshot.nodes.len(), 1);
        assert!(snapshot.nodes[0].is_primary);
    }
}
