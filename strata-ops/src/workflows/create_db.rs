//! Creating a database from scratch.

use crate::engine::OperationEngine;
use crate::error::{OpsError, Result};
use crate::ops::https::{
    HttpsCreateDepotOp, HttpsCreateNodeOp, HttpsInstallPackagesOp, HttpsMarkDesignKsafeOp,
    HttpsPollNodeStateOp, HttpsReloadSpreadOp, HttpsSyncCatalogOp,
};
use crate::ops::nma::{
    NmaBootstrapCatalogOp, NmaHealthOp, NmaNetworkProfileOp, NmaPrepareDirectoriesOp,
    NmaStartNodeOp, NmaVersionOp,
};
use crate::ops::{CommandPolicy, Operation};
use crate::workflows::add_node::produce_transfer_config_ops;
use crate::workflows::DatabaseOptions;
use strata_core::defaults::KSAFETY_THRESHOLD;
use strata_core::util::{validate_depot_size, slice_diff};
use strata_core::CoordinationDatabase;
use tracing::info;

/// Options for create_db.
#[derive(Debug, Clone, Default)]
pub struct CreateDbOptions {
    /// Common database options. `is_eon` and the communal storage location
    /// select Eon mode.
    pub db: DatabaseOptions,
    /// Depot size for the new nodes; empty uses the server default.
    pub depot_size: String,
    /// Wipe pre-existing directories before preparing them.
    pub force_cleanup: bool,
    /// Skip installing the default packages.
    pub skip_package_install: bool,
}

/// Create a database on the given hosts: bootstrap the catalog on the
/// first host, bring it up, create the remaining nodes through it, and
/// finish with packages and (Eon) a catalog sync.
pub async fn create_db(options: &mut CreateDbOptions) -> Result<CoordinationDatabase> {
    options.db.analyze();
    options.db.is_eon = options.db.is_eon || !options.db.communal_storage_location.is_empty();
    options.db.validate(CommandPolicy::CreateDb)?;
    if !options.depot_size.is_empty() {
        validate_depot_size(&options.depot_size)?;
    }

    let mut vdb = CoordinationDatabase {
        name: options.db.db_name.clone(),
        is_eon: options.db.is_eon,
        use_depot: !options.db.depot_prefix.is_empty(),
        catalog_prefix: options.db.catalog_prefix.clone(),
        data_prefix: options.db.data_prefix.clone(),
        depot_prefix: options.db.depot_prefix.clone(),
        communal_storage_location: options.db.communal_storage_location.clone(),
        ..Default::default()
    };
    vdb.add_hosts(&options.db.hosts, "");

    let instructions = produce_create_db_instructions(&vdb, options)?;
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;

    info!(db = %vdb.name, hosts = vdb.hosts.len(), "database created");
    Ok(vdb)
}

fn produce_create_db_instructions(
    vdb: &CoordinationDatabase,
    options: &CreateDbOptions,
) -> Result<Vec<Box<dyn Operation>>> {
    let auth = options.db.auth()?;
    let all_hosts = vdb.hosts.clone();
    let bootstrap_host = vec![all_hosts
        .first()
        .cloned()
        .ok_or_else(|| OpsError::OptionValidation { cause: "no hosts given".to_string() })?];
    let remaining_hosts = slice_diff(&all_hosts, &bootstrap_host);

    let mut instructions: Vec<Box<dyn Operation>> = vec![
        Box::new(NmaHealthOp::new(all_hosts.clone())),
        Box::new(NmaVersionOp::new(all_hosts.clone(), true)),
        Box::new(NmaPrepareDirectoriesOp::new(vdb, options.force_cleanup)?),
        Box::new(NmaNetworkProfileOp::new(all_hosts.clone())),
        Box::new(NmaBootstrapCatalogOp::new(
            vdb,
            options.db.password.as_deref().unwrap_or_default(),
            options.db.parameters.clone(),
        )?),
        Box::new(NmaStartNodeOp::new(bootstrap_host.clone(), vdb)?),
        Box::new(HttpsPollNodeStateOp::new(bootstrap_host.clone(), auth.clone())),
    ];

    if !remaining_hosts.is_empty() {
        instructions.push(Box::new(HttpsCreateNodeOp::new(
            bootstrap_host.clone(),
            remaining_hosts.clone(),
            auth.clone(),
            &format!("{}/{}", vdb.catalog_prefix, vdb.name),
            &format!("{}/{}", vdb.data_prefix, vdb.name),
            "",
        )));
        instructions.push(Box::new(HttpsReloadSpreadOp::new(
            bootstrap_host.clone(),
            auth.clone(),
        )));
        produce_transfer_config_ops(&mut instructions, &bootstrap_host, &remaining_hosts, vdb)?;
        instructions.push(Box::new(NmaStartNodeOp::new(remaining_hosts.clone(), vdb)?));
        instructions.push(Box::new(HttpsPollNodeStateOp::new(all_hosts.clone(), auth.clone())));
        if vdb.use_depot {
            instructions.push(Box::new(HttpsCreateDepotOp::new(
                vdb,
                remaining_hosts,
                auth.clone(),
                &options.depot_size,
            )?));
        }
    }

    if all_hosts.len() >= KSAFETY_THRESHOLD {
        instructions.push(Box::new(HttpsMarkDesignKsafeOp::new(
            bootstrap_host.clone(),
            auth.clone(),
            1,
        )));
    }
    if !options.skip_package_install {
        instructions.push(Box::new(HttpsInstallPackagesOp::new(
            bootstrap_host.clone(),
            auth.clone(),
            false,
        )));
    }
    if vdb.is_eon {
        instructions.push(Box::new(HttpsSyncCatalogOp::new(bootstrap_host, auth)));
    }
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_comes_before_node_creation() {
        let options = CreateDbOptions {
            db: DatabaseOptions {
                db_name: "test_db".into(),
                hosts: vec!["10.0.0.1".into(), "10.0.0.2".into(), "10.0.0.3".into()],
                catalog_prefix: "/catalog".into(),
                data_prefix: "/data".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut vdb = CoordinationDatabase {
            name: "test_db".into(),
            catalog_prefix: "/catalog".into(),
            data_prefix: "/data".into(),
            ..Default::default()
        };
        vdb.add_hosts(&options.db.hosts, "");

        let instructions = produce_create_db_instructions(&vdb, &options).unwrap();
        let names: Vec<&str> = instructions.iter().map(|op| op.name()).collect();
        let bootstrap = names.iter().position(|n| *n == "bootstrap_catalog").unwrap();
        let create = names.iter().position(|n| *n == "create_node").unwrap();
        let ksafe = names.iter().position(|n| *n == "mark_design_ksafe").unwrap();
        assert!(bootstrap < create);
        assert!(create < ksafe);
        assert_eq!(names[0], "nma_health");
    }

    #[test]
    fn single_host_database_skips_node_creation() {
        let options = CreateDbOptions {
            db: DatabaseOptions {
                db_name: "test_db".into(),
                hosts: vec!["10.0.0.1".into()],
                catalog_prefix: "/catalog".into(),
                data_prefix: "/data".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut vdb = CoordinationDatabase {
            name: "test_db".into(),
            catalog_prefix: "/catalog".into(),
            data_prefix: "/data".into(),
            ..Default::default()
        };
        vdb.add_hosts(&options.db.hosts, "");

        let instructions = produce_create_db_instructions(&vdb, &options).unwrap();
        assert!(!instructions.iter().any(|op| op.name() == "create_node"));
        assert!(!instructions.iter().any(|op| op.name() == "mark_design_ksafe"));
    }
}
