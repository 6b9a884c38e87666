//! Whole-database commands: create, drop, start, stop.

use crate::commands::args::DbArgs;
use anyhow::{bail, Result};
use strata_ops::workflows::{
    self, CreateDbOptions, DropDbOptions, StartDbOptions, StopDbOptions,
};

pub async fn create_db(
    args: DbArgs,
    depot_size: Option<String>,
    force_cleanup: bool,
    skip_package_install: bool,
) -> Result<()> {
    let mut options = CreateDbOptions {
        db: args.to_options()?,
        depot_size: depot_size.unwrap_or_default(),
        force_cleanup,
        skip_package_install,
    };
    let vdb = workflows::create_db(&mut options).await?;
    args.write_config(&vdb)?;
    println!("Database {} created on {} hosts", vdb.name, vdb.hosts.len());
    Ok(())
}

pub async fn drop_db(args: DbArgs, force_delete: bool) -> Result<()> {
    let Some(config) = args.load_config()? else {
        bail!("drop_db needs the cluster config file; run manage_config_recover first");
    };
    let mut options = DropDbOptions { db: args.to_options()?, config, force_delete };
    workflows::drop_db(&mut options).await?;
    println!("Database {} dropped", args.db_name);
    Ok(())
}

pub async fn start_db(args: DbArgs) -> Result<()> {
    let Some(config) = args.load_config()? else {
        bail!("start_db needs the cluster config file; run manage_config_recover first");
    };
    let mut options = StartDbOptions { db: args.to_options()?, config };
    let vdb = workflows::start_db(&mut options).await?;
    println!("Database {} started", vdb.name);
    Ok(())
}

pub async fn stop_db(
    args: DbArgs,
    drain_seconds: Option<u64>,
    sandbox: String,
    main_cluster_only: bool,
) -> Result<()> {
    let mut options = StopDbOptions {
        db: args.to_options()?,
        drain_seconds,
        sandbox,
        main_cluster_only,
    };
    workflows::stop_db(&mut options).await?;
    println!("Database {} stopped", args.db_name);
    Ok(())
}
