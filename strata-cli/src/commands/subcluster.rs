//! Subcluster commands.

use crate::commands::args::DbArgs;
use anyhow::Result;
use strata_core::util::split_host_list;
use strata_ops::workflows::{
    self, AddSubclusterOptions, RemoveSubclusterOptions, SandboxOptions, StopSubclusterOptions,
};

pub async fn add_subcluster(
    args: DbArgs,
    subcluster: String,
    is_primary: bool,
    control_set_size: Option<i32>,
    new_hosts: String,
    depot_size: Option<String>,
) -> Result<()> {
    let new_hosts = if new_hosts.is_empty() {
        Vec::new()
    } else {
        split_host_list(&new_hosts)?
    };
    let mut options = AddSubclusterOptions {
        db: args.to_options()?,
        sc_name: subcluster.clone(),
        is_primary,
        control_set_size,
        new_hosts,
        depot_size: depot_size.unwrap_or_default(),
    };
    let vdb = workflows::add_subcluster(&mut options).await?;
    if !options.new_hosts.is_empty() {
        args.write_config(&vdb)?;
    }
    println!("Subcluster {subcluster} created");
    Ok(())
}

pub async fn remove_subcluster(args: DbArgs, subcluster: String, force_delete: bool) -> Result<()> {
    let mut options = RemoveSubclusterOptions {
        db: args.to_options()?,
        sc_name: subcluster.clone(),
        force_delete,
    };
    let vdb = workflows::remove_subcluster(&mut options).await?;
    args.write_config(&vdb)?;
    println!("Subcluster {subcluster} removed");
    Ok(())
}

pub async fn stop_subcluster(
    args: DbArgs,
    subcluster: String,
    drain_seconds: Option<u64>,
) -> Result<()> {
    let mut options = StopSubclusterOptions {
        db: args.to_options()?,
        sc_name: subcluster.clone(),
        drain_seconds,
    };
    workflows::stop_subcluster(&mut options).await?;
    println!("Subcluster {subcluster} stopped");
    Ok(())
}

pub async fn sandbox_subcluster(args: DbArgs, subcluster: String, sandbox: String) -> Result<()> {
    let mut options = SandboxOptions {
        db: args.to_options()?,
        sc_name: subcluster.clone(),
        sandbox: sandbox.clone(),
    };
    workflows::sandbox_subcluster(&mut options).await?;
    println!("Subcluster {subcluster} sandboxed as {sandbox}");
    Ok(())
}

pub async fn unsandbox_subcluster(args: DbArgs, subcluster: String) -> Result<()> {
    let mut options = SandboxOptions {
        db: args.to_options()?,
        sc_name: subcluster.clone(),
        sandbox: String::new(),
    };
    workflows::unsandbox_subcluster(&mut options).await?;
    println!("Subcluster {subcluster} unsandboxed");
    Ok(())
}
