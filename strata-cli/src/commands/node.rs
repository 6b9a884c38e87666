//! Node membership commands.

use crate::commands::args::DbArgs;
use anyhow::Result;
use strata_core::util::split_host_list;
use strata_ops::workflows::{self, AddNodeOptions, RemoveNodeOptions};

pub async fn add_node(
    args: DbArgs,
    new_hosts: String,
    subcluster: String,
    depot_size: Option<String>,
    skip_rebalance_shards: bool,
) -> Result<()> {
    let mut options = AddNodeOptions {
        db: args.to_options()?,
        new_hosts: split_host_list(&new_hosts)?,
        sc_name: subcluster,
        depot_size: depot_size.unwrap_or_default(),
        skip_rebalance_shards,
    };
    let vdb = workflows::add_node(&mut options).await?;
    args.write_config(&vdb)?;
    println!("Added {} node(s) to database {}", options.new_hosts.len(), vdb.name);
    Ok(())
}

pub async fn remove_node(args: DbArgs, hosts_to_remove: String, force_delete: bool) -> Result<()> {
    let mut options = RemoveNodeOptions {
        db: args.to_options()?,
        hosts_to_remove: split_host_list(&hosts_to_remove)?,
        force_delete,
    };
    let vdb = workflows::remove_node(&mut options).await?;
    args.write_config(&vdb)?;
    println!(
        "Removed {} node(s) from database {}",
        options.hosts_to_remove.len(),
        vdb.name
    );
    Ok(())
}
