//! Read-only commands: node details and restore points.

use crate::commands::args::DbArgs;
use anyhow::Result;
use strata_ops::workflows::{self, FetchNodeStateOptions, ShowRestorePointsOptions};

pub async fn fetch_nodes_details(args: DbArgs) -> Result<()> {
    let mut options = FetchNodeStateOptions { db: args.to_options()? };
    let nodes = workflows::fetch_node_state(&mut options).await?;

    println!(
        "{:<24} {:<16} {:<8} {:<8} {:<20} {:<10}",
        "NODE", "ADDRESS", "STATE", "PRIMARY", "SUBCLUSTER", "SANDBOX"
    );
    for node in &nodes {
        println!(
            "{:<24} {:<16} {:<8} {:<8} {:<20} {:<10}",
            node.name,
            node.address,
            node.state.to_string(),
            node.is_primary,
            node.subcluster_name,
            node.sandbox
        );
    }
    Ok(())
}

pub async fn show_restore_points(args: DbArgs, archive: String) -> Result<()> {
    let mut options = ShowRestorePointsOptions { db: args.to_options()?, archive };
    let restore_points = workflows::show_restore_points(&mut options).await?;

    println!("{:<20} {:<38} {:<6} {:<24}", "ARCHIVE", "ID", "INDEX", "TIMESTAMP");
    for point in &restore_points {
        println!(
            "{:<20} {:<38} {:<6} {:<24}",
            point.archive, point.id, point.index, point.timestamp
        );
    }
    Ok(())
}
