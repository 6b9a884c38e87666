//! Packages, replication, config recovery, and re-IP.

use crate::commands::args::{DbArgs, ReplicationArgs};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use strata_core::config::config_file_path;
use strata_core::util::split_host_list;
use strata_ops::workflows::{
    self, ConfigRecoverOptions, InstallPackagesOptions, ReIpOptions, ReIpPair, ReplicationOptions,
};
use tracing::info;

pub async fn install_packages(args: DbArgs, force_reinstall: bool) -> Result<()> {
    let mut options = InstallPackagesOptions { db: args.to_options()?, force_reinstall };
    workflows::install_packages(&mut options).await?;
    println!("Packages installed on database {}", args.db_name);
    Ok(())
}

pub async fn replication_start(args: DbArgs, target: ReplicationArgs) -> Result<()> {
    let target_password = match &target.target_password_file {
        Some(file) => Some(
            fs::read_to_string(file)
                .with_context(|| format!("cannot read password file {}", file.display()))?
                .trim_end()
                .to_string(),
        ),
        None => None,
    };
    let mut options = ReplicationOptions {
        db: args.to_options()?,
        target_db_name: target.target_db_name.clone(),
        target_hosts: split_host_list(&target.target_hosts)?,
        target_username: target.target_username.clone(),
        target_password,
    };
    workflows::replication_start(&mut options).await?;
    println!(
        "Replication started from {} to {}",
        args.db_name, target.target_db_name
    );
    Ok(())
}

pub async fn config_recover(args: DbArgs) -> Result<()> {
    let mut options = ConfigRecoverOptions { db: args.to_options()?, is_eon: args.eon_mode };
    let config = workflows::config_recover(&mut options).await?;

    let path = config_file_path(&args.db_name, args.config.as_deref())?;
    config
        .write(&path)
        .with_context(|| format!("cannot write config file {}", path.display()))?;
    info!(path = %path.display(), "cluster config recovered");
    println!("Cluster config recovered to {}", path.display());
    Ok(())
}

pub async fn re_ip(args: DbArgs, re_ip_file: PathBuf) -> Result<()> {
    let content = fs::read_to_string(&re_ip_file)
        .with_context(|| format!("cannot read re-ip file {}", re_ip_file.display()))?;

    let mut pairs = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next(), fields.next()) {
            (Some(node_name), Some(new_address), None) => pairs.push(ReIpPair {
                node_name: node_name.to_string(),
                new_address: new_address.to_lowercase(),
            }),
            _ => anyhow::bail!(
                "malformed line {} in {}: expected \"node_name new_address\"",
                number + 1,
                re_ip_file.display()
            ),
        }
    }

    let mut options = ReIpOptions { db: args.to_options()?, pairs };
    workflows::re_ip(&mut options).await?;
    println!("Re-ip complete for database {}", args.db_name);
    Ok(())
}
