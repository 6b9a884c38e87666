//! strata - administer a distributed analytic database cluster.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::args::{DbArgs, ReplicationArgs};
use tracing_subscriber::EnvFilter;

/// Cluster administration for a distributed analytic database.
#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a database on the given hosts
    CreateDb {
        #[command(flatten)]
        db: DbArgs,

        /// Size of the depot, e.g. 10G or 25%
        #[arg(long)]
        depot_size: Option<String>,

        /// Wipe pre-existing directories before preparing them
        #[arg(long)]
        force_cleanup_on_failure: bool,

        /// Skip installing the default packages
        #[arg(long)]
        skip_package_install: bool,
    },

    /// Drop a stopped database, removing its directories
    DropDb {
        #[command(flatten)]
        db: DbArgs,

        /// Delete directories even when they still hold data
        #[arg(long)]
        force_delete: bool,
    },

    /// Start a stopped database
    StartDb {
        #[command(flatten)]
        db: DbArgs,
    },

    /// Stop a running database
    StopDb {
        #[command(flatten)]
        db: DbArgs,

        /// Seconds to wait for active sessions to drain
        #[arg(long)]
        drain_seconds: Option<u64>,

        /// Stop only this sandbox
        #[arg(long, default_value = "")]
        sandbox: String,

        /// Stop only the main cluster
        #[arg(long)]
        main_cluster_only: bool,
    },

    /// Add nodes to a database
    DbAddNode {
        #[command(flatten)]
        db: DbArgs,

        /// Comma-separated list of hosts to add
        #[arg(long = "add")]
        new_hosts: String,

        /// Subcluster to add the nodes to (default subcluster when empty)
        #[arg(long, default_value = "")]
        subcluster: String,

        /// Size of the depot on the new nodes
        #[arg(long)]
        depot_size: Option<String>,

        /// Skip the subcluster shard rebalance
        #[arg(long)]
        skip_rebalance_shards: bool,
    },

    /// Remove nodes from a database
    DbRemoveNode {
        #[command(flatten)]
        db: DbArgs,

        /// Comma-separated list of hosts to remove
        #[arg(long = "remove")]
        hosts_to_remove: String,

        /// Delete directories even when they still hold data
        #[arg(long, default_value_t = true)]
        force_delete: bool,
    },

    /// Create a subcluster, optionally populating it with nodes
    DbAddSubcluster {
        #[command(flatten)]
        db: DbArgs,

        /// Name of the new subcluster
        #[arg(long)]
        subcluster: String,

        /// Create a primary subcluster (secondary by default)
        #[arg(long)]
        is_primary: bool,

        /// Control-set size of the subcluster
        #[arg(long)]
        control_set_size: Option<i32>,

        /// Comma-separated list of hosts to add to the subcluster
        #[arg(long = "add", default_value = "")]
        new_hosts: String,

        /// Size of the depot on the new nodes
        #[arg(long)]
        depot_size: Option<String>,
    },

    /// Remove a subcluster and its nodes
    DbRemoveSubcluster {
        #[command(flatten)]
        db: DbArgs,

        /// Name of the subcluster to remove
        #[arg(long)]
        subcluster: String,

        /// Delete directories even when they still hold data
        #[arg(long, default_value_t = true)]
        force_delete: bool,
    },

    /// Stop all nodes of one subcluster
    StopSubcluster {
        #[command(flatten)]
        db: DbArgs,

        /// Name of the subcluster to stop
        #[arg(long)]
        subcluster: String,

        /// Seconds to wait for active sessions to drain
        #[arg(long)]
        drain_seconds: Option<u64>,
    },

    /// Sandbox a subcluster
    SandboxSubcluster {
        #[command(flatten)]
        db: DbArgs,

        /// Name of the subcluster to sandbox
        #[arg(long)]
        subcluster: String,

        /// Name of the sandbox
        #[arg(long)]
        sandbox: String,
    },

    /// Pull a subcluster back out of its sandbox
    UnsandboxSubcluster {
        #[command(flatten)]
        db: DbArgs,

        /// Name of the subcluster to unsandbox
        #[arg(long)]
        subcluster: String,
    },

    /// Show the state of every node in the cluster
    FetchNodesDetails {
        #[command(flatten)]
        db: DbArgs,
    },

    /// Install the default packages on a running database
    InstallPackages {
        #[command(flatten)]
        db: DbArgs,

        /// Reinstall packages that are already installed
        #[arg(long)]
        force_reinstall: bool,
    },

    /// List restore points in communal storage
    ShowRestorePoints {
        #[command(flatten)]
        db: DbArgs,

        /// List only this archive
        #[arg(long, default_value = "")]
        archive: String,
    },

    /// Start replication toward a target database
    ReplicationStart {
        #[command(flatten)]
        db: DbArgs,

        #[command(flatten)]
        target: ReplicationArgs,
    },

    /// Rebuild the cluster config file from the node management agents
    ManageConfigRecover {
        #[command(flatten)]
        db: DbArgs,
    },

    /// Rewrite catalog address assignments after hosts moved
    ReIp {
        #[command(flatten)]
        db: DbArgs,

        /// File of reassignments, one "node_name new_address" per line
        #[arg(long = "re-ip-file")]
        re_ip_file: std::path::PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::CreateDb { db, depot_size, force_cleanup_on_failure, skip_package_install } => {
            commands::db::create_db(db, depot_size, force_cleanup_on_failure, skip_package_install)
                .await
        }
        Commands::DropDb { db, force_delete } => commands::db::drop_db(db, force_delete).await,
        Commands::StartDb { db } => commands::db::start_db(db).await,
        Commands::StopDb { db, drain_seconds, sandbox, main_cluster_only } => {
            commands::db::stop_db(db, drain_seconds, sandbox, main_cluster_only).await
        }
        Commands::DbAddNode { db, new_hosts, subcluster, depot_size, skip_rebalance_shards } => {
            commands::node::add_node(db, new_hosts, subcluster, depot_size, skip_rebalance_shards)
                .await
        }
        Commands::DbRemoveNode { db, hosts_to_remove, force_delete } => {
            commands::node::remove_node(db, hosts_to_remove, force_delete).await
        }
        Commands::DbAddSubcluster {
            db,
            subcluster,
            is_primary,
            control_set_size,
            new_hosts,
            depot_size,
        } => {
            commands::subcluster::add_subcluster(
                db,
                subcluster,
                is_primary,
                control_set_size,
                new_hosts,
                depot_size,
            )
            .await
        }
        Commands::DbRemoveSubcluster { db, subcluster, force_delete } => {
            commands::subcluster::remove_subcluster(db, subcluster, force_delete).await
        }
        Commands::StopSubcluster { db, subcluster, drain_seconds } => {
            commands::subcluster::stop_subcluster(db, subcluster, drain_seconds).await
        }
        Commands::SandboxSubcluster { db, subcluster, sandbox } => {
            commands::subcluster::sandbox_subcluster(db, subcluster, sandbox).await
        }
        Commands::UnsandboxSubcluster { db, subcluster } => {
            commands::subcluster::unsandbox_subcluster(db, subcluster).await
        }
        Commands::FetchNodesDetails { db } => commands::info::fetch_nodes_details(db).await,
        Commands::InstallPackages { db, force_reinstall } => {
            commands::misc::install_packages(db, force_reinstall).await
        }
        Commands::ShowRestorePoints { db, archive } => {
            commands::info::show_restore_points(db, archive).await
        }
        Commands::ReplicationStart { db, target } => {
            commands::misc::replication_start(db, target).await
        }
        Commands::ManageConfigRecover { db } => commands::misc::config_recover(db).await,
        Commands::ReIp { db, re_ip_file } => commands::misc::re_ip(db, re_ip_file).await,
    }
}
