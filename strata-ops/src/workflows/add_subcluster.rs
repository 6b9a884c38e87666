//! Creating a subcluster, optionally populating it with nodes.

use crate::engine::OperationEngine;
use crate::error::{OpsError, Result};
use crate::ops::https::HttpsAddSubclusterOp;
use crate::ops::{choose_initiator, CommandPolicy, Operation};
use crate::workflows::add_node::{add_node, AddNodeOptions};
use crate::workflows::{get_vdb_from_running_db, DatabaseOptions};
use strata_core::CoordinationDatabase;
use tracing::info;

/// Options for db_add_subcluster.
#[derive(Debug, Clone, Default)]
pub struct AddSubclusterOptions {
    /// Common database options.
    pub db: DatabaseOptions,
    /// Name of the subcluster to create.
    pub sc_name: String,
    /// Whether the subcluster is primary.
    pub is_primary: bool,
    /// Control-set size; `None` uses the server default.
    pub control_set_size: Option<i32>,
    /// Hosts to add to the new subcluster right away.
    pub new_hosts: Vec<String>,
    /// Depot size for nodes added right away.
    pub depot_size: String,
}

/// Create a subcluster and, when hosts are listed, add them to it.
pub async fn add_subcluster(options: &mut AddSubclusterOptions) -> Result<CoordinationDatabase> {
    options.db.analyze();
    options.db.validate(CommandPolicy::AddSubcluster)?;
    if options.sc_name.is_empty() {
        return Err(OpsError::OptionValidation {
            cause: "must specify a subcluster name".to_string(),
        });
    }

    let vdb = get_vdb_from_running_db(&options.db).await?;
    if !vdb.is_eon {
        return Err(OpsError::NotEonMode {
            command: "db_add_subcluster",
            db_name: vdb.name.clone(),
        });
    }
    if !vdb.hosts_in_subcluster(&options.sc_name).is_empty() {
        return Err(OpsError::OptionValidation {
            cause: format!("subcluster {} already exists", options.sc_name),
        });
    }

    let initiator = choose_initiator(&vdb.primary_up_nodes, &[])?;
    let add_sc_op = HttpsAddSubclusterOp::new(
        vec![initiator],
        options.db.auth()?,
        &options.sc_name,
        options.is_primary,
        options.control_set_size,
    );
    let instructions: Vec<Box<dyn Operation>> = vec![Box::new(add_sc_op)];
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await?;
    info!(subcluster = %options.sc_name, "subcluster created");

    if options.new_hosts.is_empty() {
        return Ok(vdb);
    }

    let mut add_node_options = AddNodeOptions {
        db: options.db.clone(),
        new_hosts: options.new_hosts.clone(),
        sc_name: options.sc_name.clone(),
        depot_size: options.depot_size.clone(),
        skip_rebalance_shards: false,
    };
    add_node(&mut add_node_options).await
}
