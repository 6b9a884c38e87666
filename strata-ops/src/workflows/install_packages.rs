//! Installing the default packages on a running database.

use crate::engine::OperationEngine;
use crate::error::Result;
use crate::ops::https::{HttpsGetUpNodesOp, HttpsInstallPackagesOp};
use crate::ops::{CommandPolicy, Operation};
use crate::workflows::DatabaseOptions;

/// Options for install_packages.
#[derive(Debug, Clone, Default)]
pub struct InstallPackagesOptions {
    /// Common database options.
    pub db: DatabaseOptions,
    /// Reinstall packages that are already installed.
    pub force_reinstall: bool,
}

/// Install the default packages through an UP node.
pub async fn install_packages(options: &mut InstallPackagesOptions) -> Result<()> {
    options.db.analyze();
    options.db.validate(CommandPolicy::InstallPackages)?;
    let auth = options.db.auth()?;

    let instructions: Vec<Box<dyn Operation>> = vec![
        Box::new(HttpsGetUpNodesOp::new(
            &options.db.db_name,
            options.db.hosts.clone(),
            auth.clone(),
            CommandPolicy::InstallPackages,
        )),
        Box::new(HttpsInstallPackagesOp::new(Vec::new(), auth, options.force_reinstall)),
    ];
    let mut engine = OperationEngine::new(instructions, options.db.certs());
    engine.run().await
}
