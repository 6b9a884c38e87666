//! Error types for the operation engine.
//!
//! The taxonomy mirrors how failures surface during a workflow: option
//! validation, transport exceptions, structured remote failures, credential
//! problems, semantic errors discovered while reconciling cluster state, and
//! invariant violations that indicate a programming error in a workflow.

use std::fmt;
use strata_core::{CoreError, Problem};
use thiserror::Error;

/// The main error type for cluster operations.
#[derive(Debug, Error)]
pub enum OpsError {
    /// Option or config validation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An option combination was rejected by a workflow.
    #[error("invalid options: {cause}")]
    OptionValidation {
        /// Why the options were rejected.
        cause: String,
    },

    /// A request could not reach the remote daemon.
    #[error("request to host {host} failed: {cause}")]
    Transport {
        /// The unreachable host.
        host: String,
        /// Description of the transport failure.
        cause: String,
        /// Whether the failure was a timeout.
        timeout: bool,
    },

    /// The remote daemon answered with a structured (RFC 7807) failure.
    #[error("request failed on host {host}: {problem}")]
    Remote {
        /// The responding host.
        host: String,
        /// The decoded problem body.
        problem: Problem,
    },

    /// Wrong password or client certificate for the HTTPS service.
    #[error("wrong password or certificate for the https service on host {host}")]
    Unauthorized {
        /// The rejecting host.
        host: String,
    },

    /// The target subcluster does not exist in the database.
    #[error("subcluster {name} does not exist in the database")]
    SubclusterNotFound {
        /// The missing subcluster.
        name: String,
    },

    /// The target database was not found on the queried hosts.
    #[error("database {name} was not found")]
    DatabaseNotFound {
        /// The missing database.
        name: String,
    },

    /// A host reported nodes belonging to a different database.
    #[error("unexpected database {found:?} is running on hosts {hosts:?}")]
    DbNameMismatch {
        /// The database name the host reported.
        found: String,
        /// The hosts reporting it.
        hosts: Vec<String>,
    },

    /// No UP node found in the target subcluster.
    #[error("there are no UP nodes in subcluster {name}; the subcluster is already down")]
    SubclusterAlreadyDown {
        /// The target subcluster.
        name: String,
    },

    /// The default subcluster cannot be removed.
    #[error("cannot remove the default subcluster {name:?}")]
    RemoveDefaultSubcluster {
        /// The default subcluster name.
        name: String,
    },

    /// The target subcluster is sandboxed and must be unsandboxed first.
    #[error("subcluster {name:?} is sandboxed in {sandbox:?}, unsandbox it first")]
    SandboxedSubcluster {
        /// The target subcluster.
        name: String,
        /// The sandbox holding it.
        sandbox: String,
    },

    /// An Eon-only workflow was pointed at an enterprise database.
    #[error("cannot run {command} against the enterprise database {db_name:?}")]
    NotEonMode {
        /// The rejected command.
        command: &'static str,
        /// The database name.
        db_name: String,
    },

    /// Hosts to add are already part of the database.
    #[error("hosts {hosts:?} already exist in the database")]
    HostsAlreadyInDatabase {
        /// The duplicate hosts.
        hosts: Vec<String>,
    },

    /// Hosts to remove are not part of the database.
    #[error("hosts {hosts:?} do not exist in the database")]
    HostsNotInDatabase {
        /// The unknown hosts.
        hosts: Vec<String>,
    },

    /// An enterprise shrink requires every node up or standby.
    #[error("all nodes must be up or standby before removing a node")]
    NodesNotUpForRemoval,

    /// No UP node was detected in the database.
    #[error("no up nodes detected")]
    NoUpNodes,

    /// No primary UP node outside the exclusion set.
    #[error("could not find any primary up node that is not excluded")]
    NoEligibleInitiator,

    /// Cluster quorum was lost before a re-IP could run.
    #[error("{detail}")]
    NoClusterQuorum {
        /// Human-readable detail, surfaced to the caller.
        detail: String,
    },

    /// Hosts disagree on the server version.
    #[error("found mismatched versions: [{first}] and [{second}]")]
    VersionMismatch {
        /// The reference version (first seen).
        first: String,
        /// The conflicting version.
        second: String,
    },

    /// A host reported no server version.
    #[error("no version collected for host {host}")]
    MissingVersion {
        /// The versionless host.
        host: String,
    },

    /// Nodes did not come up before the polling timeout.
    #[error("the following hosts are not up after {timeout_secs} seconds: {hosts:?}")]
    NodeStateTimeout {
        /// Sorted list of hosts that never reported UP.
        hosts: Vec<String>,
        /// The timeout that elapsed.
        timeout_secs: u64,
    },

    /// A request targeted a host with no adapter in the pool.
    #[error("host {host} is not found in the adapter pool")]
    HostNotInPool {
        /// The unknown host.
        host: String,
    },

    /// A network profile required by an operation was never discovered.
    #[error("unable to find network profile for address {host}")]
    MissingNetworkProfile {
        /// The host missing a profile.
        host: String,
    },

    /// A catalog path required by an operation is unknown.
    #[error("cannot find catalog path of host {host}")]
    MissingCatalogPath {
        /// The host missing a catalog path.
        host: String,
    },

    /// A response body could not be decoded.
    #[error("[{op}] failed to parse response from host {host}: {cause}")]
    ResponseFormat {
        /// The operation that received the response.
        op: String,
        /// The responding host.
        host: String,
        /// The decode failure.
        cause: String,
    },

    /// A response decoded but did not have the expected shape.
    #[error("[{op}] unexpected response from host {host}: {cause}")]
    UnexpectedResponse {
        /// The operation that received the response.
        op: String,
        /// The responding host.
        host: String,
        /// What was wrong.
        cause: String,
    },

    /// Several per-host errors joined into one.
    #[error("{0}")]
    Joined(JoinedErrors),
}

impl OpsError {
    /// Whether this error reports quorum loss (callers map this to "start
    /// the database first").
    pub fn is_quorum_loss(&self) -> bool {
        match self {
            OpsError::NoClusterQuorum { .. } => true,
            OpsError::Joined(joined) => joined.0.iter().any(OpsError::is_quorum_loss),
            _ => false,
        }
    }

    /// Whether this error reports a credential problem.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            OpsError::Unauthorized { .. } => true,
            OpsError::Remote { problem, .. } => {
                problem.is_unauthorized() && !problem.is_node_not_joined()
            }
            OpsError::Joined(joined) => joined.0.iter().any(OpsError::is_unauthorized),
            _ => false,
        }
    }

    /// Whether this error reports a missing subcluster.
    pub fn is_subcluster_not_found(&self) -> bool {
        match self {
            OpsError::SubclusterNotFound { .. } => true,
            OpsError::Remote { problem, .. } => problem.is_subcluster_not_found(),
            OpsError::Joined(joined) => joined.0.iter().any(OpsError::is_subcluster_not_found),
            _ => false,
        }
    }

    /// Join a list of errors into a single error. Returns `Ok(())` for an
    /// empty list and the sole error unwrapped for a singleton list.
    pub fn join(mut errors: Vec<OpsError>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(OpsError::Joined(JoinedErrors(errors))),
        }
    }
}

/// A list of per-host errors rendered as one message.
#[derive(Debug)]
pub struct JoinedErrors(pub Vec<OpsError>);

impl fmt::Display for JoinedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

/// Accumulates per-host errors during result processing.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<OpsError>,
}

impl ErrorCollector {
    /// An empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one error.
    pub fn push(&mut self, error: OpsError) {
        self.errors.push(error);
    }

    /// Whether no error was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert into a result, joining the recorded errors.
    pub fn into_result(self) -> Result<()> {
        OpsError::join(self.errors)
    }
}

/// Result type alias using [`OpsError`].
pub type Result<T> = std::result::Result<T, OpsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_empty_is_ok() {
        assert!(OpsError::join(Vec::new()).is_ok());
    }

    #[test]
    fn join_single_unwraps() {
        let err = OpsError::join(vec![OpsError::NoUpNodes]).unwrap_err();
        assert!(matches!(err, OpsError::NoUpNodes));
    }

    #[test]
    fn join_many_concatenates_messages() {
        let err = OpsError::join(vec![
            OpsError::NoUpNodes,
            OpsError::MissingVersion { host: "10.0.0.1".into() },
        ])
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("no up nodes detected"));
        assert!(message.contains("; "));
        assert!(message.contains("10.0.0.1"));
    }

    #[test]
    fn quorum_classification() {
        let err = OpsError::NoClusterQuorum { detail: "2 up nodes are not enough for re-ip".into() };
        assert!(err.is_quorum_loss());
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn node_not_joined_is_not_a_credential_error() {
        let problem = Problem::parse(
            r#"{"detail": "Local node has not joined cluster yet", "status": 401}"#,
        )
        .unwrap();
        let err = OpsError::Remote { host: "10.0.0.1".into(), problem };
        assert!(!err.is_unauthorized());
    }
}
