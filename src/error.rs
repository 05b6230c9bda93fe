/// Unified error handling for proxysql-sync
///
/// Every stage of a reconciliation pass reports failure through `SyncError`,
/// carrying the statement, pod or identifier involved so an operator can
/// diagnose the failure from the message alone.
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Boxed driver error returned by the inventory, catalog and admin seams
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Pod inventory or account catalog query failed
    #[error("Lookup failed: {what}: {source}")]
    Lookup {
        what: String,
        #[source]
        source: BoxError,
    },

    /// A pod carries a role label value other than "true"/"false"
    #[error("Pod {pod} label {label} is invalid: {value:?}")]
    LabelInvalid {
        pod: String,
        label: String,
        value: Option<String>,
    },

    /// Discovered topology does not have the expected shape
    #[error("Ambiguous topology for group {group}: {reason}")]
    TopologyAmbiguous { group: String, reason: String },

    /// The database container declares no usable port
    #[error("Pod {pod} container {container} has no usable port")]
    MissingPort { pod: String, container: String },

    /// Nothing to route for a group
    #[error("No endpoints to route for group {group}")]
    EmptyInput { group: String },

    /// A write statement against the proxy catalog failed
    #[error("Apply failed: execute {statement}: {source}")]
    Apply {
        statement: String,
        #[source]
        source: BoxError,
    },

    /// Activate or persist directive failed after the writes succeeded
    #[error("Activation failed: execute {directive}: {source}")]
    Activation {
        directive: String,
        #[source]
        source: BoxError,
    },

    /// The pass did not finish before its deadline
    #[error("Operation {operation} exceeded deadline of {}s", after.as_secs())]
    DeadlineExceeded { operation: String, after: Duration },

    /// Opening a connection failed
    #[error("Connect to {target} failed: {source}")]
    Connect {
        target: String,
        #[source]
        source: BoxError,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Result type alias for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Pipeline stage an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Connect,
    Discovery,
    Apply,
    Activation,
    Deadline,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Config => write!(f, "config"),
            Stage::Connect => write!(f, "connect"),
            Stage::Discovery => write!(f, "discovery"),
            Stage::Apply => write!(f, "apply"),
            Stage::Activation => write!(f, "activation"),
            Stage::Deadline => write!(f, "deadline"),
        }
    }
}

impl SyncError {
    /// Create a lookup error
    pub fn lookup<S: Into<String>>(what: S, source: impl Into<BoxError>) -> Self {
        SyncError::Lookup {
            what: what.into(),
            source: source.into(),
        }
    }

    /// Create a connect error
    pub fn connect<S: Into<String>>(target: S, source: impl Into<BoxError>) -> Self {
        SyncError::Connect {
            target: target.into(),
            source: source.into(),
        }
    }

    /// Create an ambiguous topology error
    pub fn ambiguous<G: Into<String>, R: Into<String>>(group: G, reason: R) -> Self {
        SyncError::TopologyAmbiguous {
            group: group.into(),
            reason: reason.into(),
        }
    }

    /// Create a deadline error
    pub fn deadline<S: Into<String>>(operation: S, after: Duration) -> Self {
        SyncError::DeadlineExceeded {
            operation: operation.into(),
            after,
        }
    }

    /// Stage of the pass that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            SyncError::Config(_) => Stage::Config,
            SyncError::Connect { .. } => Stage::Connect,
            SyncError::Lookup { .. }
            | SyncError::LabelInvalid { .. }
            | SyncError::TopologyAmbiguous { .. }
            | SyncError::MissingPort { .. }
            | SyncError::EmptyInput { .. } => Stage::Discovery,
            SyncError::Apply { .. } => Stage::Apply,
            SyncError::Activation { .. } => Stage::Activation,
            SyncError::DeadlineExceeded { .. } => Stage::Deadline,
        }
    }

    /// True when rows were written but the proxy may still serve the old table
    pub fn traffic_may_be_stale(&self) -> bool {
        matches!(self, SyncError::Activation { .. })
    }
}
