//! Domain-level errors
//! These represent business rule violations, not infrastructure failures

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DomainError {
    // Service lifecycle errors
    #[error("Service '{0}' not found")]
    ServiceNotFound(String),

    #[error("Service '{0}' has no manifest")]
    ManifestMissing(String),

    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Operation already in flight for service '{0}'")]
    OperationInFlight(String),

    // Launch errors
    #[error("Failed to launch service: {0}")]
    LaunchFailed(String),

    #[error("Service did not become ready within {0}s")]
    ReadinessTimeout(u64),

    // Port allocation errors
    #[error("No free {class} port in range {start}-{end}")]
    PortRangeExhausted { class: String, start: u16, end: u16 },

    // Resource errors
    #[error("Insufficient resources: {0}")]
    InsufficientResources(String),

    // Manifest errors
    #[error("Invalid manifest: {0}")]
    ManifestInvalid(String),

    // Environment file errors
    #[error("Environment file '{path}' line {line}: {reason}")]
    EnvFileParse {
        path: String,
        line: usize,
        reason: String,
    },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // Infrastructure failures surfaced to callers
    #[error("I/O error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
