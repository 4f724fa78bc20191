//! ServiceState value object
//! Represents the lifecycle state of a managed service

use serde::{Deserialize, Serialize};
use std::fmt;

/// The state of a service in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// Folder found on disk but no usable manifest yet
    #[default]
    Discovered,

    /// Manifest parsed and validated, service can be started
    Ready,

    /// Process spawned, waiting for the health endpoint to answer
    Starting,

    /// Process alive and health endpoint answered
    Running,

    /// Stop requested, termination in progress
    Stopping,

    /// Process terminated on request
    Stopped,

    /// Process died or never became ready
    Failed,

    /// Manifest refresh or validation failed
    Error,
}

impl ServiceState {
    /// Check if a live process may be attached to the service
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ServiceState::Starting | ServiceState::Running | ServiceState::Stopping
        )
    }

    /// Check if the service can be started
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            ServiceState::Ready | ServiceState::Stopped | ServiceState::Failed
        )
    }

    /// Check if the service can be stopped
    pub fn can_stop(&self) -> bool {
        matches!(self, ServiceState::Running)
    }

    /// Validate state transition
    pub fn can_transition_to(&self, new_state: ServiceState) -> bool {
        use ServiceState::*;

        match (self, new_state) {
            // From Discovered (initial state)
            (Discovered, Ready) => true,
            (Discovered, Error) => true,

            // From Ready
            (Ready, Starting) => true,
            (Ready, Error) => true, // Manifest refresh turned up invalid

            // From Starting
            (Starting, Running) => true,
            (Starting, Failed) => true, // Launch failure or readiness timeout

            // From Running
            (Running, Stopping) => true,
            (Running, Failed) => true, // Unexpected process exit

            // From Stopping
            (Stopping, Stopped) => true,
            (Stopping, Failed) => true,

            // From Stopped
            (Stopped, Starting) => true,
            (Stopped, Error) => true,

            // From Failed
            (Failed, Starting) => true,
            (Failed, Error) => true,

            // From Error (a repaired manifest clears it)
            (Error, Ready) => true,

            // Same state is always allowed
            (a, b) if *a == b => true,

            // Everything else is invalid
            _ => false,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Discovered => write!(f, "discovered"),
            ServiceState::Ready => write!(f, "ready"),
            ServiceState::Starting => write!(f, "starting"),
            ServiceState::Running => write!(f, "running"),
            ServiceState::Stopping => write!(f, "stopping"),
            ServiceState::Stopped => write!(f, "stopped"),
            ServiceState::Failed => write!(f, "failed"),
            ServiceState::Error => write!(f, "error"),
        }
    }
}
