//! ResolveConflicts Command

use crate::domain::value_objects::ServiceId;

/// Two services configured to claim the same port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConflict {
    pub first: ServiceId,
    pub second: ServiceId,
    /// Logical port name on the second claimant
    pub port_name: String,
    pub port: u16,
}

/// A persisted port assignment rewritten during resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortChange {
    pub service: ServiceId,
    pub port_name: String,
    pub from_port: u16,
    pub to_port: u16,
}

/// Response from a conflict resolution pass
#[derive(Debug, Clone, Default)]
pub struct ResolveConflictsResponse {
    /// Conflicts present before any rewrite
    pub conflicts: Vec<PortConflict>,
    /// Assignments moved to settle them
    pub changes: Vec<PortChange>,
}
