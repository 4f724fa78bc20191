//! Operation Gate
//! Per-service serialization of lifecycle operations

use crate::domain::value_objects::ServiceId;
use crate::domain::{DomainError, Result};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::debug;

/// Serializes lifecycle operations per service
///
/// At most one start/stop/restart runs for a given service at a time.
/// A second request for the same service is rejected immediately
/// (never queued) so callers get a fast busy signal instead of a
/// stacked-up operation firing later against a changed state.
/// Operations on different services proceed concurrently.
pub struct OperationGate {
    in_flight: Mutex<HashSet<ServiceId>>,
}

impl OperationGate {
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Claim the service for one lifecycle operation
    ///
    /// Returns a permit that releases the claim on drop. Fails with
    /// `OperationInFlight` when another operation holds the service.
    pub fn acquire(&self, id: &ServiceId) -> Result<OperationPermit<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap();
        if !in_flight.insert(id.clone()) {
            debug!(service = %id, "Operation rejected, another is in flight");
            return Err(DomainError::OperationInFlight(id.to_string()));
        }
        Ok(OperationPermit {
            gate: self,
            id: id.clone(),
        })
    }

    /// True when an operation currently holds the service
    pub fn is_busy(&self, id: &ServiceId) -> bool {
        self.in_flight.lock().unwrap().contains(id)
    }
}

impl Default for OperationGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive claim on one service, released on drop
pub struct OperationPermit<'a> {
    gate: &'a OperationGate,
    id: ServiceId,
}

impl Drop for OperationPermit<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.lock().unwrap().remove(&self.id);
    }
}
