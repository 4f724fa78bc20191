//! Service entity
//! Core domain entity representing one discovered service folder

use crate::domain::value_objects::epoch_secs;
use crate::domain::{DomainError, HealthVerdict, Manifest, ServiceId, ServiceState};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Service record - the core domain aggregate
///
/// A live process belongs to a record only while the state is active;
/// `pid` and `assigned_ports` are cleared whenever the record leaves
/// the active states so stale handles can never be acted on.
#[derive(Debug, Clone)]
pub struct ServiceRecord {
    // Identity
    id: ServiceId,
    location: PathBuf,

    // Manifest (absent until generated or loaded)
    manifest: Option<Manifest>,

    // State
    state: ServiceState,
    pid: Option<u32>,
    assigned_ports: BTreeMap<String, u16>,
    last_error: Option<String>,
    health: Option<HealthVerdict>,

    // Timestamps (seconds since epoch)
    registered_at: u64,
    started_at: Option<u64>,
    stopped_at: Option<u64>,
}

impl ServiceRecord {
    /// Create a record for a folder with no usable manifest yet
    pub fn discovered(id: ServiceId, location: impl Into<PathBuf>) -> Self {
        Self {
            id,
            location: location.into(),
            manifest: None,
            state: ServiceState::Discovered,
            pid: None,
            assigned_ports: BTreeMap::new(),
            last_error: None,
            health: None,
            registered_at: epoch_secs(),
            started_at: None,
            stopped_at: None,
        }
    }

    /// Create a record whose manifest already validated
    pub fn with_manifest(id: ServiceId, location: impl Into<PathBuf>, manifest: Manifest) -> Self {
        let mut record = Self::discovered(id, location);
        record.manifest = Some(manifest);
        record.state = ServiceState::Ready;
        record
    }

    // ===== Getters =====

    pub fn id(&self) -> &ServiceId {
        &self.id
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn assigned_ports(&self) -> &BTreeMap<String, u16> {
        &self.assigned_ports
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn health(&self) -> Option<&HealthVerdict> {
        self.health.as_ref()
    }

    pub fn registered_at(&self) -> u64 {
        self.registered_at
    }

    pub fn started_at(&self) -> Option<u64> {
        self.started_at
    }

    pub fn stopped_at(&self) -> Option<u64> {
        self.stopped_at
    }

    /// Manifest display name, falling back to the id
    pub fn display_name(&self) -> &str {
        match self.manifest {
            Some(ref manifest) => manifest.display_name(self.id.as_str()),
            None => self.id.as_str(),
        }
    }

    // ===== Business Logic: Queries =====

    /// Check if a live process may be attached
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Seconds since launch, only while a process is attached
    pub fn uptime_secs(&self) -> Option<u64> {
        if self.state.is_active() {
            self.started_at.map(|t| epoch_secs().saturating_sub(t))
        } else {
            None
        }
    }

    // ===== Business Logic: State Changes =====

    /// Attach a freshly validated manifest, replacing any prior one
    pub fn attach_manifest(&mut self, manifest: Manifest) {
        self.manifest = Some(manifest);
    }

    /// Mark the service ready to start
    pub fn mark_ready(&mut self) -> Result<(), DomainError> {
        if self.manifest.is_none() {
            return Err(DomainError::ManifestMissing(self.id.to_string()));
        }
        if !self.state.can_transition_to(ServiceState::Ready) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: "ready".to_string(),
            });
        }

        self.state = ServiceState::Ready;
        self.last_error = None;
        Ok(())
    }

    /// Mark the service as starting and take ownership of its ports
    pub fn mark_starting(&mut self, ports: BTreeMap<String, u16>) -> Result<(), DomainError> {
        if !self.state.can_transition_to(ServiceState::Starting) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: "starting".to_string(),
            });
        }

        self.state = ServiceState::Starting;
        self.assigned_ports = ports;
        self.last_error = None;
        self.health = None;
        Ok(())
    }

    /// Record the spawned process behind a Starting record
    pub fn record_spawned(&mut self, pid: u32) {
        self.pid = Some(pid);
        self.started_at = Some(epoch_secs());
    }

    /// Mark the service as running after it reported ready
    pub fn mark_running(&mut self) -> Result<(), DomainError> {
        if !self.state.can_transition_to(ServiceState::Running) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: "running".to_string(),
            });
        }

        self.state = ServiceState::Running;
        Ok(())
    }

    /// Mark the service as stopping
    pub fn mark_stopping(&mut self) -> Result<(), DomainError> {
        if !self.state.can_transition_to(ServiceState::Stopping) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: "stopping".to_string(),
            });
        }

        self.state = ServiceState::Stopping;
        Ok(())
    }

    /// Mark the service as stopped and drop the process fields
    pub fn mark_stopped(&mut self) -> Result<(), DomainError> {
        if !self.state.can_transition_to(ServiceState::Stopped) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: "stopped".to_string(),
            });
        }

        self.state = ServiceState::Stopped;
        self.pid = None;
        self.assigned_ports.clear();
        self.started_at = None;
        self.stopped_at = Some(epoch_secs());
        Ok(())
    }

    /// Mark the service as failed and drop the process fields
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        if !self.state.can_transition_to(ServiceState::Failed) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: "failed".to_string(),
            });
        }

        self.state = ServiceState::Failed;
        self.last_error = Some(reason.into());
        self.pid = None;
        self.assigned_ports.clear();
        self.started_at = None;
        self.stopped_at = Some(epoch_secs());
        Ok(())
    }

    /// Mark the service as broken by a bad manifest
    pub fn mark_error(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        if !self.state.can_transition_to(ServiceState::Error) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: "error".to_string(),
            });
        }

        self.state = ServiceState::Error;
        self.last_error = Some(reason.into());
        Ok(())
    }

    /// Record a problem without changing state
    pub fn note_error(&mut self, reason: impl Into<String>) {
        self.last_error = Some(reason.into());
    }

    /// Record the most recent health verdict
    pub fn record_health(&mut self, verdict: HealthVerdict) {
        self.health = Some(verdict);
    }
}
