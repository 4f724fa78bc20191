//! ResolveConflicts use case

use crate::domain::services::PortConflictService;
use crate::domain::{DomainError, ResolveConflictsResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// Use case for settling configured-port conflicts
#[async_trait]
pub trait ResolveConflicts: Send + Sync {
    async fn execute(&self) -> Result<ResolveConflictsResponse, DomainError>;
}

/// Implementation of ResolveConflicts use case
pub struct ResolveConflictsUseCase {
    conflicts: Arc<PortConflictService>,
}

impl ResolveConflictsUseCase {
    pub fn new(conflicts: Arc<PortConflictService>) -> Self {
        Self { conflicts }
    }
}

#[async_trait]
impl ResolveConflicts for ResolveConflictsUseCase {
    async fn execute(&self) -> Result<ResolveConflictsResponse, DomainError> {
        self.conflicts.resolve().await
    }
}
