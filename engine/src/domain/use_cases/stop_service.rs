//! StopService use case

use crate::domain::services::LifecycleService;
use crate::domain::value_objects::ServiceId;
use crate::domain::{DomainError, StopServiceCommand, StopServiceResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// Use case for stopping a running service
#[async_trait]
pub trait StopService: Send + Sync {
    async fn execute(&self, command: StopServiceCommand)
        -> Result<StopServiceResponse, DomainError>;
}

/// Implementation of StopService use case
pub struct StopServiceUseCase {
    lifecycle: Arc<LifecycleService>,
}

impl StopServiceUseCase {
    pub fn new(lifecycle: Arc<LifecycleService>) -> Self {
        Self { lifecycle }
    }
}

#[async_trait]
impl StopService for StopServiceUseCase {
    async fn execute(
        &self,
        command: StopServiceCommand,
    ) -> Result<StopServiceResponse, DomainError> {
        let id = ServiceId::new(&command.service);
        let (record, outcome) = self.lifecycle.stop(&id).await?;

        Ok(StopServiceResponse {
            service: id,
            state: record.state(),
            outcome,
        })
    }
}
