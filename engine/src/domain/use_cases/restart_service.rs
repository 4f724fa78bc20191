//! RestartService use case
//! Stop-then-start under one operation permit

use crate::domain::services::{LifecycleService, StartOptions};
use crate::domain::value_objects::ServiceId;
use crate::domain::{DomainError, RestartServiceCommand, RestartServiceResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// Use case for restarting a service
#[async_trait]
pub trait RestartService: Send + Sync {
    async fn execute(
        &self,
        command: RestartServiceCommand,
    ) -> Result<RestartServiceResponse, DomainError>;
}

/// Implementation of RestartService use case
pub struct RestartServiceUseCase {
    lifecycle: Arc<LifecycleService>,
}

impl RestartServiceUseCase {
    pub fn new(lifecycle: Arc<LifecycleService>) -> Self {
        Self { lifecycle }
    }
}

#[async_trait]
impl RestartService for RestartServiceUseCase {
    async fn execute(
        &self,
        command: RestartServiceCommand,
    ) -> Result<RestartServiceResponse, DomainError> {
        let id = ServiceId::new(&command.service);
        let options = StartOptions {
            port_overrides: command.ports,
            env_overrides: command.env,
            auto_ports: false,
        };

        let record = self.lifecycle.restart(&id, options).await?;

        Ok(RestartServiceResponse {
            service: id,
            state: record.state(),
            pid: record.pid(),
            ports: record.assigned_ports().clone(),
        })
    }
}
