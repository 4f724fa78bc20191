//! StartService use case
//! Admission, port allocation, launch and readiness in one operation

use crate::domain::services::{LifecycleService, StartOptions};
use crate::domain::value_objects::ServiceId;
use crate::domain::{DomainError, StartServiceCommand, StartServiceResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// Use case for starting a service
#[async_trait]
pub trait StartService: Send + Sync {
    async fn execute(
        &self,
        command: StartServiceCommand,
    ) -> Result<StartServiceResponse, DomainError>;
}

/// Implementation of StartService use case
pub struct StartServiceUseCase {
    lifecycle: Arc<LifecycleService>,
}

impl StartServiceUseCase {
    pub fn new(lifecycle: Arc<LifecycleService>) -> Self {
        Self { lifecycle }
    }
}

#[async_trait]
impl StartService for StartServiceUseCase {
    async fn execute(
        &self,
        command: StartServiceCommand,
    ) -> Result<StartServiceResponse, DomainError> {
        let id = ServiceId::new(&command.service);
        let options = StartOptions {
            port_overrides: command.ports,
            env_overrides: command.env,
            auto_ports: command.auto_ports,
        };

        let record = self.lifecycle.start(&id, options).await?;

        Ok(StartServiceResponse {
            service: id,
            state: record.state(),
            pid: record.pid(),
            ports: record.assigned_ports().clone(),
        })
    }
}
