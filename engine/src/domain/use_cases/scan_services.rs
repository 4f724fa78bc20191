//! ScanServices use case

use crate::domain::services::ScanService;
use crate::domain::{DomainError, ScanServicesResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// Use case for reconciling the registry with the configured folders
#[async_trait]
pub trait ScanServices: Send + Sync {
    async fn execute(&self) -> Result<ScanServicesResponse, DomainError>;
}

/// Implementation of ScanServices use case
pub struct ScanServicesUseCase {
    scan: Arc<ScanService>,
}

impl ScanServicesUseCase {
    pub fn new(scan: Arc<ScanService>) -> Self {
        Self { scan }
    }
}

#[async_trait]
impl ScanServices for ScanServicesUseCase {
    async fn execute(&self) -> Result<ScanServicesResponse, DomainError> {
        self.scan.scan().await
    }
}
