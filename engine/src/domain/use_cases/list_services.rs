//! ListServices use case

use crate::domain::ports::ServiceRepository;
use crate::domain::{DomainError, ListServicesResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// Use case for listing the whole registry
#[async_trait]
pub trait ListServices: Send + Sync {
    async fn execute(&self) -> Result<ListServicesResponse, DomainError>;
}

/// Implementation of ListServices use case
pub struct ListServicesUseCase {
    repository: Arc<dyn ServiceRepository>,
}

impl ListServicesUseCase {
    pub fn new(repository: Arc<dyn ServiceRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl ListServices for ListServicesUseCase {
    async fn execute(&self) -> Result<ListServicesResponse, DomainError> {
        let mut services = self.repository.find_all().await?;
        services.sort_by(|a, b| a.id().cmp(b.id()));

        Ok(ListServicesResponse { services })
    }
}
