//! ResourceSampler port
//! Interface for sampling machine utilization

use crate::domain::{DomainError, ResourceSnapshot};
use async_trait::async_trait;

/// Port for machine resource sampling
#[async_trait]
pub trait ResourceSampler: Send + Sync {
    /// Take a point-in-time snapshot of machine utilization
    async fn sample(&self) -> Result<ResourceSnapshot, DomainError>;
}
