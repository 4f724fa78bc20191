//! ServiceDiscovery port
//! Interface for finding service folders on disk

use crate::domain::{DomainError, ServiceId};
use async_trait::async_trait;
use std::path::PathBuf;

/// One folder that looks like a service
#[derive(Debug, Clone)]
pub struct ServiceCandidate {
    pub id: ServiceId,
    /// Folder name before sanitization, kept for log messages
    pub folder_name: String,
    pub location: PathBuf,
}

/// Port for filesystem discovery of service folders
#[async_trait]
pub trait ServiceDiscovery: Send + Sync {
    /// List folders that qualify as service candidates
    async fn list_candidates(&self) -> Result<Vec<ServiceCandidate>, DomainError>;
}
