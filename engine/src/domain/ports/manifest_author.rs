//! ManifestAuthor port
//! Interface for drafting a manifest for a folder that has none

use crate::domain::{DomainError, ServiceId};
use async_trait::async_trait;
use std::path::Path;

/// Port for generating manifest text
///
/// Returns YAML text only; persisting and validating it is the
/// manifest store's job, so a bad draft can never land on disk as
/// the service's working manifest.
#[async_trait]
pub trait ManifestAuthor: Send + Sync {
    async fn generate(&self, id: &ServiceId, location: &Path) -> Result<String, DomainError>;
}
