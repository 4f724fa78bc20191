//! RefreshManifest use case
//! Schedules manifest regeneration without blocking the caller

use crate::domain::ports::ServiceRepository;
use crate::domain::services::ManifestStoreService;
use crate::domain::value_objects::ServiceId;
use crate::domain::{DomainError, RefreshManifestCommand, RefreshManifestResponse};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Use case for regenerating a service's capability manifest
///
/// Authoring can take a while, so the work runs in a spawned task and
/// the caller only learns that it was accepted. The store records the
/// outcome on the service either way.
#[async_trait]
pub trait RefreshManifest: Send + Sync {
    async fn execute(
        &self,
        command: RefreshManifestCommand,
    ) -> Result<RefreshManifestResponse, DomainError>;
}

/// Implementation of RefreshManifest use case
pub struct RefreshManifestUseCase {
    repository: Arc<dyn ServiceRepository>,
    store: Arc<ManifestStoreService>,
}

impl RefreshManifestUseCase {
    pub fn new(repository: Arc<dyn ServiceRepository>, store: Arc<ManifestStoreService>) -> Self {
        Self { repository, store }
    }
}

#[async_trait]
impl RefreshManifest for RefreshManifestUseCase {
    async fn execute(
        &self,
        command: RefreshManifestCommand,
    ) -> Result<RefreshManifestResponse, DomainError> {
        let id = ServiceId::new(&command.service);
        // Reject unknown services before accepting any work
        self.repository.get(&id).await?;

        let store = self.store.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            // refresh() logs and records failures on the service itself
            if store.refresh(&task_id).await.is_ok() {
                debug!(service = %task_id, "Manifest regeneration finished");
            }
        });

        Ok(RefreshManifestResponse {
            service: id,
            scheduled: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::MANIFEST_FILE_NAME;
    use crate::domain::entities::ServiceRecord;
    use crate::domain::ports::{ManifestAuthor, MockRepository};
    use crate::domain::value_objects::ServiceState;
    use std::path::Path;
    use std::time::Duration;

    const GENERATED: &str = r#"
schema_version: "1.0"
service:
  name: Regenerated
runtime:
  start_command: python main.py
  ports:
    api:
      default: 8150
      env_var: API_PORT
endpoints:
  api:
    health_check: /health
"#;

    struct StubAuthor;

    #[async_trait]
    impl ManifestAuthor for StubAuthor {
        async fn generate(&self, _id: &ServiceId, _location: &Path) -> Result<String, DomainError> {
            Ok(GENERATED.to_string())
        }
    }

    #[tokio::test]
    async fn test_unknown_service_is_rejected_before_scheduling() {
        let repo = Arc::new(MockRepository::new());
        let store = Arc::new(ManifestStoreService::new(repo.clone(), Arc::new(StubAuthor)));
        let use_case = RefreshManifestUseCase::new(repo, store);

        let err = use_case
            .execute(RefreshManifestCommand::new("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ServiceNotFound(_)));
    }

    #[tokio::test]
    async fn test_regeneration_lands_on_the_record() {
        let scratch = tempfile::tempdir().unwrap();
        let repo = Arc::new(MockRepository::new());
        let store = Arc::new(ManifestStoreService::new(repo.clone(), Arc::new(StubAuthor)));
        let use_case = RefreshManifestUseCase::new(repo.clone(), store);

        let id = ServiceId::new("blank");
        repo.save(ServiceRecord::discovered(id.clone(), scratch.path().to_path_buf()))
            .await
            .unwrap();

        let response = use_case
            .execute(RefreshManifestCommand::new("blank"))
            .await
            .unwrap();
        assert!(response.scheduled);

        // The spawned task persists to disk and promotes the record
        for _ in 0..100 {
            if repo.get(&id).await.unwrap().state() == ServiceState::Ready {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let record = repo.get(&id).await.unwrap();
        assert_eq!(record.state(), ServiceState::Ready);
        assert!(record.manifest().is_some());
        assert!(scratch.path().join(MANIFEST_FILE_NAME).exists());
    }
}
