//! Exit Watch Service
//! Event-driven detection of spontaneous service process exits

use crate::domain::ports::{ExitHandle, ServiceRepository};
use crate::domain::services::PortAllocatorService;
use crate::domain::value_objects::{ServiceId, ServiceState};
use crate::domain::Result;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Watches launched processes and records spontaneous exits
///
/// One watcher task per running process, driven by the launcher's exit
/// handle rather than polling. A watcher fires exactly once; planned
/// stops and superseded processes are recognized and ignored so the
/// stop and restart flows stay the single writers for those paths.
pub struct ExitWatchService {
    repository: Arc<dyn ServiceRepository>,
    allocator: Arc<PortAllocatorService>,
}

impl ExitWatchService {
    pub fn new(repository: Arc<dyn ServiceRepository>, allocator: Arc<PortAllocatorService>) -> Self {
        Self {
            repository,
            allocator,
        }
    }

    /// Spawn a task that waits for the process to exit
    ///
    /// Call after the service reached running; the readiness phase
    /// consumes exits itself before that.
    pub fn watch(self: &Arc<Self>, id: ServiceId, pid: u32, exit: ExitHandle) {
        let watcher = Arc::clone(self);
        tokio::spawn(async move {
            let code = match exit.await {
                Ok(code) => code,
                Err(e) => {
                    warn!(service = %id, pid = pid, error = %e, "Exit watcher lost the process");
                    return;
                }
            };
            if let Err(e) = watcher.handle_exit(&id, pid, code).await {
                error!(service = %id, error = %e, "Failed to record process exit");
            }
        });
    }

    async fn handle_exit(&self, id: &ServiceId, pid: u32, code: i32) -> Result<()> {
        let mut record = match self.repository.find_by_id(id).await? {
            Some(record) => record,
            None => {
                debug!(service = %id, pid = pid, "Service removed, ignoring exit");
                return Ok(());
            }
        };

        // A restart may already have replaced the process this watcher
        // was following
        if record.pid() != Some(pid) {
            debug!(
                service = %id,
                pid = pid,
                current_pid = ?record.pid(),
                "Exit from a superseded process, ignoring"
            );
            return Ok(());
        }

        match record.state() {
            ServiceState::Stopping | ServiceState::Stopped => {
                debug!(
                    service = %id,
                    pid = pid,
                    exit_code = code,
                    "Planned stop, exit handled by the stop flow"
                );
                Ok(())
            }
            ServiceState::Running => {
                warn!(
                    service = %id,
                    pid = pid,
                    exit_code = code,
                    "Service process exited unexpectedly"
                );
                record.mark_failed(format!("process exited with code {}", code))?;
                self.allocator.release(id);
                self.repository.save(record).await?;
                Ok(())
            }
            other => {
                debug!(
                    service = %id,
                    pid = pid,
                    state = %other,
                    "Exit in non-running state, ignoring"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ServiceRecord;
    use crate::domain::ports::{MockRepository, PortScanner};
    use crate::domain::value_objects::{Manifest, Platform, PortBands};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    struct FreeScanner;

    impl PortScanner for FreeScanner {
        fn is_free(&self, _port: u16) -> bool {
            true
        }
    }

    const MANIFEST: &str = r#"
schema_version: "1.0"
service:
  name: Watched
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

    fn watcher() -> (Arc<MockRepository>, Arc<PortAllocatorService>, Arc<ExitWatchService>) {
        let repo = Arc::new(MockRepository::new());
        let allocator = Arc::new(PortAllocatorService::new(
            Arc::new(FreeScanner),
            PortBands::for_machine("macos", Platform::Macos),
        ));
        let watch = Arc::new(ExitWatchService::new(repo.clone(), allocator.clone()));
        (repo, allocator, watch)
    }

    async fn running_record(
        repo: &MockRepository,
        allocator: &PortAllocatorService,
        name: &str,
        pid: u32,
    ) -> ServiceId {
        let id = ServiceId::new(name);
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let ports = allocator
            .allocate(&id, &manifest, &BTreeMap::new(), &BTreeMap::new())
            .unwrap();

        let mut record =
            ServiceRecord::with_manifest(id.clone(), PathBuf::from("/srv/watched"), manifest);
        record.mark_ready().unwrap();
        record.mark_starting(ports).unwrap();
        record.record_spawned(pid);
        record.mark_running().unwrap();
        repo.save(record).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_running_exit_marks_failed_and_releases_ports() {
        let (repo, allocator, watch) = watcher();
        let id = running_record(&repo, &allocator, "watched", 4242).await;

        watch.handle_exit(&id, 4242, 1).await.unwrap();

        let record = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(record.state(), ServiceState::Failed);
        assert_eq!(record.last_error(), Some("process exited with code 1"));
        assert!(record.assigned_ports().is_empty());
        assert!(record.pid().is_none());
        assert!(allocator.assignments().is_empty());
    }

    #[tokio::test]
    async fn test_planned_stop_is_ignored() {
        let (repo, allocator, watch) = watcher();
        let id = running_record(&repo, &allocator, "watched", 4242).await;

        let mut record = repo.find_by_id(&id).await.unwrap().unwrap();
        record.mark_stopping().unwrap();
        repo.save(record).await.unwrap();

        watch.handle_exit(&id, 4242, 0).await.unwrap();

        let record = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(record.state(), ServiceState::Stopping);
    }

    #[tokio::test]
    async fn test_exit_from_superseded_pid_is_ignored() {
        let (repo, allocator, watch) = watcher();
        let id = running_record(&repo, &allocator, "watched", 5001).await;

        // Watcher from an earlier incarnation reports a stale pid
        watch.handle_exit(&id, 4242, 137).await.unwrap();

        let record = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(record.state(), ServiceState::Running);
        assert!(!allocator.assignments().is_empty());
    }

    #[tokio::test]
    async fn test_exit_for_unknown_service_is_ignored() {
        let (_repo, _allocator, watch) = watcher();
        let id = ServiceId::new("gone");

        assert!(watch.handle_exit(&id, 4242, 0).await.is_ok());
    }

    #[tokio::test]
    async fn test_watch_task_records_exit() {
        let (repo, allocator, watch) = watcher();
        let id = running_record(&repo, &allocator, "watched", 4242).await;

        let exit: ExitHandle = Box::pin(async { Ok(9) });
        watch.watch(id.clone(), 4242, exit);

        // The watcher task runs on the same runtime, give it a beat
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let record = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(record.state(), ServiceState::Failed);
        assert_eq!(record.last_error(), Some("process exited with code 9"));
    }
}
