//! Scan Service
//! Reconciles the registry with the service folders on disk

use crate::domain::commands::ScanServicesResponse;
use crate::domain::entities::ServiceRecord;
use crate::domain::ports::{ServiceDiscovery, ServiceRepository};
use crate::domain::services::{LifecycleService, ManifestStoreService};
use crate::domain::value_objects::ServiceId;
use crate::domain::Result;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Service keeping the registry in step with the filesystem
///
/// A scan is a merge, not a rebuild: new folders are registered,
/// known inactive services are re-read from disk, and records whose
/// folder disappeared are dropped. Active services are never touched
/// by a scan; their folder going away mid-run is dealt with when they
/// stop.
pub struct ScanService {
    repository: Arc<dyn ServiceRepository>,
    discovery: Arc<dyn ServiceDiscovery>,
    lifecycle: Arc<LifecycleService>,
}

impl ScanService {
    pub fn new(
        repository: Arc<dyn ServiceRepository>,
        discovery: Arc<dyn ServiceDiscovery>,
        lifecycle: Arc<LifecycleService>,
    ) -> Self {
        Self {
            repository,
            discovery,
            lifecycle,
        }
    }

    /// Walk the configured folders and merge what they hold
    pub async fn scan(&self) -> Result<ScanServicesResponse> {
        let candidates = self.discovery.list_candidates().await?;
        let known: HashMap<ServiceId, ServiceRecord> = self
            .repository
            .find_all()
            .await?
            .into_iter()
            .map(|record| (record.id().clone(), record))
            .collect();

        let mut seen: BTreeSet<ServiceId> = BTreeSet::new();
        let mut added = 0;
        let mut refreshed = 0;

        for candidate in candidates {
            seen.insert(candidate.id.clone());
            match known.get(&candidate.id) {
                Some(record) if record.is_active() => {
                    debug!(service = %candidate.id, "Skipping active service during scan");
                }
                Some(record) => {
                    let mut record = record.clone();
                    ManifestStoreService::hydrate(&mut record);
                    self.repository.save(record).await?;
                    refreshed += 1;
                }
                None => {
                    let mut record =
                        ServiceRecord::discovered(candidate.id.clone(), candidate.location.clone());
                    ManifestStoreService::hydrate(&mut record);
                    info!(
                        service = %candidate.id,
                        folder = %candidate.folder_name,
                        location = %candidate.location.display(),
                        state = %record.state(),
                        "Discovered service"
                    );
                    self.repository.save(record).await?;
                    added += 1;
                }
            }
        }

        let mut removed = 0;
        for (id, record) in &known {
            if seen.contains(id) || record.is_active() {
                continue;
            }
            self.repository.remove(id).await?;
            self.lifecycle.drop_logs(id);
            info!(service = %id, "Dropped service whose folder disappeared");
            removed += 1;
        }

        let total = self.repository.find_all().await?.len();
        info!(
            added = added,
            refreshed = refreshed,
            removed = removed,
            total = total,
            "Scan complete"
        );
        Ok(ScanServicesResponse {
            added,
            refreshed,
            removed,
            total,
        })
    }
}
