//! Filesystem Discovery
//! Folder-walking implementation of the ServiceDiscovery port

use crate::domain::constants::MANIFEST_FILE_NAME;
use crate::domain::ports::{ServiceCandidate, ServiceDiscovery};
use crate::domain::value_objects::ServiceId;
use crate::domain::DomainError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Files that mark a folder as a service candidate
const SERVICE_MARKERS: [&str; 4] = ["README.md", "main.py", "app.py", MANIFEST_FILE_NAME];

/// Discovers service folders under the configured roots
///
/// Folders whose names start with `.` or `_` are skipped, as are
/// folders without any marker file. When two folders sanitize to the
/// same id, the first one found wins and the duplicate is logged.
pub struct FsServiceDiscovery {
    roots: Vec<PathBuf>,
}

impl FsServiceDiscovery {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    fn is_candidate(folder: &std::path::Path) -> bool {
        SERVICE_MARKERS
            .iter()
            .any(|marker| folder.join(marker).is_file())
    }
}

#[async_trait]
impl ServiceDiscovery for FsServiceDiscovery {
    async fn list_candidates(&self) -> Result<Vec<ServiceCandidate>, DomainError> {
        let mut candidates: BTreeMap<ServiceId, ServiceCandidate> = BTreeMap::new();

        for root in &self.roots {
            let entries = match std::fs::read_dir(root) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        root = %root.display(),
                        error = %e,
                        "Could not read service folder root"
                    );
                    continue;
                }
            };

            for entry in entries.flatten() {
                let location = entry.path();
                if !location.is_dir() {
                    continue;
                }
                let folder_name = entry.file_name().to_string_lossy().into_owned();
                if folder_name.starts_with('.') || folder_name.starts_with('_') {
                    continue;
                }
                if !Self::is_candidate(&location) {
                    debug!(
                        folder = %folder_name,
                        "Skipping folder without service markers"
                    );
                    continue;
                }

                let id = match ServiceId::sanitize(&folder_name) {
                    Some(id) => id,
                    None => {
                        debug!(
                            folder = %folder_name,
                            "Folder name yields no usable service id, skipping"
                        );
                        continue;
                    }
                };
                match candidates.get(&id) {
                    Some(existing) => {
                        warn!(
                            service = %id,
                            kept = %existing.location.display(),
                            skipped = %location.display(),
                            "Duplicate service id across folders, keeping the first"
                        );
                    }
                    None => {
                        candidates.insert(
                            id.clone(),
                            ServiceCandidate {
                                id,
                                folder_name,
                                location,
                            },
                        );
                    }
                }
            }
        }

        Ok(candidates.into_values().collect())
    }
}
