//! Manifest Store Service
//! Loads, validates and persists capability manifests

use crate::domain::constants::MANIFEST_FILE_NAME;
use crate::domain::entities::ServiceRecord;
use crate::domain::ports::{ManifestAuthor, ServiceRepository};
use crate::domain::value_objects::{Manifest, ServiceId, ServiceState};
use crate::domain::{DomainError, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Service owning every read and write of manifest files
///
/// All writes go through validation, so a malformed manifest can never
/// replace a working one on disk or in a record. Regeneration is
/// explicit only; nothing here generates a manifest behind a caller's
/// back.
pub struct ManifestStoreService {
    repository: Arc<dyn ServiceRepository>,
    author: Arc<dyn ManifestAuthor>,
}

impl ManifestStoreService {
    pub fn new(repository: Arc<dyn ServiceRepository>, author: Arc<dyn ManifestAuthor>) -> Self {
        Self { repository, author }
    }

    /// Read and validate the manifest file in a service folder
    ///
    /// Absence is not an error; a present-but-invalid file is.
    pub fn load_from_folder(location: &Path) -> Result<Option<Manifest>> {
        let path = location.join(MANIFEST_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|e| {
            DomainError::Io(format!(
                "Failed to read manifest file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(Some(Manifest::parse(&text)?))
    }

    /// Load the folder's manifest into a record, tracking validity in state
    ///
    /// A valid manifest promotes discovered and error records to ready.
    /// An invalid one puts a manifest-less record into error; a record
    /// that already carries a working manifest keeps it and only notes
    /// the failure.
    pub fn hydrate(record: &mut ServiceRecord) {
        match Self::load_from_folder(record.location()) {
            Ok(Some(manifest)) => {
                record.attach_manifest(manifest);
                if matches!(
                    record.state(),
                    ServiceState::Discovered | ServiceState::Error
                ) {
                    if let Err(e) = record.mark_ready() {
                        warn!(service = %record.id(), error = %e, "Could not promote service to ready");
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(service = %record.id(), error = %e, "Manifest failed validation");
                if record.manifest().is_some() {
                    record.note_error(e.to_string());
                } else if let Err(te) = record.mark_error(e.to_string()) {
                    warn!(service = %record.id(), error = %te, "Could not mark service in error");
                }
            }
        }
    }

    /// Validate manifest text and persist it for a service
    ///
    /// Rejection leaves both the record and the on-disk file untouched.
    pub async fn store(&self, id: &ServiceId, text: &str) -> Result<Manifest> {
        let mut record = self.repository.get(id).await?;
        let manifest = Manifest::parse(text)?;

        let path = record.location().join(MANIFEST_FILE_NAME);
        fs::write(&path, manifest.raw()).map_err(|e| {
            DomainError::Io(format!(
                "Failed to write manifest file '{}': {}",
                path.display(),
                e
            ))
        })?;

        record.attach_manifest(manifest.clone());
        if matches!(
            record.state(),
            ServiceState::Discovered | ServiceState::Error
        ) {
            record.mark_ready()?;
        }
        self.repository.save(record).await?;

        info!(service = %id, "Capability manifest stored");
        Ok(manifest)
    }

    /// Regenerate a service's manifest through the authoring backend
    ///
    /// The new manifest replaces the old one wholesale once it passes
    /// validation. On failure the prior manifest stays in force and the
    /// failure is recorded on the service.
    pub async fn refresh(&self, id: &ServiceId) -> Result<()> {
        let record = self.repository.get(id).await?;
        let location = record.location().to_path_buf();
        info!(
            service = %id,
            location = %location.display(),
            "Regenerating capability manifest"
        );

        let outcome = match self.author.generate(id, &location).await {
            Ok(text) => self.store(id, &text).await.map(|_| ()),
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            warn!(service = %id, error = %e, "Manifest regeneration failed");
            let mut record = self.repository.get(id).await?;
            if record.manifest().is_some() {
                record.note_error(e.to_string());
            } else {
                record.mark_error(e.to_string())?;
            }
            self.repository.save(record).await?;
        }

        outcome
    }
}
