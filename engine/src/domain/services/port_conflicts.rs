//! Port Conflict Service
//! Detects and settles overlapping configured ports across services

use crate::domain::commands::{PortChange, PortConflict, ResolveConflictsResponse};
use crate::domain::entities::ServiceRecord;
use crate::domain::ports::ServiceRepository;
use crate::domain::services::{EnvFileService, PortAllocatorService};
use crate::domain::value_objects::{PortClass, ServiceId};
use crate::domain::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Audits the ports services are configured to use
///
/// "Configured" means the number a service would ask for on its next
/// start: the persisted `.env` value when present, the manifest
/// default otherwise. Live allocations are not consulted; this service
/// reasons about configuration files only, so it can run while
/// services are up without touching them.
pub struct PortConflictService {
    repository: Arc<dyn ServiceRepository>,
    allocator: Arc<PortAllocatorService>,
}

impl PortConflictService {
    pub fn new(
        repository: Arc<dyn ServiceRepository>,
        allocator: Arc<PortAllocatorService>,
    ) -> Self {
        Self {
            repository,
            allocator,
        }
    }

    /// Port each service is configured to claim, by logical name
    pub fn configured_ports(record: &ServiceRecord) -> BTreeMap<String, u16> {
        let manifest = match record.manifest() {
            Some(manifest) => manifest,
            None => return BTreeMap::new(),
        };
        let mut ports: BTreeMap<String, u16> = manifest
            .ports()
            .iter()
            .map(|(name, spec)| (name.clone(), spec.default))
            .collect();
        match EnvFileService::read_ports(record.location(), manifest) {
            Ok(persisted) => ports.extend(persisted),
            Err(e) => {
                warn!(
                    service = %record.id(),
                    error = %e,
                    "Could not read persisted ports for conflict audit"
                );
            }
        }
        ports
    }

    /// Point-in-time report of ports claimed by more than one service
    ///
    /// Services are walked in id order, so the reported `first`
    /// claimant is stable across runs. A service claiming the same
    /// port under two of its own names is its manifest author's
    /// problem, not a cross-service conflict, and is not reported.
    pub async fn find_conflicts(&self) -> Result<Vec<PortConflict>> {
        let mut services = self.repository.find_all().await?;
        services.sort_by(|a, b| a.id().cmp(b.id()));

        let mut owners: BTreeMap<u16, ServiceId> = BTreeMap::new();
        let mut conflicts = Vec::new();

        for record in &services {
            for (name, port) in Self::configured_ports(record) {
                match owners.get(&port) {
                    Some(first) if first != record.id() => {
                        conflicts.push(PortConflict {
                            first: first.clone(),
                            second: record.id().clone(),
                            port_name: name,
                            port,
                        });
                    }
                    Some(_) => {}
                    None => {
                        owners.insert(port, record.id().clone());
                    }
                }
            }
        }

        Ok(conflicts)
    }

    /// Move every later claimant of a contested port to a free one
    ///
    /// The first claimant in id order keeps its port; each later
    /// claimant is rewritten to the next free port of the same class
    /// and its `.env` updated so the move survives a restart. A
    /// claimant that cannot be moved (no env var to persist under, or
    /// the band ran dry) is left standing with a warning rather than
    /// failing the whole pass.
    pub async fn resolve(&self) -> Result<ResolveConflictsResponse> {
        let conflicts = self.find_conflicts().await?;
        if conflicts.is_empty() {
            return Ok(ResolveConflictsResponse::default());
        }

        let mut services = self.repository.find_all().await?;
        services.sort_by(|a, b| a.id().cmp(b.id()));

        let mut owners: BTreeMap<u16, ServiceId> = BTreeMap::new();
        let mut claimed: BTreeSet<u16> = BTreeSet::new();
        let mut changes: Vec<PortChange> = Vec::new();

        for record in &services {
            let manifest = match record.manifest() {
                Some(manifest) => manifest,
                None => continue,
            };
            for (name, port) in Self::configured_ports(record) {
                let contested = owners
                    .get(&port)
                    .map(|owner| owner != record.id())
                    .unwrap_or(false);
                if !contested {
                    owners.entry(port).or_insert_with(|| record.id().clone());
                    claimed.insert(port);
                    continue;
                }

                let persistable = manifest
                    .ports()
                    .get(&name)
                    .and_then(|spec| spec.env_var.as_deref())
                    .map(|var| !var.is_empty())
                    .unwrap_or(false);
                if !persistable {
                    warn!(
                        service = %record.id(),
                        port_name = %name,
                        port = port,
                        "Conflicting port has no env var to persist a move under"
                    );
                    continue;
                }

                let class = PortClass::from_port_name(&name);
                let replacement = match self.allocator.find_free_in_band(class, &claimed) {
                    Some(replacement) => replacement,
                    None => {
                        warn!(
                            service = %record.id(),
                            port_name = %name,
                            port = port,
                            "No free port left in band, conflict left standing"
                        );
                        continue;
                    }
                };

                let rewrite = BTreeMap::from([(name.clone(), replacement)]);
                if let Err(e) = EnvFileService::write_ports(record.location(), manifest, &rewrite) {
                    warn!(
                        service = %record.id(),
                        error = %e,
                        "Could not rewrite environment file during conflict resolution"
                    );
                    continue;
                }

                claimed.insert(replacement);
                owners.insert(replacement, record.id().clone());
                info!(
                    service = %record.id(),
                    port_name = %name,
                    from_port = port,
                    to_port = replacement,
                    "Moved conflicting port"
                );
                changes.push(PortChange {
                    service: record.id().clone(),
                    port_name: name,
                    from_port: port,
                    to_port: replacement,
                });
            }
        }

        Ok(ResolveConflictsResponse { conflicts, changes })
    }
}
