//! Port Allocator Service
//! Band-scoped port assignment backed by an in-memory allocation table

use crate::domain::ports::PortScanner;
use crate::domain::value_objects::{Manifest, PortBands, PortClass, ServiceId};
use crate::domain::{DomainError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Live port assignments, held only while a service is active
///
/// `by_port` is the reverse index used for collision checks; the two
/// maps are updated together under the allocator lock.
#[derive(Default)]
struct AllocationTable {
    held: HashMap<ServiceId, BTreeMap<String, u16>>,
    by_port: HashMap<u16, ServiceId>,
}

impl AllocationTable {
    fn take(&mut self, id: ServiceId, name: String, port: u16) {
        self.by_port.insert(port, id.clone());
        self.held.entry(id).or_default().insert(name, port);
    }

    fn release_port(&mut self, port: u16) {
        if let Some(owner) = self.by_port.remove(&port) {
            if let Some(held) = self.held.get_mut(&owner) {
                held.retain(|_, p| *p != port);
                if held.is_empty() {
                    self.held.remove(&owner);
                }
            }
        }
    }
}

/// Service for assigning TCP ports to services from per-machine bands
///
/// Every declared port of a service is granted atomically: either all
/// names receive a usable port or the table is left untouched. A port
/// is usable when no other service holds it in the table and the OS
/// scanner reports it bindable. Explicitly requested ports (caller
/// overrides, persisted values, manifest defaults) are honored even
/// outside the band; only the automatic scan is band-scoped.
pub struct PortAllocatorService {
    scanner: Arc<dyn PortScanner>,
    bands: PortBands,
    table: Mutex<AllocationTable>,
}

impl PortAllocatorService {
    pub fn new(scanner: Arc<dyn PortScanner>, bands: PortBands) -> Self {
        Self {
            scanner,
            bands,
            table: Mutex::new(AllocationTable::default()),
        }
    }

    pub fn bands(&self) -> PortBands {
        self.bands
    }

    /// Assign a port to every declared port of the manifest
    ///
    /// Candidate order per port name: a port already held by this
    /// service for the same name is reused as-is, then the caller
    /// override, the persisted value, the manifest default, and
    /// finally an upward scan through the class band. Exhausting the
    /// band rolls back every port taken by this call.
    pub fn allocate(
        &self,
        id: &ServiceId,
        manifest: &Manifest,
        overrides: &BTreeMap<String, u16>,
        persisted: &BTreeMap<String, u16>,
    ) -> Result<BTreeMap<String, u16>> {
        let mut table = self.table.lock().unwrap();
        let mut granted: BTreeMap<String, u16> = BTreeMap::new();
        let mut taken_here: Vec<u16> = Vec::new();

        for (name, spec) in manifest.ports() {
            if let Some(port) = table.held.get(id).and_then(|held| held.get(name)).copied() {
                granted.insert(name.clone(), port);
                continue;
            }

            let class = PortClass::from_port_name(name);
            let band = self.bands.band_for(class);

            let mut candidates = Vec::new();
            if let Some(port) = overrides.get(name) {
                candidates.push(*port);
            }
            if let Some(port) = persisted.get(name) {
                candidates.push(*port);
            }
            candidates.push(spec.default);

            let chosen = candidates
                .into_iter()
                .find(|port| self.port_usable(&table, *port))
                .or_else(|| (band.start..=band.end).find(|port| self.port_usable(&table, *port)));

            match chosen {
                Some(port) => {
                    table.take(id.clone(), name.clone(), port);
                    taken_here.push(port);
                    granted.insert(name.clone(), port);
                }
                None => {
                    for port in taken_here {
                        table.release_port(port);
                    }
                    info!(
                        service = %id,
                        port_name = %name,
                        band = %band,
                        "Port allocation failed, band exhausted"
                    );
                    return Err(DomainError::PortRangeExhausted {
                        class: class.to_string(),
                        start: band.start,
                        end: band.end,
                    });
                }
            }
        }

        debug!(service = %id, ports = ?granted, "Allocated ports");
        Ok(granted)
    }

    /// Return every port the service holds to the pool
    ///
    /// Safe to call for a service that holds nothing.
    pub fn release(&self, id: &ServiceId) -> BTreeMap<String, u16> {
        let mut table = self.table.lock().unwrap();
        let released = table.held.remove(id).unwrap_or_default();
        for port in released.values() {
            table.by_port.remove(port);
        }
        if !released.is_empty() {
            debug!(service = %id, ports = ?released, "Released ports");
        }
        released
    }

    /// Ports currently held by one service
    pub fn held_ports(&self, id: &ServiceId) -> BTreeMap<String, u16> {
        self.table
            .lock()
            .unwrap()
            .held
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of the whole allocation table
    pub fn assignments(&self) -> BTreeMap<ServiceId, BTreeMap<String, u16>> {
        let table = self.table.lock().unwrap();
        table
            .held
            .iter()
            .map(|(id, ports)| (id.clone(), ports.clone()))
            .collect()
    }

    /// Plan in-band ports for every declared port without taking them
    ///
    /// Keeps the manifest default when it already sits inside the band
    /// and is usable, otherwise picks the first free in-band port.
    /// Used by automatic assignment, where out-of-band defaults should
    /// be pulled into this machine's slice of port space.
    pub fn plan_auto_ports(&self, manifest: &Manifest) -> BTreeMap<String, u16> {
        let table = self.table.lock().unwrap();
        let mut plan: BTreeMap<String, u16> = BTreeMap::new();
        let mut claimed: BTreeSet<u16> = BTreeSet::new();

        for (name, spec) in manifest.ports() {
            let class = PortClass::from_port_name(name);
            let band = self.bands.band_for(class);
            let usable = |port: u16| !claimed.contains(&port) && self.port_usable(&table, port);

            let chosen = if band.contains(spec.default) && usable(spec.default) {
                Some(spec.default)
            } else {
                (band.start..=band.end).find(|port| usable(*port))
            };

            if let Some(port) = chosen {
                claimed.insert(port);
                plan.insert(name.clone(), port);
            }
        }
        plan
    }

    /// First usable in-band port that is not in the avoid set
    pub fn find_free_in_band(&self, class: PortClass, avoid: &BTreeSet<u16>) -> Option<u16> {
        let table = self.table.lock().unwrap();
        let band = self.bands.band_for(class);
        (band.start..=band.end)
            .find(|port| !avoid.contains(port) && self.port_usable(&table, *port))
    }

    fn port_usable(&self, table: &AllocationTable, port: u16) -> bool {
        !table.by_port.contains_key(&port) && self.scanner.is_free(port)
    }
}
