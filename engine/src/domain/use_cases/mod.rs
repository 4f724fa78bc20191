//! Use cases — one per operation the engine exposes
//!
//! Each use case is a trait with a single `execute` so transports and
//! tests can swap implementations; the provided implementations thread
//! the call through the domain services.

pub mod get_service_status;
pub mod list_services;
pub mod refresh_manifest;
pub mod resolve_conflicts;
pub mod restart_service;
pub mod scan_services;
pub mod start_service;
pub mod stop_service;

pub use get_service_status::{GetServiceStatus, GetServiceStatusUseCase};
pub use list_services::{ListServices, ListServicesUseCase};
pub use refresh_manifest::{RefreshManifest, RefreshManifestUseCase};
pub use resolve_conflicts::{ResolveConflicts, ResolveConflictsUseCase};
pub use restart_service::{RestartService, RestartServiceUseCase};
pub use scan_services::{ScanServices, ScanServicesUseCase};
pub use start_service::{StartService, StartServiceUseCase};
pub use stop_service::{StopService, StopServiceUseCase};
