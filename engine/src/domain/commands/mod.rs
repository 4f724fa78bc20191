//! Command objects accepted by the use case layer

pub mod refresh_manifest;
pub mod restart_service;
pub mod resolve_conflicts;
pub mod scan_services;
pub mod start_service;
pub mod stop_service;

pub use refresh_manifest::{RefreshManifestCommand, RefreshManifestResponse};
pub use restart_service::{RestartServiceCommand, RestartServiceResponse};
pub use resolve_conflicts::{PortChange, PortConflict, ResolveConflictsResponse};
pub use scan_services::ScanServicesResponse;
pub use start_service::{StartServiceCommand, StartServiceResponse};
pub use stop_service::{StopServiceCommand, StopServiceResponse};
