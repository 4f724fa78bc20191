pub mod commands;
pub mod constants;
pub mod entities;
pub mod error;
pub mod ports;
pub mod queries;
pub mod services;
pub mod use_cases;
pub mod value_objects;

pub use commands::{
    PortChange, PortConflict, RefreshManifestCommand, RefreshManifestResponse,
    ResolveConflictsResponse, RestartServiceCommand, RestartServiceResponse, ScanServicesResponse,
    StartServiceCommand, StartServiceResponse, StopServiceCommand, StopServiceResponse,
};
pub use entities::ServiceRecord;
pub use error::{DomainError, Result};
pub use queries::{GetServiceStatusQuery, ListServicesResponse, ServiceStatusResponse};
pub use value_objects::{
    epoch_secs, HealthStatus, HealthVerdict, Manifest, Platform, PortBand, PortBands, PortClass,
    ResourceSnapshot, ServiceId, ServiceState,
};
