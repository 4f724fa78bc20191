pub mod health;
pub mod manifest;
pub mod platform;
pub mod resources;
pub mod service_id;
pub mod service_state;

pub use health::{epoch_secs, HealthStatus, HealthVerdict};
pub use manifest::{
    ApiEndpoint, CapabilitiesSection, EndpointsSection, EnvVarSpec, Manifest, ManifestDoc,
    PortSpec, ResourceNeeds, RuntimeSection, ServiceSection, UiEndpoint,
};
pub use platform::{Platform, PortBand, PortBands, PortClass};
pub use resources::{CpuInfo, DiskInfo, GpuInfo, MemoryInfo, ResourceSnapshot};
pub use service_id::ServiceId;
pub use service_state::ServiceState;
