pub mod health_prober;
pub mod manifest_author;
pub mod mock_repository;
pub mod port_scanner;
pub mod process_launcher;
pub mod resource_sampler;
pub mod service_discovery;
pub mod service_repository;

pub use health_prober::{HealthProber, ProbeOutcome};
pub use manifest_author::ManifestAuthor;
pub use mock_repository::MockRepository;
pub use port_scanner::PortScanner;
pub use process_launcher::{
    ExitHandle, LaunchSpec, LaunchedProcess, LogBuffer, ProcessLauncher, StopOutcome,
};
pub use resource_sampler::ResourceSampler;
pub use service_discovery::{ServiceCandidate, ServiceDiscovery};
pub use service_repository::ServiceRepository;
