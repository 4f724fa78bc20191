pub mod env_file;
pub mod exit_watch;
pub mod health_watch;
pub mod lifecycle;
pub mod manifest_store;
pub mod operation_gate;
pub mod port_allocator;
pub mod port_conflicts;
pub mod scan;

pub use env_file::EnvFileService;
pub use exit_watch::ExitWatchService;
pub use health_watch::HealthWatchService;
pub use lifecycle::{LifecycleConfig, LifecycleService, StartOptions};
pub use manifest_store::ManifestStoreService;
pub use operation_gate::{OperationGate, OperationPermit};
pub use port_allocator::PortAllocatorService;
pub use port_conflicts::PortConflictService;
pub use scan::ScanService;
