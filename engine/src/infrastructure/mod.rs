//! Infrastructure Layer
//!
//! This module contains the adapters that implement the ports defined in the domain layer.
//! These are the "driven adapters" (infrastructure implementations).
//!
//! ## Adapters
//!
//! - `TokioProcessLauncher`: Real process spawning and signalling using tokio
//! - `InMemoryServiceRepository`: Thread-safe in-memory service registry
//! - `HttpHealthProber`: Blocking HTTP health probes behind the async port
//! - `TcpPortScanner`: OS-level port availability checks via bind attempts
//! - `FsServiceDiscovery`: Service candidate discovery over root folders
//! - `TemplateManifestAuthor`: Manifest drafting from folder contents
//! - `ProcResourceSampler`: Machine utilization snapshots
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sa_engine::infrastructure::{InMemoryServiceRepository, TokioProcessLauncher};
//! use std::sync::Arc;
//!
//! // Create real infrastructure
//! let launcher = Arc::new(TokioProcessLauncher::new());
//! let repository = Arc::new(InMemoryServiceRepository::new());
//!
//! // Wire into the application...
//! ```

pub mod config;
pub mod fs_discovery;
pub mod http_prober;
pub mod in_memory_repository;
pub mod machine_identity;
pub mod proc_resource_sampler;
pub mod tcp_port_scanner;
pub mod template_manifest_author;
pub mod tokio_launcher;

pub use config::AgentConfig;
pub use fs_discovery::FsServiceDiscovery;
pub use http_prober::HttpHealthProber;
pub use in_memory_repository::InMemoryServiceRepository;
pub use machine_identity::MachineIdentity;
pub use proc_resource_sampler::ProcResourceSampler;
pub use tcp_port_scanner::TcpPortScanner;
pub use template_manifest_author::TemplateManifestAuthor;
pub use tokio_launcher::TokioProcessLauncher;
