//! Application Layer
//!
//! Holds the composition root that wires ports, domain services and use
//! cases into one `Application` value shared by every adapter.

pub mod registry;

pub use registry::Application;
