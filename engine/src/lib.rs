//! Service agent engine
//!
//! Supervises a fleet of independently started local services on one
//! machine: a registry with a strict lifecycle state machine, band-based
//! port allocation persisted in each service's `.env`, process
//! supervision with readiness gating, periodic health probing and a
//! manifest store describing what each service can do.
//!
//! The crate is laid out hexagonally:
//! - [`domain`] — entities, value objects, ports and the domain services
//! - [`application`] — the composition root ([`Application`])
//! - [`infrastructure`] — OS-backed implementations of the ports
//! - [`adapters`] — the HTTP API driving the application

pub mod adapters;
pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::Application;
pub use domain::{DomainError, Result};
