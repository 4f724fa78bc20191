//! Driving Adapters Layer
//!
//! This module contains the "driving" or "primary" adapters.
//! These adapters drive the application by accepting external requests and translating
//! them into domain commands/queries.
//!
//! ## Available Adapters
//!
//! - **REST**: the agent HTTP API with JSON, served over TCP or a Unix socket
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sa_engine::application::Application;
//! use sa_engine::adapters::rest::build_router;
//! use sa_engine::infrastructure::{AgentConfig, MachineIdentity};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! // Wire the agent
//! let identity = MachineIdentity::detect();
//! let config = AgentConfig::default();
//! let app = Arc::new(Application::with_os_adapters(config, identity));
//!
//! // Setup the REST adapter
//! let router = build_router(app);
//! # }
//! ```

pub mod rest;
