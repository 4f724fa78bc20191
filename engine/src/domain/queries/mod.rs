//! Domain Queries
//!
//! Read-only request and response shapes. Queries never mutate the
//! registry and carry no side effects.

mod get_service_status;
mod list_services;

pub use get_service_status::{GetServiceStatusQuery, ServiceStatusResponse};
pub use list_services::ListServicesResponse;
