pub mod service;

pub use service::ServiceRecord;
