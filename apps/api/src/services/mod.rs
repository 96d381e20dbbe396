//! Business logic services

pub mod permission_service;
pub mod schema_service;

pub use permission_service::PermissionService;
pub use schema_service::{SchemaError, SchemaValidationService};
