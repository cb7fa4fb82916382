//! Infrastructure layer: storage backends, authorization wiring, the
//! employee lifecycle and the service facade.

pub mod authorizer;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod manager_invariant;
pub mod ownership;
pub mod reports;
pub mod role_resolver;
pub mod search;
pub mod service;
pub mod store;

#[cfg(test)]
mod testing;

pub use authorizer::{Authorization, Authorizer};
pub use config::{ConfigError, WorkforceConfig};
pub use error::{DirectoryError, DirectoryResult};
pub use lifecycle::{EmployeeLifecycleOrchestrator, ProvisionedEmployee};
pub use ownership::OwnershipIndex;
pub use reports::ReportService;
pub use role_resolver::RoleResolver;
pub use search::ScopedSearchEngine;
pub use service::WorkforceService;
pub use store::{DirectoryStore, InMemoryDirectoryStore, PostgresDirectoryStore, StoreError};
