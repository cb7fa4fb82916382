//! `workforce-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by every other crate
//! in the workspace (no storage, no authorization policy).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{DepartmentId, EmployeeId};
pub use value_object::ValueObject;
