//! `workforce-auth`: pure authorization boundary.
//!
//! Roles, principals and the per-operation access decision. This crate does
//! no storage access: callers resolve the facts (operative
//! role, owned employee, managed department) and hand them to [`decide`].

pub mod authorize;
pub mod context;
pub mod credential;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, Decision, DenialReason, Operation, Scope, Subject, decide};
pub use context::PrincipalContext;
pub use credential::{Argon2Hasher, CredentialError, CredentialHasher, generate_initial_password};
pub use principal::{CredentialHash, Principal, PrincipalId};
pub use roles::RoleToken;
