//! Error taxonomy exposed by the directory services.

use thiserror::Error;
use tracing::error;

use workforce_auth::{AuthzError, CredentialError, DenialReason, PrincipalId, RoleToken};
use workforce_core::{DepartmentId, DomainError, EmployeeId};

use crate::store::StoreError;

/// Every expected outcome is a typed variant; storage faults collapse into
/// the opaque `Infrastructure` variant after their detail has been logged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("principal '{0}' not found")]
    PrincipalNotFound(PrincipalId),

    #[error("role {0} is not registered")]
    RoleNotFound(RoleToken),

    #[error("department {0} not found")]
    DepartmentNotFound(DepartmentId),

    #[error("employee {0} not found")]
    EmployeeNotFound(EmployeeId),

    #[error("an account for '{0}' already exists")]
    DuplicateAccount(PrincipalId),

    #[error("department '{0}' already exists")]
    DuplicateDepartment(String),

    #[error("department {0} already has a manager")]
    ManagerAlreadyExists(DepartmentId),

    /// The reason is for logs; callers should only branch on the variant.
    #[error("access denied")]
    AccessDenied(DenialReason),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("infrastructure error")]
    Infrastructure,
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

impl From<StoreError> for DirectoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ManagerConflict(department) => DirectoryError::ManagerAlreadyExists(department),
            StoreError::DuplicatePrincipal(principal) => DirectoryError::DuplicateAccount(principal),
            StoreError::DuplicateDepartmentName(name) => DirectoryError::DuplicateDepartment(name),
            StoreError::Missing(detail) | StoreError::Backend(detail) => {
                error!(error = %detail, "storage failure");
                DirectoryError::Infrastructure
            }
        }
    }
}

impl From<DomainError> for DirectoryError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => DirectoryError::Validation(msg),
            DomainError::InvariantViolation(msg) => {
                error!(error = %msg, "domain invariant violated");
                DirectoryError::Infrastructure
            }
        }
    }
}

impl From<AuthzError> for DirectoryError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Denied(reason) => DirectoryError::AccessDenied(reason),
        }
    }
}

impl From<CredentialError> for DirectoryError {
    fn from(err: CredentialError) -> Self {
        error!(error = %err, "credential provisioning failed");
        DirectoryError::Infrastructure
    }
}
