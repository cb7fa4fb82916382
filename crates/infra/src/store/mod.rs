//! Directory storage boundary.
//!
//! One trait covers the credential store, the relational predicate executor
//! and atomic multi-entity writes. Writes are expressed as a [`Changeset`] of
//! guarded [`Change`]s that a backend applies all-or-nothing.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use workforce_auth::{Principal, PrincipalId, RoleToken};
use workforce_core::{DepartmentId, EmployeeId};
use workforce_directory::{Department, Employee, EmployeePredicate};

pub use in_memory::InMemoryDirectoryStore;
pub use postgres::PostgresDirectoryStore;

/// Storage failure.
///
/// The first four variants are constraint outcomes the orchestrator maps to
/// typed errors; `Backend` is everything else and is never shown to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("department {0} already has a manager")]
    ManagerConflict(DepartmentId),

    #[error("principal '{0}' already exists")]
    DuplicatePrincipal(PrincipalId),

    #[error("department name '{0}' is taken")]
    DuplicateDepartmentName(String),

    #[error("row missing at commit: {0}")]
    Missing(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// One guarded write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Fails with `DuplicatePrincipal` if the id is taken.
    InsertPrincipal(Principal),
    DeletePrincipal(PrincipalId),
    /// Fails with `DuplicatePrincipal` if another employee owns the principal.
    InsertEmployee(Employee),
    UpdateEmployee(Employee),
    DeleteEmployee(EmployeeId),
    /// Fails with `DuplicateDepartmentName` if the name is taken.
    InsertDepartment(Department),
    /// Applies only while `manager IS NULL`; otherwise `ManagerConflict`.
    ClaimManager {
        department: DepartmentId,
        principal: PrincipalId,
    },
    /// Clears the manager only while it equals `principal`; never fails on mismatch.
    ReleaseManager {
        department: DepartmentId,
        principal: PrincipalId,
    },
}

/// Ordered writes committed as one atomic unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    changes: Vec<Change>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }
}

/// Principal, owned employee and managed department, read together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalSnapshot {
    pub principal: Principal,
    pub owned_employee: Option<Employee>,
    pub managed_department: Option<Department>,
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn find_principal(&self, id: &PrincipalId) -> Result<Option<Principal>, StoreError>;

    /// `Some` iff `role` is registered in the role table.
    async fn find_role(&self, role: RoleToken) -> Result<Option<RoleToken>, StoreError>;

    async fn find_employee(&self, id: EmployeeId) -> Result<Option<Employee>, StoreError>;

    async fn find_employee_by_principal(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<Employee>, StoreError>;

    async fn find_department(&self, id: DepartmentId) -> Result<Option<Department>, StoreError>;

    async fn find_department_by_manager(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<Department>, StoreError>;

    async fn list_departments(&self) -> Result<Vec<Department>, StoreError>;

    /// Consistent read of everything an authorization decision needs.
    async fn principal_snapshot(
        &self,
        id: &PrincipalId,
    ) -> Result<Option<PrincipalSnapshot>, StoreError>;

    /// Rows matching `predicate`, in stable storage order.
    async fn query_employees(
        &self,
        predicate: &EmployeePredicate,
    ) -> Result<Vec<Employee>, StoreError>;

    /// Apply every change or none.
    async fn commit(&self, changeset: Changeset) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> DirectoryStore for Arc<S>
where
    S: DirectoryStore + ?Sized,
{
    async fn find_principal(&self, id: &PrincipalId) -> Result<Option<Principal>, StoreError> {
        (**self).find_principal(id).await
    }

    async fn find_role(&self, role: RoleToken) -> Result<Option<RoleToken>, StoreError> {
        (**self).find_role(role).await
    }

    async fn find_employee(&self, id: EmployeeId) -> Result<Option<Employee>, StoreError> {
        (**self).find_employee(id).await
    }

    async fn find_employee_by_principal(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<Employee>, StoreError> {
        (**self).find_employee_by_principal(principal).await
    }

    async fn find_department(&self, id: DepartmentId) -> Result<Option<Department>, StoreError> {
        (**self).find_department(id).await
    }

    async fn find_department_by_manager(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<Department>, StoreError> {
        (**self).find_department_by_manager(principal).await
    }

    async fn list_departments(&self) -> Result<Vec<Department>, StoreError> {
        (**self).list_departments().await
    }

    async fn principal_snapshot(
        &self,
        id: &PrincipalId,
    ) -> Result<Option<PrincipalSnapshot>, StoreError> {
        (**self).principal_snapshot(id).await
    }

    async fn query_employees(
        &self,
        predicate: &EmployeePredicate,
    ) -> Result<Vec<Employee>, StoreError> {
        (**self).query_employees(predicate).await
    }

    async fn commit(&self, changeset: Changeset) -> Result<(), StoreError> {
        (**self).commit(changeset).await
    }
}
