//! Multi-entity writes: employee create/update/delete and department creation.
//!
//! Every operation reads what it needs, builds one [`Changeset`] and commits
//! it atomically. Manager bindings go through [`crate::manager_invariant`].

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use workforce_auth::{CredentialHasher, Principal, PrincipalId, RoleToken, generate_initial_password};
use workforce_core::{DepartmentId, EmployeeId};
use workforce_directory::{Department, Employee, EmployeeDraft, EmployeePatch};

use crate::error::{DirectoryError, DirectoryResult};
use crate::manager_invariant::{claim_manager, release_manager_if_matches};
use crate::store::{Change, Changeset, DirectoryStore, StoreError};

/// Result of provisioning an employee and its account.
///
/// `initial_password` is the only copy of the plaintext; it is not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedEmployee {
    pub employee: Employee,
    pub principal_id: PrincipalId,
    pub initial_password: String,
}

#[derive(Debug, Clone)]
pub struct EmployeeLifecycleOrchestrator<S, H> {
    store: S,
    hasher: H,
}

impl<S, H> EmployeeLifecycleOrchestrator<S, H>
where
    S: DirectoryStore,
    H: CredentialHasher,
{
    pub fn new(store: S, hasher: H) -> Self {
        Self { store, hasher }
    }

    #[instrument(skip_all, fields(role = %role, department = %department_id), err)]
    pub async fn create(
        &self,
        draft: EmployeeDraft,
        role: RoleToken,
        department_id: DepartmentId,
    ) -> DirectoryResult<ProvisionedEmployee> {
        let today = today();
        draft.validate(today)?;

        let principal_id = draft.principal_id();
        if self.store.find_principal(&principal_id).await?.is_some() {
            warn!(principal = %principal_id, "account already exists");
            return Err(DirectoryError::DuplicateAccount(principal_id));
        }
        if !role.is_known() || self.store.find_role(role).await?.is_none() {
            return Err(DirectoryError::RoleNotFound(role));
        }
        let department = self
            .store
            .find_department(department_id)
            .await?
            .ok_or(DirectoryError::DepartmentNotFound(department_id))?;

        let initial_password = generate_initial_password();
        let principal = Principal {
            id: principal_id.clone(),
            credential: self.hasher.hash(&initial_password)?,
            roles: vec![role],
            must_reset_credential: true,
        };
        let employee = draft.into_employee(EmployeeId::new(), department.id, today)?;

        let mut changeset = Changeset::new();
        changeset.push(Change::InsertPrincipal(principal));
        changeset.push(Change::InsertEmployee(employee.clone()));
        if role == RoleToken::Manager {
            claim_manager(&mut changeset, &department, &principal_id)?;
        }

        self.store.commit(changeset).await.map_err(|err| match err {
            StoreError::Missing(_) => DirectoryError::DepartmentNotFound(department_id),
            other => other.into(),
        })?;

        info!(employee = %employee.id, principal = %principal_id, "employee created");
        Ok(ProvisionedEmployee {
            employee,
            principal_id,
            initial_password,
        })
    }

    /// Apply `patch`. Changing department never touches manager bindings.
    #[instrument(skip_all, fields(employee = %id), err)]
    pub async fn update(&self, id: EmployeeId, patch: EmployeePatch) -> DirectoryResult<Employee> {
        let current = self
            .store
            .find_employee(id)
            .await?
            .ok_or(DirectoryError::EmployeeNotFound(id))?;

        if let Some(department) = patch.department_id {
            if self.store.find_department(department).await?.is_none() {
                return Err(DirectoryError::DepartmentNotFound(department));
            }
        }

        let next = patch.apply(&current, today())?;

        let mut changeset = Changeset::new();
        changeset.push(Change::UpdateEmployee(next.clone()));
        self.store
            .commit(changeset)
            .await
            .map_err(|err| missing_as(err, DirectoryError::EmployeeNotFound(id)))?;

        info!(employee = %id, "employee updated");
        Ok(next)
    }

    /// Remove the employee, its account and any manager binding it holds.
    #[instrument(skip_all, fields(employee = %id), err)]
    pub async fn delete(&self, id: EmployeeId) -> DirectoryResult<()> {
        let employee = self
            .store
            .find_employee(id)
            .await?
            .ok_or(DirectoryError::EmployeeNotFound(id))?;
        let principal = &employee.principal_id;

        let mut changeset = Changeset::new();
        if let Some(department) = self.store.find_department_by_manager(principal).await? {
            release_manager_if_matches(&mut changeset, &department, principal);
        }
        changeset.push(Change::DeleteEmployee(id));
        if self.store.find_principal(principal).await?.is_some() {
            changeset.push(Change::DeletePrincipal(principal.clone()));
        }

        self.store
            .commit(changeset)
            .await
            .map_err(|err| missing_as(err, DirectoryError::EmployeeNotFound(id)))?;

        info!(employee = %id, principal = %principal, "employee deleted");
        Ok(())
    }

    /// Register an administrator account with no employee record, unless the
    /// principal already exists. Returns the one-time password when created.
    #[instrument(skip_all, fields(principal = %principal_id), err)]
    pub async fn ensure_admin(&self, principal_id: &PrincipalId) -> DirectoryResult<Option<String>> {
        if self.store.find_principal(principal_id).await?.is_some() {
            return Ok(None);
        }
        let initial_password = generate_initial_password();
        let mut changeset = Changeset::new();
        changeset.push(Change::InsertPrincipal(Principal {
            id: principal_id.clone(),
            credential: self.hasher.hash(&initial_password)?,
            roles: vec![RoleToken::Admin],
            must_reset_credential: true,
        }));
        self.store.commit(changeset).await?;

        info!(principal = %principal_id, "administrator provisioned");
        Ok(Some(initial_password))
    }

    /// New department without a manager.
    #[instrument(skip(self), err)]
    pub async fn create_department(&self, name: &str) -> DirectoryResult<Department> {
        let department = Department::new(DepartmentId::new(), name)?;

        let mut changeset = Changeset::new();
        changeset.push(Change::InsertDepartment(department.clone()));
        self.store.commit(changeset).await?;

        info!(department = %department.id, name = %department.name, "department created");
        Ok(department)
    }
}

fn missing_as(err: StoreError, not_found: DirectoryError) -> DirectoryError {
    match err {
        StoreError::Missing(_) => not_found,
        other => other.into(),
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
