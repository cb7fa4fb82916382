use workforce_auth::PrincipalId;
use workforce_directory::{Department, Employee};

use crate::error::{DirectoryError, DirectoryResult};
use crate::store::{DirectoryStore, PrincipalSnapshot};

/// Read-only view of what a principal owns and manages.
#[derive(Debug, Clone)]
pub struct OwnershipIndex<S> {
    store: S,
}

impl<S: DirectoryStore> OwnershipIndex<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn employee_owned_by(&self, principal: &PrincipalId) -> DirectoryResult<Option<Employee>> {
        Ok(self.store.find_employee_by_principal(principal).await?)
    }

    pub async fn department_managed_by(
        &self,
        principal: &PrincipalId,
    ) -> DirectoryResult<Option<Department>> {
        Ok(self.store.find_department_by_manager(principal).await?)
    }

    /// Principal, owned employee and managed department from one consistent read.
    pub async fn snapshot(&self, principal: &PrincipalId) -> DirectoryResult<PrincipalSnapshot> {
        self.store
            .principal_snapshot(principal)
            .await?
            .ok_or_else(|| DirectoryError::PrincipalNotFound(principal.clone()))
    }
}
