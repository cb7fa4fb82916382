use tracing::{debug, instrument};

use workforce_auth::Scope;
use workforce_directory::{Employee, EmployeePredicate, SearchCriteria};

use crate::error::DirectoryResult;
use crate::store::DirectoryStore;

/// Runs caller criteria restricted to an authorization scope.
#[derive(Debug, Clone)]
pub struct ScopedSearchEngine<S> {
    store: S,
}

impl<S: DirectoryStore> ScopedSearchEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Matching employees in storage order.
    ///
    /// An unknown department filter, or one that contradicts the scope,
    /// yields an empty result rather than an error.
    #[instrument(skip_all, fields(scope = ?scope), err)]
    pub async fn search(&self, criteria: &SearchCriteria, scope: &Scope) -> DirectoryResult<Vec<Employee>> {
        criteria.validate()?;

        if let Some(department) = criteria.department_id {
            if self.store.find_department(department).await?.is_none() {
                debug!(%department, "department filter names no department");
                return Ok(Vec::new());
            }
        }

        let predicate = EmployeePredicate::compose(criteria, scope);
        if predicate.is_unsatisfiable() {
            debug!("predicate is unsatisfiable");
            return Ok(Vec::new());
        }

        Ok(self.store.query_employees(&predicate).await?)
    }

    /// Everyone visible under `scope`.
    pub async fn visible(&self, scope: &Scope) -> DirectoryResult<Vec<Employee>> {
        Ok(self
            .store
            .query_employees(&EmployeePredicate::all().scoped(scope))
            .await?)
    }
}
