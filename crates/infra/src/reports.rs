use std::collections::HashMap;

use workforce_auth::Scope;
use workforce_core::DepartmentId;
use workforce_directory::report::{self, ReportRow};
use workforce_directory::{Department, Employee};

use crate::error::DirectoryResult;
use crate::search::ScopedSearchEngine;
use crate::store::DirectoryStore;

/// Aggregate reports over the employees visible under a scope.
#[derive(Debug, Clone)]
pub struct ReportService<S> {
    store: S,
    search: ScopedSearchEngine<S>,
}

impl<S: DirectoryStore + Clone> ReportService<S> {
    pub fn new(store: S) -> Self {
        Self {
            search: ScopedSearchEngine::new(store.clone()),
            store,
        }
    }

    pub async fn total_employees(&self, scope: &Scope) -> DirectoryResult<u64> {
        Ok(self.search.visible(scope).await?.len() as u64)
    }

    /// Headcount and salary per department; departments without visible staff are omitted.
    pub async fn employees_by_department(&self, scope: &Scope) -> DirectoryResult<Vec<ReportRow>> {
        self.department_rows(scope).await
    }

    pub async fn employees_by_job_title(&self, scope: &Scope) -> DirectoryResult<Vec<ReportRow>> {
        Ok(report::by_job_title(&self.search.visible(scope).await?))
    }

    pub async fn employees_by_gender(&self, scope: &Scope) -> DirectoryResult<Vec<ReportRow>> {
        Ok(report::by_gender(&self.search.visible(scope).await?))
    }

    /// Salary totals and averages for departments that have staff.
    pub async fn salary_by_department(&self, scope: &Scope) -> DirectoryResult<Vec<ReportRow>> {
        self.department_rows(scope).await
    }

    async fn department_rows(&self, scope: &Scope) -> DirectoryResult<Vec<ReportRow>> {
        let (staff, departments) = self.visible_with_departments(scope).await?;
        Ok(report::by_department(&staff, &names(&departments)))
    }

    async fn visible_with_departments(
        &self,
        scope: &Scope,
    ) -> DirectoryResult<(Vec<Employee>, Vec<Department>)> {
        let staff = self.search.visible(scope).await?;
        let departments = self
            .store
            .list_departments()
            .await?
            .into_iter()
            .filter(|d| scope.admits(d.id))
            .collect();
        Ok((staff, departments))
    }
}

fn names(departments: &[Department]) -> HashMap<DepartmentId, String> {
    departments.iter().map(|d| (d.id, d.name.clone())).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use workforce_auth::RoleToken;
    use workforce_directory::Gender;

    use super::*;
    use crate::lifecycle::EmployeeLifecycleOrchestrator;
    use crate::store::InMemoryDirectoryStore;
    use crate::testing::{PlaintextHasher, draft};

    #[tokio::test]
    async fn department_reports_omit_empty_departments() {
        let store = Arc::new(InMemoryDirectoryStore::new());
        let lifecycle = EmployeeLifecycleOrchestrator::new(store.clone(), PlaintextHasher);
        let eng = lifecycle.create_department("Engineering").await.unwrap();
        let archive = lifecycle.create_department("Archive").await.unwrap();
        for (first, salary) in [("Ann", 100), ("Ben", 201)] {
            lifecycle
                .create(draft(first, "Smith", "Engineer", Gender::Female, salary), RoleToken::Employee, eng.id)
                .await
                .unwrap();
        }
        let reports = ReportService::new(store);

        let headcount = reports.employees_by_department(&Scope::Unscoped).await.unwrap();
        assert_eq!(
            headcount.iter().map(|r| (r.label.as_str(), r.count)).collect::<Vec<_>>(),
            vec![("Engineering", 2)]
        );

        let salaries = reports.salary_by_department(&Scope::Unscoped).await.unwrap();
        assert_eq!(salaries.len(), 1);
        assert_eq!(salaries[0].total_salary, 301);
        assert_eq!(salaries[0].average_salary, 150);

        let archive_only = Scope::RestrictedToDepartment(archive.id);
        assert_eq!(reports.total_employees(&archive_only).await, Ok(0));
        assert!(reports.employees_by_department(&archive_only).await.unwrap().is_empty());
        assert!(reports.employees_by_gender(&archive_only).await.unwrap().is_empty());
    }
}
