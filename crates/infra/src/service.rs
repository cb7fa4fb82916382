//! Facade exposing the directory operations to a boundary layer.
//!
//! Every call is authorized against the stored state of the requesting
//! principal before it is dispatched.

use tracing::{debug, instrument};

use workforce_auth::{
    CredentialHasher, Decision, DenialReason, Operation, PrincipalContext, PrincipalId, RoleToken, Scope,
};
use workforce_core::{DepartmentId, EmployeeId};
use workforce_directory::{Department, Employee, EmployeeDraft, EmployeePatch, ReportRow, SearchCriteria};

use crate::authorizer::{Authorization, Authorizer};
use crate::error::{DirectoryError, DirectoryResult};
use crate::lifecycle::{EmployeeLifecycleOrchestrator, ProvisionedEmployee};
use crate::reports::ReportService;
use crate::role_resolver::RoleResolver;
use crate::search::ScopedSearchEngine;
use crate::store::DirectoryStore;

#[derive(Debug, Clone)]
pub struct WorkforceService<S, H> {
    roles: RoleResolver<S>,
    authorizer: Authorizer<S>,
    search: ScopedSearchEngine<S>,
    reports: ReportService<S>,
    lifecycle: EmployeeLifecycleOrchestrator<S, H>,
}

impl<S, H> WorkforceService<S, H>
where
    S: DirectoryStore + Clone,
    H: CredentialHasher,
{
    pub fn new(store: S, hasher: H) -> Self {
        Self {
            roles: RoleResolver::new(store.clone()),
            authorizer: Authorizer::new(store.clone()),
            search: ScopedSearchEngine::new(store.clone()),
            reports: ReportService::new(store.clone()),
            lifecycle: EmployeeLifecycleOrchestrator::new(store, hasher),
        }
    }

    pub fn lifecycle(&self) -> &EmployeeLifecycleOrchestrator<S, H> {
        &self.lifecycle
    }

    pub async fn resolve_role(&self, principal: &PrincipalId) -> DirectoryResult<RoleToken> {
        self.roles.resolve_role(principal).await
    }

    pub async fn is_authorized(
        &self,
        principal: &PrincipalId,
        operation: &Operation,
    ) -> DirectoryResult<Decision> {
        self.authorizer.is_authorized(principal, operation).await
    }

    async fn authorize(&self, ctx: &PrincipalContext, operation: Operation) -> DirectoryResult<Authorization> {
        debug!(granted = ?ctx.granted_roles(), "stored roles take precedence over granted roles");
        self.authorizer.authorize(ctx.principal_id(), &operation).await
    }

    async fn scope_for(&self, ctx: &PrincipalContext, operation: Operation) -> DirectoryResult<Scope> {
        Ok(self.authorize(ctx, operation).await?.scope)
    }

    /// The caller's own employee record.
    #[instrument(skip_all, fields(principal = %ctx.principal_id()), err)]
    pub async fn profile(&self, ctx: &PrincipalContext) -> DirectoryResult<Employee> {
        let authorization = self.authorize(ctx, Operation::ReadOwnProfile).await?;
        // Allowed only with an owned record.
        authorization
            .snapshot
            .owned_employee
            .ok_or(DirectoryError::AccessDenied(DenialReason::NoOwnedRecord))
    }

    #[instrument(skip_all, fields(principal = %ctx.principal_id()), err)]
    pub async fn employee_by_id(&self, ctx: &PrincipalContext, id: EmployeeId) -> DirectoryResult<Employee> {
        let authorization = self.authorize(ctx, Operation::ReadById(id)).await?;
        authorization.target.ok_or(DirectoryError::EmployeeNotFound(id))
    }

    pub async fn list_employees(&self, ctx: &PrincipalContext) -> DirectoryResult<Vec<Employee>> {
        let scope = self.scope_for(ctx, Operation::ListAll).await?;
        self.search.visible(&scope).await
    }

    #[instrument(skip_all, fields(principal = %ctx.principal_id()), err)]
    pub async fn search(
        &self,
        ctx: &PrincipalContext,
        criteria: &SearchCriteria,
    ) -> DirectoryResult<Vec<Employee>> {
        let scope = self.scope_for(ctx, Operation::ListAll).await?;
        self.search.search(criteria, &scope).await
    }

    pub async fn create_employee(
        &self,
        ctx: &PrincipalContext,
        draft: EmployeeDraft,
        role: RoleToken,
        department_id: DepartmentId,
    ) -> DirectoryResult<ProvisionedEmployee> {
        self.authorize(ctx, Operation::CreateEmployee).await?;
        self.lifecycle.create(draft, role, department_id).await
    }

    pub async fn update_employee(
        &self,
        ctx: &PrincipalContext,
        id: EmployeeId,
        patch: EmployeePatch,
    ) -> DirectoryResult<Employee> {
        self.authorize(ctx, Operation::UpdateEmployee(id)).await?;
        self.lifecycle.update(id, patch).await
    }

    pub async fn delete_employee(&self, ctx: &PrincipalContext, id: EmployeeId) -> DirectoryResult<()> {
        self.authorize(ctx, Operation::DeleteEmployee(id)).await?;
        self.lifecycle.delete(id).await
    }

    pub async fn create_department(&self, ctx: &PrincipalContext, name: &str) -> DirectoryResult<Department> {
        self.authorize(ctx, Operation::CreateDepartment).await?;
        self.lifecycle.create_department(name).await
    }

    pub async fn total_employees(&self, ctx: &PrincipalContext) -> DirectoryResult<u64> {
        let scope = self.scope_for(ctx, Operation::Reports).await?;
        self.reports.total_employees(&scope).await
    }

    pub async fn employees_by_department(&self, ctx: &PrincipalContext) -> DirectoryResult<Vec<ReportRow>> {
        let scope = self.scope_for(ctx, Operation::Reports).await?;
        self.reports.employees_by_department(&scope).await
    }

    pub async fn employees_by_job_title(&self, ctx: &PrincipalContext) -> DirectoryResult<Vec<ReportRow>> {
        let scope = self.scope_for(ctx, Operation::Reports).await?;
        self.reports.employees_by_job_title(&scope).await
    }

    pub async fn employees_by_gender(&self, ctx: &PrincipalContext) -> DirectoryResult<Vec<ReportRow>> {
        let scope = self.scope_for(ctx, Operation::Reports).await?;
        self.reports.employees_by_gender(&scope).await
    }

    pub async fn salary_by_department(&self, ctx: &PrincipalContext) -> DirectoryResult<Vec<ReportRow>> {
        let scope = self.scope_for(ctx, Operation::Reports).await?;
        self.reports.salary_by_department(&scope).await
    }
}
