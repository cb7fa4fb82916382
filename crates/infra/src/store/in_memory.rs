use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use workforce_auth::{Principal, PrincipalId, RoleToken};
use workforce_core::{DepartmentId, EmployeeId};
use workforce_directory::{Department, Employee, EmployeePredicate};

use super::{Change, Changeset, DirectoryStore, PrincipalSnapshot, StoreError};

#[derive(Debug, Clone, Default)]
struct DirectoryState {
    roles: BTreeSet<RoleToken>,
    principals: HashMap<PrincipalId, Principal>,
    /// Insertion order is the storage order reported by queries.
    employees: Vec<Employee>,
    departments: Vec<Department>,
}

impl DirectoryState {
    fn employee_index(&self, id: EmployeeId) -> Option<usize> {
        self.employees.iter().position(|e| e.id == id)
    }

    fn department_mut(&mut self, id: DepartmentId) -> Result<&mut Department, StoreError> {
        self.departments
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::Missing(format!("department {id}")))
    }

    fn require_department(&self, id: DepartmentId) -> Result<(), StoreError> {
        if self.departments.iter().any(|d| d.id == id) {
            Ok(())
        } else {
            Err(StoreError::Missing(format!("department {id}")))
        }
    }

    /// Mirrors the relational constraints of the Postgres schema.
    fn apply(&mut self, change: Change) -> Result<(), StoreError> {
        match change {
            Change::InsertPrincipal(principal) => {
                if self.principals.contains_key(&principal.id) {
                    return Err(StoreError::DuplicatePrincipal(principal.id));
                }
                if let Some(role) = principal.roles.iter().find(|r| !self.roles.contains(r)) {
                    return Err(StoreError::Missing(format!("role {role}")));
                }
                self.principals.insert(principal.id.clone(), principal);
            }
            Change::DeletePrincipal(id) => {
                if self.departments.iter().any(|d| d.is_managed_by(&id)) {
                    return Err(StoreError::Backend(format!(
                        "principal '{id}' is still referenced as a department manager"
                    )));
                }
                if self.employees.iter().any(|e| e.principal_id == id) {
                    return Err(StoreError::Backend(format!(
                        "principal '{id}' is still owned by an employee"
                    )));
                }
                self.principals
                    .remove(&id)
                    .ok_or_else(|| StoreError::Missing(format!("principal '{id}'")))?;
            }
            Change::InsertEmployee(employee) => {
                if !self.principals.contains_key(&employee.principal_id) {
                    return Err(StoreError::Missing(format!("principal '{}'", employee.principal_id)));
                }
                self.require_department(employee.department_id)?;
                if self.employees.iter().any(|e| e.principal_id == employee.principal_id) {
                    return Err(StoreError::DuplicatePrincipal(employee.principal_id));
                }
                if self.employee_index(employee.id).is_some() {
                    return Err(StoreError::Backend(format!("employee id {} reused", employee.id)));
                }
                self.employees.push(employee);
            }
            Change::UpdateEmployee(employee) => {
                self.require_department(employee.department_id)?;
                let idx = self
                    .employee_index(employee.id)
                    .ok_or_else(|| StoreError::Missing(format!("employee {}", employee.id)))?;
                self.employees[idx] = employee;
            }
            Change::DeleteEmployee(id) => {
                let idx = self
                    .employee_index(id)
                    .ok_or_else(|| StoreError::Missing(format!("employee {id}")))?;
                self.employees.remove(idx);
            }
            Change::InsertDepartment(department) => {
                if self.departments.iter().any(|d| d.name == department.name) {
                    return Err(StoreError::DuplicateDepartmentName(department.name));
                }
                self.departments.push(department);
            }
            Change::ClaimManager {
                department,
                principal,
            } => {
                if !self.principals.contains_key(&principal) {
                    return Err(StoreError::Missing(format!("principal '{principal}'")));
                }
                // Unique manager column: one department per principal.
                if self
                    .departments
                    .iter()
                    .any(|d| d.id != department && d.is_managed_by(&principal))
                {
                    return Err(StoreError::ManagerConflict(department));
                }
                let target = self.department_mut(department)?;
                if target.has_manager() {
                    return Err(StoreError::ManagerConflict(department));
                }
                target.manager = Some(principal);
            }
            Change::ReleaseManager {
                department,
                principal,
            } => {
                if let Some(target) = self.departments.iter_mut().find(|d| d.id == department) {
                    if target.is_managed_by(&principal) {
                        target.manager = None;
                    }
                }
            }
        }
        Ok(())
    }
}

/// In-memory directory store.
///
/// Intended for tests/dev. Commits are serialised behind one write lock and
/// validated against a working copy, so a failing change leaves no trace.
#[derive(Debug)]
pub struct InMemoryDirectoryStore {
    state: RwLock<DirectoryState>,
}

impl Default for InMemoryDirectoryStore {
    fn default() -> Self {
        Self::with_roles(RoleToken::KNOWN)
    }
}

impl InMemoryDirectoryStore {
    /// A store with every known role registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with only `roles` registered.
    pub fn with_roles<I>(roles: I) -> Self
    where
        I: IntoIterator<Item = RoleToken>,
    {
        let state = DirectoryState {
            roles: roles.into_iter().filter(RoleToken::is_known).collect(),
            ..DirectoryState::default()
        };
        Self {
            state: RwLock::new(state),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&DirectoryState) -> T) -> Result<T, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(f(&state))
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    async fn find_principal(&self, id: &PrincipalId) -> Result<Option<Principal>, StoreError> {
        self.read(|s| s.principals.get(id).cloned())
    }

    async fn find_role(&self, role: RoleToken) -> Result<Option<RoleToken>, StoreError> {
        self.read(|s| s.roles.get(&role).copied())
    }

    async fn find_employee(&self, id: EmployeeId) -> Result<Option<Employee>, StoreError> {
        self.read(|s| s.employees.iter().find(|e| e.id == id).cloned())
    }

    async fn find_employee_by_principal(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<Employee>, StoreError> {
        self.read(|s| s.employees.iter().find(|e| &e.principal_id == principal).cloned())
    }

    async fn find_department(&self, id: DepartmentId) -> Result<Option<Department>, StoreError> {
        self.read(|s| s.departments.iter().find(|d| d.id == id).cloned())
    }

    async fn find_department_by_manager(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<Department>, StoreError> {
        self.read(|s| s.departments.iter().find(|d| d.is_managed_by(principal)).cloned())
    }

    async fn list_departments(&self) -> Result<Vec<Department>, StoreError> {
        self.read(|s| s.departments.clone())
    }

    async fn principal_snapshot(
        &self,
        id: &PrincipalId,
    ) -> Result<Option<PrincipalSnapshot>, StoreError> {
        self.read(|s| {
            s.principals.get(id).map(|principal| PrincipalSnapshot {
                principal: principal.clone(),
                owned_employee: s.employees.iter().find(|e| &e.principal_id == id).cloned(),
                managed_department: s.departments.iter().find(|d| d.is_managed_by(id)).cloned(),
            })
        })
    }

    async fn query_employees(
        &self,
        predicate: &EmployeePredicate,
    ) -> Result<Vec<Employee>, StoreError> {
        self.read(|s| predicate.filter(&s.employees))
    }

    async fn commit(&self, changeset: Changeset) -> Result<(), StoreError> {
        if changeset.is_empty() {
            return Ok(());
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        let mut working = state.clone();
        for change in changeset.into_changes() {
            working.apply(change)?;
        }
        *state = working;
        Ok(())
    }
}
