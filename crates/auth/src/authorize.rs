use serde::Serialize;
use thiserror::Error;

use workforce_core::{DepartmentId, EmployeeId};

use crate::{PrincipalId, RoleToken};

/// Visibility restriction attached to an allow decision.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "department_id", rename_all = "snake_case")]
pub enum Scope {
    Unscoped,
    RestrictedToDepartment(DepartmentId),
}

impl Scope {
    /// Whether rows of `department` are visible under this scope.
    pub fn admits(&self, department: DepartmentId) -> bool {
        match self {
            Scope::Unscoped => true,
            Scope::RestrictedToDepartment(id) => *id == department,
        }
    }
}

/// A guarded operation together with its target reference.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", content = "target", rename_all = "snake_case")]
pub enum Operation {
    ReadOwnProfile,
    ReadById(EmployeeId),
    ListAll,
    Reports,
    CreateEmployee,
    UpdateEmployee(EmployeeId),
    DeleteEmployee(EmployeeId),
    CreateDepartment,
}

impl Operation {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Operation::CreateEmployee
                | Operation::UpdateEmployee(_)
                | Operation::DeleteEmployee(_)
                | Operation::CreateDepartment
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::ReadOwnProfile => "read_own_profile",
            Operation::ReadById(_) => "read_by_id",
            Operation::ListAll => "list_all",
            Operation::Reports => "reports",
            Operation::CreateEmployee => "create_employee",
            Operation::UpdateEmployee(_) => "update_employee",
            Operation::DeleteEmployee(_) => "delete_employee",
            Operation::CreateDepartment => "create_department",
        }
    }
}

/// Everything the decision needs to know about the requesting principal.
///
/// Built from one consistent read of role and ownership; see the infra
/// authorizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub principal_id: PrincipalId,
    pub role: RoleToken,
    pub owned_employee: Option<EmployeeId>,
    pub managed_department: Option<DepartmentId>,
}

/// Why a request was denied (logged; never shown to the caller).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "role", rename_all = "snake_case")]
pub enum DenialReason {
    /// The principal owns no employee record.
    NoOwnedRecord,
    /// Self-service read of somebody else's record.
    NotOwnRecord,
    /// Manager reading outside the department it manages.
    OutsideManagedDepartment,
    /// Manager role without a managed department; no scope can be derived.
    NoManagedDepartment,
    InsufficientRole(RoleToken),
}

impl core::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DenialReason::NoOwnedRecord => f.write_str("principal owns no employee record"),
            DenialReason::NotOwnRecord => f.write_str("target is not the principal's own record"),
            DenialReason::OutsideManagedDepartment => {
                f.write_str("target is outside the managed department")
            }
            DenialReason::NoManagedDepartment => f.write_str("manager has no department"),
            DenialReason::InsufficientRole(role) => write!(f, "role {role} is not permitted"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "detail", rename_all = "snake_case")]
pub enum Decision {
    Allow(Scope),
    Deny(DenialReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn scope(&self) -> Option<Scope> {
        match self {
            Decision::Allow(scope) => Some(*scope),
            Decision::Deny(_) => None,
        }
    }

    pub fn into_result(self) -> Result<Scope, AuthzError> {
        match self {
            Decision::Allow(scope) => Ok(scope),
            Decision::Deny(reason) => Err(AuthzError::Denied(reason)),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("access denied: {0}")]
    Denied(DenialReason),
}

/// Decide whether `subject` may perform `operation`.
///
/// `target_department` is the department of the employee named by a
/// `ReadById` target (`None` if no such employee exists); it is ignored for
/// every other operation.
///
/// - No IO
/// - No panics
/// - Deterministic in its inputs
pub fn decide(
    subject: &Subject,
    operation: &Operation,
    target_department: Option<DepartmentId>,
) -> Decision {
    match operation {
        Operation::ReadOwnProfile => match subject.owned_employee {
            Some(_) => Decision::Allow(Scope::Unscoped),
            None => Decision::Deny(DenialReason::NoOwnedRecord),
        },
        Operation::ReadById(target) => decide_read_by_id(subject, *target, target_department),
        Operation::ListAll | Operation::Reports => decide_listing(subject),
        Operation::CreateEmployee
        | Operation::UpdateEmployee(_)
        | Operation::DeleteEmployee(_)
        | Operation::CreateDepartment => {
            // Administrators only, whatever the target.
            if subject.role == RoleToken::Admin {
                Decision::Allow(Scope::Unscoped)
            } else {
                Decision::Deny(DenialReason::InsufficientRole(subject.role))
            }
        }
    }
}

fn decide_read_by_id(
    subject: &Subject,
    target: EmployeeId,
    target_department: Option<DepartmentId>,
) -> Decision {
    match subject.role {
        RoleToken::Admin => Decision::Allow(Scope::Unscoped),
        RoleToken::Manager => match subject.managed_department {
            None => Decision::Deny(DenialReason::NoManagedDepartment),
            Some(managed) if target_department == Some(managed) => {
                Decision::Allow(Scope::RestrictedToDepartment(managed))
            }
            Some(_) => Decision::Deny(DenialReason::OutsideManagedDepartment),
        },
        RoleToken::Employee | RoleToken::Unknown => match subject.owned_employee {
            Some(own) if own == target => Decision::Allow(Scope::Unscoped),
            Some(_) => Decision::Deny(DenialReason::NotOwnRecord),
            None => Decision::Deny(DenialReason::NoOwnedRecord),
        },
    }
}

fn decide_listing(subject: &Subject) -> Decision {
    match subject.role {
        RoleToken::Admin => Decision::Allow(Scope::Unscoped),
        RoleToken::Manager => match subject.managed_department {
            Some(department) => Decision::Allow(Scope::RestrictedToDepartment(department)),
            None => Decision::Deny(DenialReason::NoManagedDepartment),
        },
        role => Decision::Deny(DenialReason::InsufficientRole(role)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn subject(role: RoleToken) -> Subject {
        Subject {
            principal_id: PrincipalId::new("someone@example.com"),
            role,
            owned_employee: Some(EmployeeId::new()),
            managed_department: None,
        }
    }

    fn manager_of(department: DepartmentId) -> Subject {
        Subject {
            managed_department: Some(department),
            ..subject(RoleToken::Manager)
        }
    }

    #[test]
    fn own_profile_requires_an_owned_record() {
        let with_record = subject(RoleToken::Employee);
        assert!(decide(&with_record, &Operation::ReadOwnProfile, None).is_allowed());

        let without = Subject {
            owned_employee: None,
            ..subject(RoleToken::Admin)
        };
        assert_eq!(
            decide(&without, &Operation::ReadOwnProfile, None),
            Decision::Deny(DenialReason::NoOwnedRecord)
        );
    }

    #[test]
    fn admin_reads_any_record_even_missing_ones() {
        let admin = subject(RoleToken::Admin);
        let op = Operation::ReadById(EmployeeId::new());
        assert_eq!(decide(&admin, &op, None), Decision::Allow(Scope::Unscoped));
    }

    #[test]
    fn manager_reads_only_inside_managed_department() {
        let engineering = DepartmentId::new();
        let sales = DepartmentId::new();
        let manager = manager_of(engineering);
        let op = Operation::ReadById(EmployeeId::new());

        assert_eq!(
            decide(&manager, &op, Some(engineering)),
            Decision::Allow(Scope::RestrictedToDepartment(engineering))
        );
        assert_eq!(
            decide(&manager, &op, Some(sales)),
            Decision::Deny(DenialReason::OutsideManagedDepartment)
        );
        assert_eq!(
            decide(&manager, &op, None),
            Decision::Deny(DenialReason::OutsideManagedDepartment)
        );
    }

    #[test]
    fn manager_without_department_is_denied_reads_and_listings() {
        let manager = subject(RoleToken::Manager);
        let own = manager.owned_employee.unwrap();
        assert_eq!(
            decide(&manager, &Operation::ReadById(own), Some(DepartmentId::new())),
            Decision::Deny(DenialReason::NoManagedDepartment)
        );
        assert_eq!(
            decide(&manager, &Operation::ListAll, None),
            Decision::Deny(DenialReason::NoManagedDepartment)
        );
    }

    #[test]
    fn unknown_role_is_treated_as_self_service() {
        let unknown = subject(RoleToken::Unknown);
        let own = unknown.owned_employee.unwrap();
        assert!(decide(&unknown, &Operation::ReadById(own), None).is_allowed());
        assert_eq!(
            decide(&unknown, &Operation::Reports, None),
            Decision::Deny(DenialReason::InsufficientRole(RoleToken::Unknown))
        );
    }

    #[test]
    fn listing_scope_follows_role() {
        let engineering = DepartmentId::new();
        assert_eq!(
            decide(&subject(RoleToken::Admin), &Operation::ListAll, None).scope(),
            Some(Scope::Unscoped)
        );
        assert_eq!(
            decide(&manager_of(engineering), &Operation::Reports, None).scope(),
            Some(Scope::RestrictedToDepartment(engineering))
        );
        assert!(!decide(&subject(RoleToken::Employee), &Operation::ListAll, None).is_allowed());
    }

    #[test]
    fn only_admins_mutate() {
        let engineering = DepartmentId::new();
        let manager = manager_of(engineering);
        let own = manager.owned_employee.unwrap();
        let mutations = [
            Operation::CreateEmployee,
            Operation::UpdateEmployee(own),
            Operation::DeleteEmployee(own),
            Operation::CreateDepartment,
        ];
        for op in mutations {
            assert!(op.is_mutation());
            assert!(decide(&subject(RoleToken::Admin), &op, None).is_allowed());
            assert_eq!(
                decide(&manager, &op, Some(engineering)),
                Decision::Deny(DenialReason::InsufficientRole(RoleToken::Manager))
            );
            assert!(!decide(&subject(RoleToken::Employee), &op, None).is_allowed());
        }
    }

    #[test]
    fn reads_stay_open_to_a_department_manager() {
        let engineering = DepartmentId::new();
        let manager = manager_of(engineering);
        let own = manager.owned_employee.unwrap();
        let reads = [
            Operation::ReadOwnProfile,
            Operation::ReadById(own),
            Operation::ListAll,
            Operation::Reports,
        ];
        for op in reads {
            assert!(!op.is_mutation());
            assert!(decide(&manager, &op, Some(engineering)).is_allowed(), "{}", op.name());
        }
    }

    #[test]
    fn denied_decision_converts_to_error() {
        let err = Decision::Deny(DenialReason::NotOwnRecord).into_result().unwrap_err();
        assert_eq!(err, AuthzError::Denied(DenialReason::NotOwnRecord));
        assert_eq!(
            Decision::Allow(Scope::Unscoped).into_result(),
            Ok(Scope::Unscoped)
        );
    }

    #[test]
    fn scope_admits_only_its_department() {
        let a = DepartmentId::new();
        let b = DepartmentId::new();
        assert!(Scope::Unscoped.admits(a));
        assert!(Scope::RestrictedToDepartment(a).admits(a));
        assert!(!Scope::RestrictedToDepartment(a).admits(b));
    }

    proptest! {
        /// Property: a self-service principal may read a record by id exactly
        /// when the id is its own.
        #[test]
        fn employee_reads_by_id_iff_own(own_is_target in any::<bool>(), with_department in any::<bool>()) {
            let employee = subject(RoleToken::Employee);
            let own = employee.owned_employee.unwrap();
            let target = if own_is_target { own } else { EmployeeId::new() };
            let department = with_department.then(DepartmentId::new);

            let decision = decide(&employee, &Operation::ReadById(target), department);
            prop_assert_eq!(decision.is_allowed(), own_is_target);
        }
    }
}
