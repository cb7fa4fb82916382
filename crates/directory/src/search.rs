use serde::{Deserialize, Serialize};

use workforce_auth::Scope;
use workforce_core::{DepartmentId, DomainError, DomainResult};

use crate::employee::{Employee, Gender};

pub const MAX_FILTER_LEN: usize = 50;

/// Caller-supplied search filters. Blank strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub name: Option<String>,
    pub department_id: Option<DepartmentId>,
    pub job_title: Option<String>,
    pub gender: Option<Gender>,
}

impl SearchCriteria {
    pub fn validate(&self) -> DomainResult<()> {
        check_filter_len("name", self.name.as_deref())?;
        check_filter_len("job title", self.job_title.as_deref())
    }

    fn name_filter(&self) -> Option<&str> {
        non_blank(self.name.as_deref())
    }

    fn job_title_filter(&self) -> Option<&str> {
        non_blank(self.job_title.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn check_filter_len(field: &str, value: Option<&str>) -> DomainResult<()> {
    match non_blank(value) {
        Some(v) if v.chars().count() > MAX_FILTER_LEN => Err(DomainError::validation(format!(
            "{field} filter must not exceed {MAX_FILTER_LEN} characters"
        ))),
        _ => Ok(()),
    }
}

/// One conjunct of an employee predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Condition {
    /// Case-insensitive substring of the first name.
    NameContains(String),
    DepartmentIs(DepartmentId),
    /// Exact, case-sensitive match.
    JobTitleIs(String),
    GenderIs(Gender),
}

impl Condition {
    pub fn matches(&self, employee: &Employee) -> bool {
        match self {
            Condition::NameContains(needle) => employee
                .first_name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Condition::DepartmentIs(id) => employee.department_id == *id,
            Condition::JobTitleIs(title) => employee.job_title == *title,
            Condition::GenderIs(gender) => employee.gender == *gender,
        }
    }
}

/// A conjunction of conditions; the empty conjunction matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeePredicate {
    conditions: Vec<Condition>,
}

impl EmployeePredicate {
    pub fn all() -> Self {
        Self::default()
    }

    /// Translate caller criteria into conditions, then intersect with `scope`.
    ///
    /// A caller-supplied department filter never widens a restricted scope:
    /// both conditions are kept, so a mismatch yields an unsatisfiable predicate.
    pub fn compose(criteria: &SearchCriteria, scope: &Scope) -> Self {
        let mut predicate = Self::default();
        if let Some(name) = criteria.name_filter() {
            predicate = predicate.and(Condition::NameContains(name.to_string()));
        }
        if let Some(id) = criteria.department_id {
            predicate = predicate.and(Condition::DepartmentIs(id));
        }
        if let Some(title) = criteria.job_title_filter() {
            predicate = predicate.and(Condition::JobTitleIs(title.to_string()));
        }
        if let Some(gender) = criteria.gender {
            predicate = predicate.and(Condition::GenderIs(gender));
        }
        predicate.scoped(scope)
    }

    /// Conjoin the scope restriction, if any.
    pub fn scoped(self, scope: &Scope) -> Self {
        match scope {
            Scope::Unscoped => self,
            Scope::RestrictedToDepartment(id) => self.and(Condition::DepartmentIs(*id)),
        }
    }

    pub fn and(mut self, condition: Condition) -> Self {
        if !self.conditions.contains(&condition) {
            self.conditions.push(condition);
        }
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn matches(&self, employee: &Employee) -> bool {
        self.conditions.iter().all(|c| c.matches(employee))
    }

    pub fn filter<'a, I>(&self, employees: I) -> Vec<Employee>
    where
        I: IntoIterator<Item = &'a Employee>,
    {
        employees
            .into_iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect()
    }

    /// True when two conditions pin different departments (or genders).
    pub fn is_unsatisfiable(&self) -> bool {
        let mut department = None;
        let mut gender = None;
        for condition in &self.conditions {
            match condition {
                Condition::DepartmentIs(id) => match department {
                    Some(prev) if prev != *id => return true,
                    _ => department = Some(*id),
                },
                Condition::GenderIs(g) => match gender {
                    Some(prev) if prev != *g => return true,
                    _ => gender = Some(*g),
                },
                _ => {}
            }
        }
        false
    }

    /// The department every match is pinned to, if any.
    pub fn department(&self) -> Option<DepartmentId> {
        self.conditions.iter().find_map(|c| match c {
            Condition::DepartmentIs(id) => Some(*id),
            _ => None,
        })
    }
}
