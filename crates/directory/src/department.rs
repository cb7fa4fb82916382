use serde::{Deserialize, Serialize};

use workforce_auth::PrincipalId;
use workforce_core::{DepartmentId, DomainError, DomainResult, Entity};

pub const MAX_DEPARTMENT_NAME_LEN: usize = 100;

/// A department and its (optional) manager claim.
///
/// The manager, when present, is the principal owned by one of the
/// employees; that binding is maintained by the lifecycle orchestrator only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub manager: Option<PrincipalId>,
}

impl Department {
    /// A fresh department with no manager.
    pub fn new(id: DepartmentId, name: &str) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("department name is required"));
        }
        if name.chars().count() > MAX_DEPARTMENT_NAME_LEN {
            return Err(DomainError::validation(format!(
                "department name must not exceed {MAX_DEPARTMENT_NAME_LEN} characters"
            )));
        }
        Ok(Self {
            id,
            name: name.to_string(),
            manager: None,
        })
    }

    pub fn has_manager(&self) -> bool {
        self.manager.is_some()
    }

    pub fn is_managed_by(&self, principal: &PrincipalId) -> bool {
        self.manager.as_ref() == Some(principal)
    }
}

impl Entity for Department {
    type Id = DepartmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
