use crate::{PrincipalId, RoleToken};

/// Principal context for a request (authenticated identity + granted roles).
///
/// Supplied by the external authentication layer and trusted as-is. The roles
/// it carries are what was granted at sign-in; authorization re-reads the
/// stored roles so that a revocation takes effect immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal_id: PrincipalId,
    granted_roles: Vec<RoleToken>,
}

impl PrincipalContext {
    pub fn new(principal_id: impl Into<PrincipalId>, granted_roles: Vec<RoleToken>) -> Self {
        Self {
            principal_id: principal_id.into(),
            granted_roles,
        }
    }

    pub fn principal_id(&self) -> &PrincipalId {
        &self.principal_id
    }

    pub fn granted_roles(&self) -> &[RoleToken] {
        &self.granted_roles
    }
}
