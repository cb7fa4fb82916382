use tracing::instrument;

use workforce_auth::{PrincipalId, RoleToken};

use crate::error::{DirectoryError, DirectoryResult};
use crate::store::DirectoryStore;

/// Maps a principal to its operative role.
#[derive(Debug, Clone)]
pub struct RoleResolver<S> {
    store: S,
}

impl<S: DirectoryStore> RoleResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Highest-privilege stored role; `Unknown` if none is recognised.
    #[instrument(skip_all, fields(principal = %principal), err)]
    pub async fn resolve_role(&self, principal: &PrincipalId) -> DirectoryResult<RoleToken> {
        self.store
            .find_principal(principal)
            .await?
            .map(|p| p.operative_role())
            .ok_or_else(|| DirectoryError::PrincipalNotFound(principal.clone()))
    }
}
