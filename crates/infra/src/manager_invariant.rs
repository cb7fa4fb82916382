//! At most one manager per department.
//!
//! Both entry points only record guarded changes; the store re-checks the
//! guard when the surrounding changeset commits.

use workforce_auth::PrincipalId;
use workforce_directory::Department;

use crate::error::{DirectoryError, DirectoryResult};
use crate::store::{Change, Changeset};

/// Bind `principal` as the manager of `department`.
pub fn claim_manager(
    changeset: &mut Changeset,
    department: &Department,
    principal: &PrincipalId,
) -> DirectoryResult<()> {
    if department.has_manager() {
        return Err(DirectoryError::ManagerAlreadyExists(department.id));
    }
    changeset.push(Change::ClaimManager {
        department: department.id,
        principal: principal.clone(),
    });
    Ok(())
}

/// Clear the manager of `department` if it is `principal`; otherwise nothing.
pub fn release_manager_if_matches(
    changeset: &mut Changeset,
    department: &Department,
    principal: &PrincipalId,
) {
    if department.is_managed_by(principal) {
        changeset.push(Change::ReleaseManager {
            department: department.id,
            principal: principal.clone(),
        });
    }
}
