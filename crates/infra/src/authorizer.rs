//! Authorization entry point: consistent snapshot in, [`Decision`] out.

use tracing::{debug, instrument, warn};

use workforce_auth::{Decision, Operation, PrincipalId, Scope, Subject, decide};
use workforce_directory::Employee;

use crate::error::{DirectoryError, DirectoryResult};
use crate::ownership::OwnershipIndex;
use crate::store::{DirectoryStore, PrincipalSnapshot};

/// An allowed request, with everything the decision was based on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub scope: Scope,
    pub snapshot: PrincipalSnapshot,
    /// The employee a `ReadById` named, if it exists.
    pub target: Option<Employee>,
}

#[derive(Debug, Clone)]
pub struct Authorizer<S> {
    store: S,
    ownership: OwnershipIndex<S>,
}

impl<S: DirectoryStore + Clone> Authorizer<S> {
    pub fn new(store: S) -> Self {
        Self {
            ownership: OwnershipIndex::new(store.clone()),
            store,
        }
    }

    /// Decision for `principal` performing `operation`.
    ///
    /// Fails only with `PrincipalNotFound` or an infrastructure error; a
    /// denial is an `Ok(Decision::Deny(_))`.
    pub async fn is_authorized(
        &self,
        principal: &PrincipalId,
        operation: &Operation,
    ) -> DirectoryResult<Decision> {
        let (decision, _, _) = self.evaluate(principal, operation).await?;
        Ok(decision)
    }

    /// Like [`Self::is_authorized`], but a denial becomes `AccessDenied`.
    #[instrument(skip_all, fields(principal = %principal, operation = operation.name()))]
    pub async fn authorize(
        &self,
        principal: &PrincipalId,
        operation: &Operation,
    ) -> DirectoryResult<Authorization> {
        let (decision, snapshot, target) = self.evaluate(principal, operation).await?;
        match decision {
            Decision::Allow(scope) => {
                debug!(?scope, "access granted");
                Ok(Authorization {
                    scope,
                    snapshot,
                    target,
                })
            }
            Decision::Deny(reason) => {
                warn!(%reason, "access denied");
                Err(DirectoryError::AccessDenied(reason))
            }
        }
    }

    async fn evaluate(
        &self,
        principal: &PrincipalId,
        operation: &Operation,
    ) -> DirectoryResult<(Decision, PrincipalSnapshot, Option<Employee>)> {
        let snapshot = self.ownership.snapshot(principal).await?;

        let target = match operation {
            Operation::ReadById(id) => self.store.find_employee(*id).await?,
            _ => None,
        };

        let subject = Subject {
            principal_id: snapshot.principal.id.clone(),
            role: snapshot.principal.operative_role(),
            owned_employee: snapshot.owned_employee.as_ref().map(|e| e.id),
            managed_department: snapshot.managed_department.as_ref().map(|d| d.id),
        };
        let decision = decide(&subject, operation, target.as_ref().map(|e| e.department_id));
        Ok((decision, snapshot, target))
    }
}
