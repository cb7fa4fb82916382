//! Shared fixtures for the crate's tests.

use chrono::NaiveDate;

use workforce_auth::{
    CredentialError, CredentialHash, CredentialHasher, Principal, PrincipalContext, PrincipalId, RoleToken,
};
use workforce_directory::{EmployeeDraft, Gender};

use crate::store::{Change, Changeset, DirectoryStore};

/// Fast stand-in for Argon2 so scenario tests stay quick.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextHasher;

impl CredentialHasher for PlaintextHasher {
    fn hash(&self, plaintext: &str) -> Result<CredentialHash, CredentialError> {
        Ok(CredentialHash::from_phc(format!("plain${plaintext}")))
    }

    fn verify(&self, plaintext: &str, credential: &CredentialHash) -> Result<bool, CredentialError> {
        credential
            .as_phc()
            .strip_prefix("plain$")
            .map(|stored| stored == plaintext)
            .ok_or_else(|| CredentialError::Malformed("not a plaintext credential".to_string()))
    }
}

pub fn draft(first: &str, last: &str, title: &str, gender: Gender, salary: i64) -> EmployeeDraft {
    EmployeeDraft {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
        phone_number: "555-0199".to_string(),
        job_title: title.to_string(),
        salary,
        hire_date: NaiveDate::from_ymd_opt(2018, 9, 3).unwrap(),
        date_of_birth: NaiveDate::from_ymd_opt(1987, 11, 23).unwrap(),
        gender,
    }
}

/// Register an administrator without an employee record.
pub async fn seed_admin<S: DirectoryStore>(store: &S) -> PrincipalContext {
    let id = PrincipalId::new("root@example.com");
    let mut cs = Changeset::new();
    cs.push(Change::InsertPrincipal(Principal {
        id: id.clone(),
        credential: CredentialHash::from_phc("plain$root"),
        roles: vec![RoleToken::Admin],
        must_reset_credential: false,
    }));
    store.commit(cs).await.unwrap();
    PrincipalContext::new(id, vec![RoleToken::Admin])
}

/// Context for a provisioned principal, as the authentication layer would build it.
pub fn context_for(principal: &PrincipalId, role: RoleToken) -> PrincipalContext {
    PrincipalContext::new(principal.clone(), vec![role])
}
