use serde::{Deserialize, Serialize};

use workforce_core::Entity;

use crate::RoleToken;

/// Identity of a principal (the login identifier, i.e. the employee e-mail).
///
/// Normalised to trimmed lower case on construction, so two spellings of the
/// same address can never register two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PrincipalId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for PrincipalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<PrincipalId> for String {
    fn from(value: PrincipalId) -> Self {
        value.0
    }
}

/// Opaque one-way credential (PHC string).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialHash(String);

impl CredentialHash {
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_phc(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("CredentialHash(<redacted>)")
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub credential: CredentialHash,
    /// Stored role tokens; may hold more than one.
    pub roles: Vec<RoleToken>,
    /// Set for provisioned accounts until the holder chooses a credential.
    pub must_reset_credential: bool,
}

impl Principal {
    pub fn operative_role(&self) -> RoleToken {
        RoleToken::operative(self.roles.iter().copied())
    }
}

impl Entity for Principal {
    type Id = PrincipalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_id_is_normalised() {
        assert_eq!(PrincipalId::new("  Alice@Example.COM "), PrincipalId::new("alice@example.com"));
        let from_json: PrincipalId = serde_json::from_str("\"BOB@example.com\"").unwrap();
        assert_eq!(from_json.as_str(), "bob@example.com");
    }

    #[test]
    fn credential_debug_is_redacted() {
        let hash = CredentialHash::from_phc("$argon2id$v=19$secret");
        assert!(!format!("{hash:?}").contains("secret"));
    }

    #[test]
    fn operative_role_of_multi_role_principal() {
        let principal = Principal {
            id: PrincipalId::new("carol@example.com"),
            credential: CredentialHash::from_phc("x"),
            roles: vec![RoleToken::Employee, RoleToken::Manager],
            must_reset_credential: false,
        };
        assert_eq!(principal.operative_role(), RoleToken::Manager);
    }
}
