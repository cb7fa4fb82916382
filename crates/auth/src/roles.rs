use serde::{Deserialize, Serialize};

/// Role token used for role-scoped access.
///
/// The token set is closed. Anything the store holds that is not one of the
/// three known tokens resolves to `Unknown`, which is granted nothing beyond
/// reading its own record.
///
/// Variants are declared in ascending privilege so the derived `Ord` doubles
/// as the precedence used by [`RoleToken::operative`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoleToken {
    Unknown,
    Employee,
    Manager,
    Admin,
}

impl RoleToken {
    /// Tokens that may be registered in the role table.
    pub const KNOWN: [RoleToken; 3] = [RoleToken::Admin, RoleToken::Manager, RoleToken::Employee];

    /// Parse a stored or submitted token.
    ///
    /// Accepts the canonical `ROLE_*` form and the bare form, case-insensitively.
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("ROLE_").unwrap_or(&upper);
        match bare {
            "ADMIN" => RoleToken::Admin,
            "MANAGER" => RoleToken::Manager,
            "EMPLOYEE" => RoleToken::Employee,
            _ => RoleToken::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleToken::Admin => "ROLE_ADMIN",
            RoleToken::Manager => "ROLE_MANAGER",
            RoleToken::Employee => "ROLE_EMPLOYEE",
            RoleToken::Unknown => "ROLE_UNKNOWN",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, RoleToken::Unknown)
    }

    /// The single role treated as authoritative when a principal holds several.
    ///
    /// Highest privilege wins; an empty set resolves to `Unknown`.
    pub fn operative<I>(tokens: I) -> RoleToken
    where
        I: IntoIterator<Item = RoleToken>,
    {
        tokens.into_iter().max().unwrap_or(RoleToken::Unknown)
    }
}

impl core::fmt::Display for RoleToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RoleToken {
    fn from(value: String) -> Self {
        RoleToken::parse(&value)
    }
}

impl From<RoleToken> for String {
    fn from(value: RoleToken) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_prefixed_and_bare_forms() {
        assert_eq!(RoleToken::parse("ROLE_MANAGER"), RoleToken::Manager);
        assert_eq!(RoleToken::parse("manager"), RoleToken::Manager);
        assert_eq!(RoleToken::parse(" Admin "), RoleToken::Admin);
        assert_eq!(RoleToken::parse("ROLE_EMPLOYEE"), RoleToken::Employee);
    }

    #[test]
    fn unrecognised_tokens_are_unknown() {
        assert_eq!(RoleToken::parse("ROLE_SUPERUSER"), RoleToken::Unknown);
        assert_eq!(RoleToken::parse(""), RoleToken::Unknown);
        assert!(!RoleToken::parse("auditor").is_known());
    }

    #[test]
    fn operative_role_is_highest_privilege() {
        let held = [RoleToken::Employee, RoleToken::Admin, RoleToken::Manager];
        assert_eq!(RoleToken::operative(held), RoleToken::Admin);
        assert_eq!(
            RoleToken::operative([RoleToken::Unknown, RoleToken::Employee]),
            RoleToken::Employee
        );
        assert_eq!(RoleToken::operative([]), RoleToken::Unknown);
    }

    #[test]
    fn serializes_as_canonical_token() {
        let json = serde_json::to_string(&RoleToken::Manager).unwrap();
        assert_eq!(json, "\"ROLE_MANAGER\"");
        let back: RoleToken = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(back, RoleToken::Admin);
    }
}
