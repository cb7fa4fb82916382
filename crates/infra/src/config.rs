//! Environment-driven configuration.

use thiserror::Error;

use workforce_auth::{Argon2Hasher, PrincipalId};

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkforceConfig {
    /// Postgres connection string; `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Administrator account seeded by `workforce-migrate`.
    pub bootstrap_admin: Option<PrincipalId>,
    pub credential_pepper: Option<String>,
}

impl Default for WorkforceConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            bootstrap_admin: None,
            credential_pepper: None,
        }
    }
}

impl WorkforceConfig {
    /// Read `DATABASE_URL`, `WORKFORCE_DB_MAX_CONNECTIONS`,
    /// `WORKFORCE_BOOTSTRAP_ADMIN` and `WORKFORCE_CREDENTIAL_PEPPER`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let max_connections = match non_empty("WORKFORCE_DB_MAX_CONNECTIONS") {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "WORKFORCE_DB_MAX_CONNECTIONS",
                        value: raw,
                    });
                }
            },
        };

        let bootstrap_admin = match non_empty("WORKFORCE_BOOTSTRAP_ADMIN") {
            None => None,
            Some(raw) if raw.contains('@') => Some(PrincipalId::new(raw)),
            Some(raw) => {
                return Err(ConfigError::Invalid {
                    name: "WORKFORCE_BOOTSTRAP_ADMIN",
                    value: raw,
                });
            }
        };

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            max_connections,
            bootstrap_admin,
            credential_pepper: non_empty("WORKFORCE_CREDENTIAL_PEPPER"),
        })
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    pub fn hasher(&self) -> Argon2Hasher {
        match &self.credential_pepper {
            Some(pepper) => Argon2Hasher::with_pepper(pepper.clone()),
            None => Argon2Hasher::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<WorkforceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkforceConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg, WorkforceConfig::default());
        assert_eq!(cfg.require_database_url(), Err(ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn values_are_read_and_normalised() {
        let cfg = config(&[
            ("DATABASE_URL", "postgres://localhost/workforce"),
            ("WORKFORCE_DB_MAX_CONNECTIONS", " 12 "),
            ("WORKFORCE_BOOTSTRAP_ADMIN", "Root@Example.com"),
        ])
        .unwrap();
        assert_eq!(cfg.require_database_url(), Ok("postgres://localhost/workforce"));
        assert_eq!(cfg.max_connections, 12);
        assert_eq!(cfg.bootstrap_admin, Some(PrincipalId::new("root@example.com")));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config(&[("WORKFORCE_DB_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::Invalid { name: "WORKFORCE_DB_MAX_CONNECTIONS", .. })
        ));
        assert!(matches!(
            config(&[("WORKFORCE_BOOTSTRAP_ADMIN", "root")]),
            Err(ConfigError::Invalid { name: "WORKFORCE_BOOTSTRAP_ADMIN", .. })
        ));
    }
}
