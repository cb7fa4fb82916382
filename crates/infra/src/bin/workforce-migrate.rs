//! Applies the Postgres schema and optionally seeds an administrator.
//!
//! Reads `DATABASE_URL`, `WORKFORCE_DB_MAX_CONNECTIONS`,
//! `WORKFORCE_BOOTSTRAP_ADMIN` and `WORKFORCE_CREDENTIAL_PEPPER`.

use anyhow::Context;

use workforce_infra::{EmployeeLifecycleOrchestrator, PostgresDirectoryStore, WorkforceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let format = std::env::var("WORKFORCE_LOG_FORMAT").unwrap_or_default();
    workforce_observability::tracing::init(workforce_observability::LogFormat::parse(&format), "info");

    let config = WorkforceConfig::from_env().context("invalid configuration")?;
    let database_url = config.require_database_url()?;

    let store = PostgresDirectoryStore::connect(database_url, config.max_connections)
        .await
        .context("failed to connect to Postgres")?;
    store.migrate().await.context("schema migration failed")?;
    tracing::info!("schema is up to date");

    if let Some(admin) = &config.bootstrap_admin {
        let orchestrator = EmployeeLifecycleOrchestrator::new(store.clone(), config.hasher());
        match orchestrator
            .ensure_admin(admin)
            .await
            .context("failed to provision administrator")?
        {
            Some(password) => {
                tracing::info!(principal = %admin, "administrator created; one-time password printed to stdout");
                println!("{admin} {password}");
            }
            None => tracing::info!(principal = %admin, "administrator already exists"),
        }
    }

    Ok(())
}
