//! Postgres-backed directory store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Code / constraint | StoreError |
//! |------------|------------------------------|------------|
//! | unique violation | `23505` on `departments_manager_id_key` | `ManagerConflict` |
//! | unique violation | `23505` on `departments_name_key` | `DuplicateDepartmentName` |
//! | unique violation | `23505` on `principals_pkey` / `employees_principal_id_key` | `DuplicatePrincipal` |
//! | foreign key violation | `23503` | `Missing` |
//! | anything else | any | `Backend` |
//!
//! Unique violations are mapped where the offending change is known, so the
//! error carries the conflicting key.
//!
//! Claims are a conditional `UPDATE … WHERE manager_id IS NULL`; the unique
//! manager column catches whatever slips past it under concurrency.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::{Span, instrument, warn};

use workforce_auth::{CredentialHash, Principal, PrincipalId, RoleToken};
use workforce_core::{DepartmentId, EmployeeId};
use workforce_directory::{Condition, Department, Employee, EmployeePredicate, Gender, Salary};

use super::{Change, Changeset, DirectoryStore, PrincipalSnapshot, StoreError};

/// Schema, applied statement by statement by [`PostgresDirectoryStore::migrate`].
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        name TEXT PRIMARY KEY
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS principals (
        id TEXT PRIMARY KEY,
        credential TEXT NOT NULL,
        must_reset_credential BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS principal_roles (
        principal_id TEXT NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
        role_name TEXT NOT NULL REFERENCES roles(name),
        PRIMARY KEY (principal_id, role_name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS departments (
        id UUID PRIMARY KEY,
        seq BIGSERIAL NOT NULL,
        name TEXT NOT NULL,
        manager_id TEXT REFERENCES principals(id),
        CONSTRAINT departments_name_key UNIQUE (name),
        CONSTRAINT departments_manager_id_key UNIQUE (manager_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS employees (
        id UUID PRIMARY KEY,
        seq BIGSERIAL NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone_number TEXT NOT NULL,
        job_title TEXT NOT NULL,
        salary BIGINT NOT NULL CHECK (salary > 0),
        hire_date DATE NOT NULL,
        date_of_birth DATE NOT NULL,
        gender TEXT NOT NULL,
        department_id UUID NOT NULL REFERENCES departments(id),
        principal_id TEXT NOT NULL REFERENCES principals(id),
        CONSTRAINT employees_principal_id_key UNIQUE (principal_id)
    )
    "#,
    r#"
    INSERT INTO roles (name)
    VALUES ('ROLE_ADMIN'), ('ROLE_MANAGER'), ('ROLE_EMPLOYEE')
    ON CONFLICT DO NOTHING
    "#,
];

const MIGRATION_LOCK_KEY: i64 = 0x776f_726b_666f_7263;

const EMPLOYEE_COLUMNS: &str = "id, first_name, last_name, email, phone_number, job_title, salary, \
     hire_date, date_of_birth, gender, department_id, principal_id";

/// Postgres-backed directory store.
///
/// Each changeset runs in one transaction; authorization snapshots are read
/// inside a `REPEATABLE READ` read-only transaction.
#[derive(Debug, Clone)]
pub struct PostgresDirectoryStore {
    pool: Arc<PgPool>,
}

impl PostgresDirectoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and register the known roles. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        // Concurrent migrations race on catalog rows; serialise them.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("migration_lock", e))?;
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn load_roles<'e, E>(executor: E, id: &PrincipalId) -> Result<Vec<RoleToken>, StoreError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query("SELECT role_name FROM principal_roles WHERE principal_id = $1 ORDER BY role_name")
            .bind(id.as_str())
            .fetch_all(executor)
            .await
            .map_err(|e| map_sqlx_error("load_roles", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("role_name")
                    .map(|name| RoleToken::parse(&name))
                    .map_err(|e| map_sqlx_error("read_role", e))
            })
            .collect()
    }

    async fn fetch_principal(
        tx: &mut Transaction<'_, Postgres>,
        id: &PrincipalId,
    ) -> Result<Option<Principal>, StoreError> {
        let row = sqlx::query("SELECT id, credential, must_reset_credential FROM principals WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("find_principal", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let roles = Self::load_roles(&mut **tx, id).await?;
        Ok(Some(Principal {
            id: PrincipalId::new(row.try_get::<String, _>("id").map_err(|e| map_sqlx_error("read_principal", e))?),
            credential: CredentialHash::from_phc(
                row.try_get::<String, _>("credential")
                    .map_err(|e| map_sqlx_error("read_principal", e))?,
            ),
            roles,
            must_reset_credential: row
                .try_get("must_reset_credential")
                .map_err(|e| map_sqlx_error("read_principal", e))?,
        }))
    }

    async fn fetch_owned_employee(
        tx: &mut Transaction<'_, Postgres>,
        principal: &PrincipalId,
    ) -> Result<Option<Employee>, StoreError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE principal_id = $1");
        let row = sqlx::query(&sql)
            .bind(principal.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("find_employee", e))?;
        row.as_ref().map(employee_from_row).transpose()
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }

    async fn apply(tx: &mut Transaction<'_, Postgres>, change: Change) -> Result<(), StoreError> {
        match change {
            Change::InsertPrincipal(principal) => {
                sqlx::query("INSERT INTO principals (id, credential, must_reset_credential) VALUES ($1, $2, $3)")
                    .bind(principal.id.as_str())
                    .bind(principal.credential.as_phc())
                    .bind(principal.must_reset_credential)
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| match unique_constraint(&e) {
                        Some(_) => StoreError::DuplicatePrincipal(principal.id.clone()),
                        None => map_sqlx_error("insert_principal", e),
                    })?;
                for role in &principal.roles {
                    sqlx::query("INSERT INTO principal_roles (principal_id, role_name) VALUES ($1, $2)")
                        .bind(principal.id.as_str())
                        .bind(role.as_str())
                        .execute(&mut **tx)
                        .await
                        .map_err(|e| map_sqlx_error("insert_principal_role", e))?;
                }
            }
            Change::DeletePrincipal(id) => {
                let done = sqlx::query("DELETE FROM principals WHERE id = $1")
                    .bind(id.as_str())
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| map_sqlx_error("delete_principal", e))?;
                if done.rows_affected() == 0 {
                    return Err(StoreError::Missing(format!("principal '{id}'")));
                }
            }
            Change::InsertEmployee(e) => {
                sqlx::query(
                    r#"
                    INSERT INTO employees (
                        id, first_name, last_name, email, phone_number, job_title, salary,
                        hire_date, date_of_birth, gender, department_id, principal_id
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                    "#,
                )
                .bind(e.id.as_uuid())
                .bind(&e.first_name)
                .bind(&e.last_name)
                .bind(&e.email)
                .bind(&e.phone_number)
                .bind(&e.job_title)
                .bind(e.salary.amount())
                .bind(e.hire_date)
                .bind(e.date_of_birth)
                .bind(e.gender.as_str())
                .bind(e.department_id.as_uuid())
                .bind(e.principal_id.as_str())
                .execute(&mut **tx)
                .await
                .map_err(|err| match unique_constraint(&err) {
                    Some("employees_principal_id_key") => StoreError::DuplicatePrincipal(e.principal_id.clone()),
                    _ => map_sqlx_error("insert_employee", err),
                })?;
            }
            Change::UpdateEmployee(e) => {
                let done = sqlx::query(
                    r#"
                    UPDATE employees SET
                        first_name = $2, last_name = $3, email = $4, phone_number = $5,
                        job_title = $6, salary = $7, hire_date = $8, date_of_birth = $9,
                        gender = $10, department_id = $11
                    WHERE id = $1
                    "#,
                )
                .bind(e.id.as_uuid())
                .bind(&e.first_name)
                .bind(&e.last_name)
                .bind(&e.email)
                .bind(&e.phone_number)
                .bind(&e.job_title)
                .bind(e.salary.amount())
                .bind(e.hire_date)
                .bind(e.date_of_birth)
                .bind(e.gender.as_str())
                .bind(e.department_id.as_uuid())
                .execute(&mut **tx)
                .await
                .map_err(|err| map_sqlx_error("update_employee", err))?;
                if done.rows_affected() == 0 {
                    return Err(StoreError::Missing(format!("employee {}", e.id)));
                }
            }
            Change::DeleteEmployee(id) => {
                let done = sqlx::query("DELETE FROM employees WHERE id = $1")
                    .bind(id.as_uuid())
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| map_sqlx_error("delete_employee", e))?;
                if done.rows_affected() == 0 {
                    return Err(StoreError::Missing(format!("employee {id}")));
                }
            }
            Change::InsertDepartment(d) => {
                sqlx::query("INSERT INTO departments (id, name, manager_id) VALUES ($1, $2, $3)")
                    .bind(d.id.as_uuid())
                    .bind(&d.name)
                    .bind(d.manager.as_ref().map(PrincipalId::as_str))
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| match unique_constraint(&e) {
                        Some("departments_name_key") => StoreError::DuplicateDepartmentName(d.name.clone()),
                        _ => map_sqlx_error("insert_department", e),
                    })?;
            }
            Change::ClaimManager {
                department,
                principal,
            } => {
                let done = sqlx::query(
                    "UPDATE departments SET manager_id = $2 WHERE id = $1 AND manager_id IS NULL",
                )
                .bind(department.as_uuid())
                .bind(principal.as_str())
                .execute(&mut **tx)
                .await
                .map_err(|e| match unique_constraint(&e) {
                    // The principal already manages another department.
                    Some("departments_manager_id_key") => StoreError::ManagerConflict(department),
                    _ => map_sqlx_error("claim_manager", e),
                })?;

                if done.rows_affected() == 0 {
                    let exists = sqlx::query("SELECT 1 FROM departments WHERE id = $1")
                        .bind(department.as_uuid())
                        .fetch_optional(&mut **tx)
                        .await
                        .map_err(|e| map_sqlx_error("claim_manager", e))?;
                    return Err(match exists {
                        Some(_) => StoreError::ManagerConflict(department),
                        None => StoreError::Missing(format!("department {department}")),
                    });
                }
            }
            Change::ReleaseManager {
                department,
                principal,
            } => {
                sqlx::query("UPDATE departments SET manager_id = NULL WHERE id = $1 AND manager_id = $2")
                    .bind(department.as_uuid())
                    .bind(principal.as_str())
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| map_sqlx_error("release_manager", e))?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for PostgresDirectoryStore {
    #[instrument(skip_all, fields(principal = %id), err)]
    async fn find_principal(&self, id: &PrincipalId) -> Result<Option<Principal>, StoreError> {
        let mut tx = self.begin().await?;
        let principal = Self::fetch_principal(&mut tx, id).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(principal)
    }

    async fn find_role(&self, role: RoleToken) -> Result<Option<RoleToken>, StoreError> {
        let row = sqlx::query("SELECT name FROM roles WHERE name = $1")
            .bind(role.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_role", e))?;
        Ok(row.map(|_| role))
    }

    async fn find_employee(&self, id: EmployeeId) -> Result<Option<Employee>, StoreError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_employee", e))?;
        row.as_ref().map(employee_from_row).transpose()
    }

    async fn find_employee_by_principal(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<Employee>, StoreError> {
        let mut tx = self.begin().await?;
        let employee = Self::fetch_owned_employee(&mut tx, principal).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(employee)
    }

    async fn find_department(&self, id: DepartmentId) -> Result<Option<Department>, StoreError> {
        let row = sqlx::query("SELECT id, name, manager_id FROM departments WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_department", e))?;
        row.as_ref().map(department_from_row).transpose()
    }

    async fn find_department_by_manager(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<Department>, StoreError> {
        let row = sqlx::query("SELECT id, name, manager_id FROM departments WHERE manager_id = $1")
            .bind(principal.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_department_by_manager", e))?;
        row.as_ref().map(department_from_row).transpose()
    }

    async fn list_departments(&self) -> Result<Vec<Department>, StoreError> {
        let rows = sqlx::query("SELECT id, name, manager_id FROM departments ORDER BY seq ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_departments", e))?;
        rows.iter().map(department_from_row).collect()
    }

    #[instrument(skip_all, fields(principal = %id), err)]
    async fn principal_snapshot(
        &self,
        id: &PrincipalId,
    ) -> Result<Option<PrincipalSnapshot>, StoreError> {
        let mut tx = self.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_isolation", e))?;

        let Some(principal) = Self::fetch_principal(&mut tx, id).await? else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(None);
        };
        let owned_employee = Self::fetch_owned_employee(&mut tx, id).await?;
        let managed_department = sqlx::query("SELECT id, name, manager_id FROM departments WHERE manager_id = $1")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("find_department_by_manager", e))?
            .as_ref()
            .map(department_from_row)
            .transpose()?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(Some(PrincipalSnapshot {
            principal,
            owned_employee,
            managed_department,
        }))
    }

    #[instrument(skip_all, fields(conditions = predicate.conditions().len(), rows = tracing::field::Empty), err)]
    async fn query_employees(
        &self,
        predicate: &EmployeePredicate,
    ) -> Result<Vec<Employee>, StoreError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE TRUE"));

        for condition in predicate.conditions() {
            match condition {
                Condition::NameContains(needle) => {
                    let pattern = format!("%{}%", escape_like(needle));
                    query.push(" AND first_name ILIKE ").push_bind(pattern);
                }
                Condition::DepartmentIs(id) => {
                    query.push(" AND department_id = ").push_bind(*id.as_uuid());
                }
                Condition::JobTitleIs(title) => {
                    query.push(" AND job_title = ").push_bind(title.clone());
                }
                Condition::GenderIs(gender) => {
                    query.push(" AND gender = ").push_bind(gender.as_str());
                }
            }
        }
        query.push(" ORDER BY seq ASC");

        let rows = query
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_employees", e))?;

        Span::current().record("rows", rows.len());
        rows.iter().map(employee_from_row).collect()
    }

    #[instrument(skip_all, fields(changes = changeset.len()), err)]
    async fn commit(&self, changeset: Changeset) -> Result<(), StoreError> {
        if changeset.is_empty() {
            return Ok(());
        }

        let mut tx = self.begin().await?;
        for change in changeset.into_changes() {
            if let Err(err) = Self::apply(&mut tx, change).await {
                return Err(after_rollback(err, tx.rollback().await));
            }
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

fn employee_from_row(row: &PgRow) -> Result<Employee, StoreError> {
    let read = |e: sqlx::Error| map_sqlx_error("read_employee", e);

    let gender: String = row.try_get("gender").map_err(read)?;
    let salary: i64 = row.try_get("salary").map_err(read)?;
    let hire_date: NaiveDate = row.try_get("hire_date").map_err(read)?;
    let date_of_birth: NaiveDate = row.try_get("date_of_birth").map_err(read)?;

    Ok(Employee {
        id: EmployeeId::from_uuid(row.try_get("id").map_err(read)?),
        first_name: row.try_get("first_name").map_err(read)?,
        last_name: row.try_get("last_name").map_err(read)?,
        email: row.try_get("email").map_err(read)?,
        phone_number: row.try_get("phone_number").map_err(read)?,
        job_title: row.try_get("job_title").map_err(read)?,
        salary: Salary::new(salary).map_err(|e| StoreError::Backend(format!("corrupt employee row: {e}")))?,
        hire_date,
        date_of_birth,
        gender: Gender::from_str(&gender)
            .map_err(|e| StoreError::Backend(format!("corrupt employee row: {e}")))?,
        department_id: DepartmentId::from_uuid(row.try_get("department_id").map_err(read)?),
        principal_id: PrincipalId::new(row.try_get::<String, _>("principal_id").map_err(read)?),
    })
}

fn department_from_row(row: &PgRow) -> Result<Department, StoreError> {
    let read = |e: sqlx::Error| map_sqlx_error("read_department", e);
    let manager: Option<String> = row.try_get("manager_id").map_err(read)?;
    Ok(Department {
        id: DepartmentId::from_uuid(row.try_get("id").map_err(read)?),
        name: row.try_get("name").map_err(read)?,
        manager: manager.map(PrincipalId::new),
    })
}

/// The change's own failure wins over a failed rollback, which is only logged.
fn after_rollback(original: StoreError, rollback: Result<(), sqlx::Error>) -> StoreError {
    if let Err(e) = rollback {
        warn!(error = %e, original = %original, "rollback failed after rejected change");
    }
    original
}

/// Escape `LIKE` metacharacters so user input matches literally.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Name of the violated unique constraint, if `err` is a unique violation.
fn unique_constraint(err: &sqlx::Error) -> Option<&str> {
    if let sqlx::Error::Database(db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return db_err.constraint().or(Some(""));
        }
    }
    None
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Foreign key violation: a referenced row is gone.
                Some("23503") => StoreError::Missing(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use workforce_auth::Scope;
    use workforce_directory::SearchCriteria;

    use crate::error::DirectoryError;
    use crate::lifecycle::EmployeeLifecycleOrchestrator;
    use crate::testing::{PlaintextHasher, draft};

    /// Migrated store for `DATABASE_URL`, or `None` when no database is configured.
    async fn connect() -> Option<PostgresDirectoryStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let store = PostgresDirectoryStore::connect(&url, 8).await.unwrap();
        store.migrate().await.unwrap();
        Some(store)
    }

    /// Distinguishes rows written by one test run from every other run.
    fn run_tag() -> String {
        EmployeeId::new().to_string().replace('-', "")
    }

    fn manager_principal(id: &PrincipalId) -> Principal {
        Principal {
            id: id.clone(),
            credential: CredentialHash::from_phc("plain$x"),
            roles: vec![RoleToken::Manager],
            must_reset_credential: false,
        }
    }

    #[test]
    fn rollback_failure_keeps_the_original_error() {
        let department = DepartmentId::new();
        let err = after_rollback(StoreError::ManagerConflict(department), Err(sqlx::Error::PoolClosed));
        assert_eq!(err, StoreError::ManagerConflict(department));

        let err = after_rollback(StoreError::Missing("employee".into()), Ok(()));
        assert_eq!(err, StoreError::Missing("employee".into()));
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn schema_keeps_manager_column_unique() {
        let departments = SCHEMA
            .iter()
            .find(|s| s.contains("CREATE TABLE IF NOT EXISTS departments"))
            .unwrap();
        assert!(departments.contains("UNIQUE (manager_id)"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "needs a Postgres database in DATABASE_URL"]
    async fn concurrent_claims_on_one_department_admit_exactly_one() {
        let Some(store) = connect().await else { return };
        let tag = run_tag();
        let lifecycle = Arc::new(EmployeeLifecycleOrchestrator::new(store.clone(), PlaintextHasher));
        let department_id = lifecycle
            .create_department(&format!("Claims {tag}"))
            .await
            .unwrap()
            .id;

        let mut handles = Vec::new();
        for n in 0..6 {
            let lifecycle = lifecycle.clone();
            let candidate = draft(&format!("Claimant{n}"), &tag, "Lead", Gender::Other, 1_000);
            handles.push(tokio::spawn(async move {
                lifecycle.create(candidate, RoleToken::Manager, department_id).await
            }));
        }

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(provisioned) => winners.push(provisioned.principal_id),
                Err(err) => assert_eq!(err, DirectoryError::ManagerAlreadyExists(department_id)),
            }
        }
        assert_eq!(winners.len(), 1);

        let stored = store.find_department(department_id).await.unwrap().unwrap();
        assert_eq!(stored.manager, Some(winners[0].clone()));
        let staffed = EmployeePredicate::all().and(Condition::DepartmentIs(department_id));
        assert_eq!(store.query_employees(&staffed).await.unwrap().len(), 1);
    }

    #[tokio::test]
    #[ignore = "needs a Postgres database in DATABASE_URL"]
    async fn manager_column_uniqueness_rejects_a_second_department() {
        let Some(store) = connect().await else { return };
        let tag = run_tag();
        let principal = PrincipalId::new(format!("dual.{tag}@example.com"));
        let first = Department::new(DepartmentId::new(), &format!("Dual A {tag}")).unwrap();
        let second = Department::new(DepartmentId::new(), &format!("Dual B {tag}")).unwrap();

        let mut cs = Changeset::new();
        cs.push(Change::InsertPrincipal(manager_principal(&principal)));
        cs.push(Change::InsertDepartment(first.clone()));
        cs.push(Change::InsertDepartment(second.clone()));
        cs.push(Change::ClaimManager { department: first.id, principal: principal.clone() });
        cs.push(Change::ClaimManager { department: second.id, principal: principal.clone() });

        assert_eq!(store.commit(cs).await, Err(StoreError::ManagerConflict(second.id)));
        // The whole changeset was rolled back.
        assert!(store.find_principal(&principal).await.unwrap().is_none());
        assert!(store.find_department(first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "needs a Postgres database in DATABASE_URL"]
    async fn deleting_a_manager_releases_only_its_department() {
        let Some(store) = connect().await else { return };
        let tag = run_tag();
        let lifecycle = EmployeeLifecycleOrchestrator::new(store.clone(), PlaintextHasher);
        let eng = lifecycle.create_department(&format!("Eng {tag}")).await.unwrap();
        let ops = lifecycle.create_department(&format!("Ops {tag}")).await.unwrap();
        let eng_boss = lifecycle
            .create(draft("Eve", &tag, "Lead", Gender::Female, 900), RoleToken::Manager, eng.id)
            .await
            .unwrap();
        let ops_boss = lifecycle
            .create(draft("Oscar", &tag, "Lead", Gender::Male, 900), RoleToken::Manager, ops.id)
            .await
            .unwrap();

        lifecycle.delete(eng_boss.employee.id).await.unwrap();

        assert_eq!(store.find_department(eng.id).await.unwrap().unwrap().manager, None);
        assert_eq!(
            store.find_department(ops.id).await.unwrap().unwrap().manager,
            Some(ops_boss.principal_id)
        );
        assert!(store.find_principal(&eng_boss.principal_id).await.unwrap().is_none());

        let successor = lifecycle
            .create(draft("Ezra", &tag, "Lead", Gender::Other, 900), RoleToken::Manager, eng.id)
            .await
            .unwrap();
        assert_eq!(
            store.find_department(eng.id).await.unwrap().unwrap().manager,
            Some(successor.principal_id)
        );
    }

    #[tokio::test]
    #[ignore = "needs a Postgres database in DATABASE_URL"]
    async fn constraint_violations_map_to_typed_errors() {
        let Some(store) = connect().await else { return };
        let tag = run_tag();
        let lifecycle = EmployeeLifecycleOrchestrator::new(store.clone(), PlaintextHasher);
        let name = format!("Finance {tag}");
        lifecycle.create_department(&name).await.unwrap();
        assert_eq!(
            lifecycle.create_department(&name).await,
            Err(DirectoryError::DuplicateDepartment(name))
        );

        // Foreign key violation: the department does not exist.
        let orphan = draft("Orphan", &tag, "Clerk", Gender::Other, 100)
            .into_employee(EmployeeId::new(), DepartmentId::new(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap();
        let mut cs = Changeset::new();
        cs.push(Change::InsertPrincipal(manager_principal(&orphan.principal_id)));
        cs.push(Change::InsertEmployee(orphan.clone()));
        assert!(matches!(store.commit(cs).await, Err(StoreError::Missing(_))));
        assert!(store.find_principal(&orphan.principal_id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "needs a Postgres database in DATABASE_URL"]
    async fn search_matches_first_name_and_exact_job_title() {
        let Some(store) = connect().await else { return };
        let tag = run_tag();
        let lifecycle = EmployeeLifecycleOrchestrator::new(store.clone(), PlaintextHasher);
        let department = lifecycle.create_department(&format!("Navy {tag}")).await.unwrap();
        lifecycle
            .create(draft("Grace", &tag, "Admiral", Gender::Female, 900), RoleToken::Employee, department.id)
            .await
            .unwrap();

        let hits = |name: Option<&str>, title: Option<&str>| {
            let criteria = SearchCriteria {
                name: name.map(str::to_string),
                job_title: title.map(str::to_string),
                department_id: Some(department.id),
                gender: None,
            };
            let predicate = EmployeePredicate::compose(&criteria, &Scope::Unscoped);
            let store = store.clone();
            async move { store.query_employees(&predicate).await.unwrap().len() }
        };

        assert_eq!(hits(Some("GRAC"), None).await, 1);
        assert_eq!(hits(Some(&tag[..8]), None).await, 0);
        assert_eq!(hits(Some("%"), None).await, 0);
        assert_eq!(hits(None, Some("Admiral")).await, 1);
        assert_eq!(hits(None, Some("admiral")).await, 0);
    }
}
