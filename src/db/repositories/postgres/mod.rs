//! Postgres repository implementation using Diesel.
//!
//! This module implements the repository traits against a Postgres
//! database holding the `students` and `grades` tables. Grade removal on
//! student deletion is enforced by the schema itself (cascading foreign
//! key), so deletes are single statements.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use diesel::dsl::avg;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tokio::task;

use crate::db::models::{Grade, GradeId, NewGrade, NewStudent, Student, StudentId, StudentUpdate};
use crate::db::repository::{
    ErrorContext, GradeRepository, RepositoryError, RepositoryResult, StudentRepository,
};

mod models;
mod schema;

use models::{GradeRow, NewGradeRow, NewStudentRow, StudentRow};
use schema::{grades, students};

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let max_pool_size = std::env::var("PG_POOL_MAX")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let min_pool_size = std::env::var("PG_POOL_MIN")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);

        let connection_timeout_sec = std::env::var("PG_CONN_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let idle_timeout_sec = std::env::var("PG_IDLE_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(600);

        let max_retries = std::env::var("PG_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);

        let retry_delay_ms = std::env::var("PG_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(100);

        Ok(Self {
            database_url,
            max_pool_size,
            min_pool_size,
            connection_timeout_sec,
            idle_timeout_sec,
            max_retries,
            retry_delay_ms,
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true) // Validate connections before use
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        // Run migrations once during initialization
        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self { pool, config })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient
    /// failures.
    ///
    /// Retries up to `max_retries` times when a retryable error occurs
    /// (connection errors, serialization failures), with exponential
    /// backoff. Blocking work runs on the tokio blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2; // Exponential backoff
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        return Err(err);
                    }
                };

                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }
}

fn to_grade(row: GradeRow) -> Grade {
    Grade {
        id: GradeId(row.id),
        grade: row.grade,
        subject: row.subject,
    }
}

fn to_student(row: StudentRow, grades: Vec<Grade>) -> Student {
    Student {
        id: StudentId(row.id),
        identifier: row.identifier,
        name: row.name,
        firstname: row.firstname,
        birthdate: row.birthdate,
        grades,
    }
}

fn load_grades_for(conn: &mut PgConnection, student_id: i64) -> RepositoryResult<Vec<Grade>> {
    let rows = grades::table
        .filter(grades::student_id.eq(student_id))
        .order(grades::id.asc())
        .select(GradeRow::as_select())
        .load::<GradeRow>(conn)
        .map_err(RepositoryError::from)?;

    Ok(rows.into_iter().map(to_grade).collect())
}

#[async_trait]
impl StudentRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn list_students(&self) -> RepositoryResult<Vec<Student>> {
        self.with_conn(|conn| {
            let student_rows = students::table
                .order(students::id.asc())
                .select(StudentRow::as_select())
                .load::<StudentRow>(conn)
                .map_err(RepositoryError::from)?;

            let grade_rows = grades::table
                .order(grades::id.asc())
                .select(GradeRow::as_select())
                .load::<GradeRow>(conn)
                .map_err(RepositoryError::from)?;

            let mut by_student: HashMap<i64, Vec<Grade>> = HashMap::new();
            for row in grade_rows {
                by_student.entry(row.student_id).or_default().push(to_grade(row));
            }

            Ok(student_rows
                .into_iter()
                .map(|row| {
                    let grades = by_student.remove(&row.id).unwrap_or_default();
                    to_student(row, grades)
                })
                .collect())
        })
        .await
    }

    async fn find_student_by_identifier(
        &self,
        identifier: &str,
    ) -> RepositoryResult<Option<Student>> {
        let identifier = identifier.to_string();
        self.with_conn(move |conn| {
            let row = students::table
                .filter(students::identifier.eq(&identifier))
                .select(StudentRow::as_select())
                .first::<StudentRow>(conn)
                .optional()
                .map_err(RepositoryError::from)?;

            match row {
                Some(row) => {
                    let grades = load_grades_for(conn, row.id)?;
                    Ok(Some(to_student(row, grades)))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn insert_student(&self, new: &NewStudent) -> RepositoryResult<Student> {
        let new = new.clone();
        self.with_conn(move |conn| {
            let row: StudentRow = diesel::insert_into(students::table)
                .values(&NewStudentRow {
                    identifier: new.identifier.clone(),
                    name: new.name.clone(),
                    firstname: new.firstname.clone(),
                    birthdate: new.birthdate,
                })
                .returning(StudentRow::as_returning())
                .get_result(conn)
                .map_err(RepositoryError::from)?;

            Ok(to_student(row, Vec::new()))
        })
        .await
    }

    async fn update_student(
        &self,
        id: StudentId,
        changes: &StudentUpdate,
    ) -> RepositoryResult<Student> {
        let changes = changes.clone();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let row: StudentRow = diesel::update(students::table.find(id.0))
                    .set((
                        students::name.eq(&changes.name),
                        students::firstname.eq(&changes.firstname),
                        students::birthdate.eq(changes.birthdate),
                    ))
                    .returning(StudentRow::as_returning())
                    .get_result(tx)
                    .map_err(|e| match e {
                        diesel::result::Error::NotFound => RepositoryError::not_found_with_context(
                            "no student row to update",
                            ErrorContext::new("update_student")
                                .with_entity("student")
                                .with_entity_id(id),
                        ),
                        other => RepositoryError::from(other),
                    })?;

                let grades = load_grades_for(tx, row.id)?;
                Ok(to_student(row, grades))
            })
        })
        .await
    }

    async fn delete_student(&self, id: StudentId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            // The grades rows go with it via ON DELETE CASCADE.
            let deleted = diesel::delete(students::table.find(id.0))
                .execute(conn)
                .map_err(RepositoryError::from)?;

            if deleted == 0 {
                return Err(RepositoryError::not_found_with_context(
                    "no student row to delete",
                    ErrorContext::new("delete_student")
                        .with_entity("student")
                        .with_entity_id(id),
                ));
            }

            Ok(())
        })
        .await
    }
}

#[async_trait]
impl GradeRepository for PostgresRepository {
    async fn insert_grade(
        &self,
        student_id: StudentId,
        new: &NewGrade,
    ) -> RepositoryResult<Grade> {
        let new = new.clone();
        self.with_conn(move |conn| {
            let row: GradeRow = diesel::insert_into(grades::table)
                .values(&NewGradeRow {
                    student_id: student_id.0,
                    grade: new.grade,
                    subject: new.subject.clone(),
                })
                .returning(GradeRow::as_returning())
                .get_result(conn)
                .map_err(RepositoryError::from)?;

            Ok(to_grade(row))
        })
        .await
    }

    async fn student_average(&self, student_id: StudentId) -> RepositoryResult<Option<f64>> {
        self.with_conn(move |conn| {
            // AVG over an empty scope is NULL, which maps to None here.
            grades::table
                .filter(grades::student_id.eq(student_id.0))
                .select(avg(grades::grade))
                .first::<Option<f64>>(conn)
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn global_average(&self) -> RepositoryResult<Option<f64>> {
        self.with_conn(|conn| {
            grades::table
                .select(avg(grades::grade))
                .first::<Option<f64>>(conn)
                .map_err(RepositoryError::from)
        })
        .await
    }
}
