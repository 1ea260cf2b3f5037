//! SQLite persistence for users, reviews, and bugs.
//!
//! # Schema Versioning
//!
//! The database uses SQLite's `user_version` pragma to track schema versions.
//! When the schema changes, increment `SCHEMA_VERSION` and add a migration
//! function in `run_migrations`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use critique_core::model::{Bug, Severity};

use crate::store::{RecentReview, ReviewRecord, ReviewStore, UserRecord, UserStats};

/// Current schema version. Increment when making schema changes.
///
/// When adding a new version:
/// 1. Increment this constant
/// 2. Add a migration function `migrate_v{N}_to_v{N+1}`
/// 3. Call it from `run_migrations`
const SCHEMA_VERSION: i32 = 1;

/// SQLite-backed [`ReviewStore`].
///
/// Uses a `Mutex<Connection>` because `rusqlite::Connection` is not `Sync`.
/// Operations run under `tokio::task::spawn_blocking` so the synchronous
/// rusqlite calls never block the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database file at the given path.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {:?}", path))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Create an in-memory database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Initialize the database schema and run any pending migrations.
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().expect("mutex poisoned");

        // Pin SQLite's standard default of foreign-key enforcement OFF. The
        // bundled libsqlite3-sys in some environments is compiled with
        // -DSQLITE_DEFAULT_FOREIGN_KEYS=1, which flips the per-connection
        // default ON; this code (anonymous reviews, submissions carrying an
        // arbitrary user_id) is written against the upstream default.
        conn.pragma_update(None, "foreign_keys", false)
            .context("Failed to disable foreign-key enforcement")?;

        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if current_version > SCHEMA_VERSION {
            anyhow::bail!(
                "Database schema version {} is newer than supported version {}. \
                 Please upgrade the application.",
                current_version,
                SCHEMA_VERSION
            );
        }

        if current_version < SCHEMA_VERSION {
            Self::run_migrations(&conn, current_version)?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }

        Ok(())
    }

    /// Run migrations from `from_version` up to `SCHEMA_VERSION`.
    fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
        if from_version < 1 {
            Self::migrate_v0_to_v1(conn)?;
        }

        // Future migrations go here:
        // if from_version < 2 {
        //     Self::migrate_v1_to_v2(conn)?;
        // }

        Ok(())
    }

    /// Migration v0 -> v1: Create initial schema.
    fn migrate_v0_to_v1(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS code_reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                language TEXT NOT NULL,
                code_snippet TEXT NOT NULL,
                quality_score INTEGER,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users (id)
            );

            CREATE TABLE IF NOT EXISTS bugs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                review_id INTEGER NOT NULL,
                line_number INTEGER,
                severity TEXT NOT NULL,
                message TEXT NOT NULL,
                suggestion TEXT,
                FOREIGN KEY (review_id) REFERENCES code_reviews (id)
            );

            CREATE INDEX IF NOT EXISTS idx_reviews_cache
            ON code_reviews(user_id, language);
            "#,
        )
        .context("Failed to create initial schema (v0 -> v1)")?;

        Ok(())
    }
}

#[async_trait]
impl ReviewStore for SqliteStore {
    async fn find_latest_review(
        &self,
        user_id: i64,
        language: &str,
        code: &str,
    ) -> Result<Option<ReviewRecord>> {
        let conn = self.conn.clone();
        let language = language.to_string();
        let code = code.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("mutex poisoned");
            conn.query_row(
                "SELECT id, quality_score FROM code_reviews
                 WHERE user_id = ?1 AND language = ?2 AND code_snippet = ?3
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                params![user_id, language, code],
                |row| {
                    Ok(ReviewRecord {
                        id: row.get(0)?,
                        quality_score: row.get(1)?,
                    })
                },
            )
            .optional()
            .context("Failed to query cached review")
        })
        .await
        .context("Storage task panicked")?
    }

    async fn insert_review(
        &self,
        user_id: Option<i64>,
        language: &str,
        code: &str,
        quality_score: i64,
    ) -> Result<i64> {
        let conn = self.conn.clone();
        let language = language.to_string();
        let code = code.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("mutex poisoned");
            conn.execute(
                "INSERT INTO code_reviews (user_id, language, code_snippet, quality_score)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, language, code, quality_score],
            )
            .context("Failed to insert review")?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .context("Storage task panicked")?
    }

    async fn update_review_score(&self, review_id: i64, quality_score: i64) -> Result<()> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("mutex poisoned");
            conn.execute(
                "UPDATE code_reviews SET quality_score = ?1 WHERE id = ?2",
                params![quality_score, review_id],
            )
            .context("Failed to update review score")?;
            Ok(())
        })
        .await
        .context("Storage task panicked")?
    }

    async fn insert_bugs(&self, review_id: i64, bugs: &[Bug]) -> Result<()> {
        let conn = self.conn.clone();
        let bugs = bugs.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("mutex poisoned");
            for bug in &bugs {
                conn.execute(
                    "INSERT INTO bugs (review_id, line_number, severity, message, suggestion)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        review_id,
                        bug.line,
                        bug.severity.as_str(),
                        bug.message,
                        bug.suggestion
                    ],
                )
                .context("Failed to insert bug")?;
            }
            Ok(())
        })
        .await
        .context("Storage task panicked")?
    }

    async fn list_bugs(&self, review_id: i64) -> Result<Vec<Bug>> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("mutex poisoned");
            let mut stmt = conn
                .prepare(
                    "SELECT id, line_number, severity, message, suggestion
                     FROM bugs WHERE review_id = ?1 ORDER BY id",
                )
                .context("Failed to prepare bug query")?;

            let rows = stmt
                .query_map(params![review_id], |row| {
                    let severity: String = row.get(2)?;
                    Ok(Bug {
                        id: row.get(0)?,
                        line: row.get(1)?,
                        severity: Severity::parse_lenient(&severity),
                        message: row.get(3)?,
                        suggestion: row.get(4)?,
                    })
                })
                .context("Failed to query bugs")?;

            let mut bugs = Vec::new();
            for row in rows {
                bugs.push(row.context("Failed to read bug row")?);
            }
            Ok(bugs)
        })
        .await
        .context("Storage task panicked")?
    }

    async fn insert_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>> {
        let conn = self.conn.clone();
        let first_name = first_name.to_string();
        let last_name = last_name.to_string();
        let email = email.to_string();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("mutex poisoned");

            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM users WHERE email = ?1",
                    params![email],
                    |row| row.get(0),
                )
                .optional()
                .context("Failed to check for existing email")?;

            if existing.is_some() {
                return Ok(None);
            }

            // Stored as-is. Credentials here are plain equality checks, not
            // real authentication.
            conn.execute(
                "INSERT INTO users (first_name, last_name, email, password_hash)
                 VALUES (?1, ?2, ?3, ?4)",
                params![first_name, last_name, email, password],
            )
            .context("Failed to insert user")?;

            Ok(Some(UserRecord {
                id: conn.last_insert_rowid(),
                first_name,
                last_name,
                email,
            }))
        })
        .await
        .context("Storage task panicked")?
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<UserRecord>> {
        let conn = self.conn.clone();
        let email = email.to_string();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("mutex poisoned");
            conn.query_row(
                "SELECT id, first_name, last_name, email FROM users
                 WHERE email = ?1 AND password_hash = ?2",
                params![email, password],
                |row| {
                    Ok(UserRecord {
                        id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        email: row.get(3)?,
                    })
                },
            )
            .optional()
            .context("Failed to query credentials")
        })
        .await
        .context("Storage task panicked")?
    }

    async fn user_stats(&self, user_id: i64) -> Result<UserStats> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("mutex poisoned");

            let total_reviews: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM code_reviews WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )
                .context("Failed to count reviews")?;

            let bugs_detected: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM bugs
                     WHERE review_id IN (SELECT id FROM code_reviews WHERE user_id = ?1)",
                    params![user_id],
                    |row| row.get(0),
                )
                .context("Failed to count bugs")?;

            let avg_score: Option<f64> = conn
                .query_row(
                    "SELECT AVG(quality_score) FROM code_reviews WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )
                .context("Failed to average scores")?;

            Ok(UserStats {
                total_reviews,
                bugs_detected,
                avg_quality_score: avg_score.map(|v| v.round() as i64).unwrap_or(0),
            })
        })
        .await
        .context("Storage task panicked")?
    }

    async fn recent_reviews(&self, user_id: i64) -> Result<Vec<RecentReview>> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("mutex poisoned");
            let mut stmt = conn
                .prepare(
                    "SELECT id, language, quality_score, date(created_at)
                     FROM code_reviews
                     WHERE user_id = ?1
                     ORDER BY created_at DESC, id DESC LIMIT 5",
                )
                .context("Failed to prepare recent-reviews query")?;

            let rows = stmt
                .query_map(params![user_id], |row| {
                    Ok(RecentReview {
                        id: row.get(0)?,
                        language: row.get(1)?,
                        quality_score: row.get(2)?,
                        date: row.get(3)?,
                    })
                })
                .context("Failed to query recent reviews")?;

            let mut reviews = Vec::new();
            for row in rows {
                reviews.push(row.context("Failed to read review row")?);
            }
            Ok(reviews)
        })
        .await
        .context("Storage task panicked")?
    }
}
