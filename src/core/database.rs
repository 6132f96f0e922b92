// src/core/database.rs
//! SQLite persistence for users, credits and stored analyses

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

// ===== Connection Management =====

#[derive(Debug)]
pub struct DatabaseConfig {
    pub database_path: PathBuf,
    pub pool: Option<SqlitePool>,
}

impl DatabaseConfig {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            database_path,
            pool: None,
        }
    }

    /// Single-connection in-memory database, used by tests and dry runs
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory SQLite database")?;

        let db_config = Self {
            database_path: PathBuf::from(":memory:"),
            pool: Some(pool),
        };
        db_config.migrate().await?;
        Ok(db_config)
    }

    /// Initialize the database connection pool
    pub async fn init_pool(&mut self) -> Result<()> {
        if let Some(parent) = self.database_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", self.database_path.display());
        let pool = SqlitePool::connect(&database_url)
            .await
            .context("Failed to connect to SQLite database")?;
        self.pool = Some(pool);

        info!("Database connection pool initialized: {}", database_url);
        Ok(())
    }

    /// Get the database pool
    pub fn pool(&self) -> Result<&SqlitePool> {
        self.pool.as_ref().ok_or_else(|| {
            anyhow::anyhow!("Database pool not initialized. Call init_pool() first.")
        })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        let pool = self.pool()?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                plan TEXT NOT NULL DEFAULT 'trial',
                credits INTEGER NOT NULL DEFAULT 0 CHECK (credits >= 0),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analyses (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                linkedin_url TEXT NOT NULL,
                profile_data TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);")
            .execute(pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_analyses_user ON analyses(user_id, created_at);")
            .execute(pool)
            .await?;

        info!("Database migrations completed successfully");
        Ok(())
    }
}

// ===== Models =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => anyhow::bail!("Unknown role: {}. Use 'user' or 'admin'", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Trial,
    Subscribed,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Trial => "trial",
            Plan::Subscribed => "subscribed",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "trial" => Ok(Plan::Trial),
            "subscribed" | "subscription" => Ok(Plan::Subscribed),
            other => anyhow::bail!("Unknown plan: {}. Use 'trial' or 'subscribed'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: String,
    pub plan: String,
    pub credits: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> UserRole {
        self.role.parse().unwrap_or(UserRole::User)
    }

    pub fn plan(&self) -> Plan {
        self.plan.parse().unwrap_or(Plan::Trial)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == UserRole::Admin
    }

    pub fn has_credits(&self) -> bool {
        self.credits > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnalysisRecord {
    pub id: String,
    pub user_id: String,
    pub linkedin_url: String,
    pub profile_data: String,
    pub created_at: DateTime<Utc>,
}

/// Analysis stored together with the balance left after its credit was spent
#[derive(Debug, Clone)]
pub struct ChargedAnalysis {
    pub record: AnalysisRecord,
    pub credits_remaining: i64,
}

/// Stored analysis joined with its owner's email
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalysisExportRow {
    pub email: String,
    pub linkedin_url: String,
    pub profile_data: String,
    pub created_at: DateTime<Utc>,
}

// ===== User Repository =====

const USER_COLUMNS: &str = "id, email, role, plan, credits, created_at, updated_at";

pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Insert the user unless a row with this id already exists
    pub async fn create_if_missing(
        &self,
        id: &str,
        email: &str,
        role: UserRole,
        credits: i64,
    ) -> Result<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, role, plan, credits, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(role.as_str())
        .bind(Plan::Trial.as_str())
        .bind(credits)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY created_at ASC, email ASC",
            USER_COLUMNS
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    pub async fn update_email(&self, id: &str, email: &str) -> Result<()> {
        sqlx::query("UPDATE users SET email = ?, updated_at = ? WHERE id = ?")
            .bind(email)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_credits(&self, id: &str, credits: i64) -> Result<Option<User>> {
        if credits < 0 {
            anyhow::bail!("Credits cannot be negative: {}", credits);
        }

        let result = sqlx::query("UPDATE users SET credits = ?, updated_at = ? WHERE id = ?")
            .bind(credits)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await?;

        self.updated(id, result.rows_affected(), "credits").await
    }

    pub async fn set_role(&self, id: &str, role: UserRole) -> Result<Option<User>> {
        let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await?;

        self.updated(id, result.rows_affected(), "role").await
    }

    pub async fn set_plan(&self, id: &str, plan: Plan) -> Result<Option<User>> {
        let result = sqlx::query("UPDATE users SET plan = ?, updated_at = ? WHERE id = ?")
            .bind(plan.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await?;

        self.updated(id, result.rows_affected(), "plan").await
    }

    async fn updated(&self, id: &str, rows_affected: u64, field: &str) -> Result<Option<User>> {
        if rows_affected == 0 {
            return Ok(None);
        }

        info!("Updated {} for user {}", field, id);
        self.find(id).await
    }
}

// ===== Analysis Repository =====

const ANALYSIS_COLUMNS: &str = "id, user_id, linkedin_url, profile_data, created_at";

pub struct AnalysisRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AnalysisRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store an analysis and spend one credit in the same transaction.
    ///
    /// Returns `None` without storing anything when the user has no credit left,
    /// otherwise the record and the balance committed with it.
    pub async fn insert_charging_credit(
        &self,
        user_id: &str,
        linkedin_url: &str,
        profile_data: &str,
    ) -> Result<Option<ChargedAnalysis>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let credits_remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE users SET credits = credits - 1, updated_at = ?
            WHERE id = ? AND credits > 0
            RETURNING credits
            "#,
        )
        .bind(now)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(credits_remaining) = credits_remaining else {
            tx.rollback().await?;
            return Ok(None);
        };

        let record = AnalysisRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            linkedin_url: linkedin_url.to_string(),
            profile_data: profile_data.to_string(),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO analyses (id, user_id, linkedin_url, profile_data, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.linkedin_url)
        .bind(&record.profile_data)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            "Stored analysis {} for user {} ({} credits left)",
            record.id, user_id, credits_remaining
        );
        Ok(Some(ChargedAnalysis {
            record,
            credits_remaining,
        }))
    }

    pub async fn find_for_user(&self, id: &str, user_id: &str) -> Result<Option<AnalysisRecord>> {
        let record = sqlx::query_as::<_, AnalysisRecord>(&format!(
            "SELECT {} FROM analyses WHERE id = ? AND user_id = ?",
            ANALYSIS_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<AnalysisRecord>> {
        let records = sqlx::query_as::<_, AnalysisRecord>(&format!(
            "SELECT {} FROM analyses WHERE user_id = ? ORDER BY created_at DESC",
            ANALYSIS_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    pub async fn delete_for_user(&self, id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM analyses WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_all(&self) -> Result<Vec<AnalysisExportRow>> {
        let rows = sqlx::query_as::<_, AnalysisExportRow>(
            r#"
            SELECT users.email AS email, analyses.linkedin_url AS linkedin_url,
                   analyses.profile_data AS profile_data, analyses.created_at AS created_at
            FROM analyses
            JOIN users ON users.id = analyses.user_id
            ORDER BY analyses.created_at ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

// ===== User Service =====

pub struct UserService<'a> {
    repo: UserRepository<'a>,
}

impl<'a> UserService<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            repo: UserRepository::new(pool),
        }
    }

    /// Fetch the user behind a verified token, creating the row on first sight
    pub async fn get_or_create(
        &self,
        id: &str,
        email: &str,
        trial_credits: i64,
        admin_emails: &[String],
    ) -> Result<User> {
        if let Some(user) = self.repo.find(id).await? {
            if user.email != email {
                self.repo.update_email(id, email).await?;
                return Ok(User {
                    email: email.to_string(),
                    ..user
                });
            }
            return Ok(user);
        }

        let role = if admin_emails.iter().any(|admin| admin.eq_ignore_ascii_case(email)) {
            UserRole::Admin
        } else {
            UserRole::User
        };

        if self
            .repo
            .create_if_missing(id, email, role, trial_credits)
            .await?
        {
            info!(
                "Created {} account for {} with {} trial credits",
                role, email, trial_credits
            );
        }

        self.repo
            .find(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User {} missing right after creation", id))
    }
}
