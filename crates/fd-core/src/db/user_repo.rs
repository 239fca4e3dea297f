//! Service user repository for database operations.

use super::{DbError, DbPool};
use crate::auth::{Role, User};
use async_trait::async_trait;
use uuid::Uuid;

#[cfg(feature = "database")]
use chrono::{DateTime, Utc};

/// Partial update for a user. The password moves through
/// `update_password`, not here.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<Role>,
    pub enabled: Option<bool>,
}

/// Repository trait for service user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User, DbError>;

    async fn get(&self, id: Uuid) -> Result<Option<User>, DbError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DbError>;

    /// All users, ordered by username. The user table is small; listing is
    /// unpaginated.
    async fn list(&self) -> Result<Vec<User>, DbError>;

    async fn update(&self, id: Uuid, update: &UserUpdate) -> Result<User, DbError>;

    /// Replaces the stored password hash.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DbError>;

    /// Stamps the last successful login.
    async fn record_login(&self, id: Uuid) -> Result<(), DbError>;

    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;

    /// True if any user exists (used by first-run seeding).
    async fn any_exist(&self) -> Result<bool, DbError>;

    /// Number of enabled admin accounts.
    async fn count_enabled_admins(&self) -> Result<u64, DbError>;
}

#[cfg(feature = "database")]
const USER_COLUMNS: &str = "id, email, username, password_hash, display_name, role, enabled, last_login_at, created_at, updated_at";

// ============================================================================
// SQLite implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    username: String,
    password_hash: String,
    display_name: Option<String>,
    role: String,
    enabled: i32,
    last_login_at: Option<String>,
    created_at: String,
    updated_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: Uuid::parse_str(&row.id).map_err(|e| DbError::Serialization(e.to_string()))?,
            email: row.email,
            username: row.username,
            password_hash: row.password_hash,
            display_name: row.display_name,
            role: row
                .role
                .parse()
                .map_err(|e: String| DbError::Serialization(e))?,
            enabled: row.enabled != 0,
            last_login_at: row.last_login_at.as_deref().map(parse_ts).transpose()?,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

#[cfg(feature = "database")]
fn parse_ts(s: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Serialization(e.to_string()))
}

/// SQLite implementation of UserRepository.
#[cfg(feature = "database")]
pub struct SqliteUserRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteUserRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &User) -> Result<User, DbError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, password_hash, display_name, role, enabled, last_login_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(user.role.as_db_str())
        .bind(user.enabled as i32)
        .bind(user.last_login_at.map(|t| t.to_rfc3339()))
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(user.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> Result<Vec<User>, DbError> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users ORDER BY username ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update(&self, id: Uuid, update: &UserUpdate) -> Result<User, DbError> {
        let now = Utc::now().to_rfc3339();

        let mut set_clauses = vec!["updated_at = ?".to_string()];
        let mut values: Vec<String> = vec![now];

        if let Some(email) = &update.email {
            set_clauses.push("email = ?".to_string());
            values.push(email.clone());
        }
        if let Some(display_name) = &update.display_name {
            set_clauses.push("display_name = ?".to_string());
            values.push(display_name.clone());
        }
        if let Some(role) = update.role {
            set_clauses.push("role = ?".to_string());
            values.push(role.as_db_str().to_string());
        }
        if let Some(enabled) = update.enabled {
            set_clauses.push("enabled = ?".to_string());
            values.push((enabled as i32).to_string());
        }

        let query = format!("UPDATE users SET {} WHERE id = ?", set_clauses.join(", "));

        let mut query_builder = sqlx::query(&query);
        for value in &values {
            query_builder = query_builder.bind(value);
        }
        query_builder = query_builder.bind(id.to_string());
        query_builder.execute(&self.pool).await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    async fn record_login(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn any_exist(&self) -> Result<bool, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    async fn count_enabled_admins(&self) -> Result<u64, DbError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin' AND enabled = 1")
                .fetch_one(&self.pool)
                .await?;

        Ok(count as u64)
    }
}

// ============================================================================
// PostgreSQL implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgUserRow {
    id: Uuid,
    email: String,
    username: String,
    password_hash: String,
    display_name: Option<String>,
    role: String,
    enabled: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl TryFrom<PgUserRow> for User {
    type Error = DbError;

    fn try_from(row: PgUserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            username: row.username,
            password_hash: row.password_hash,
            display_name: row.display_name,
            role: row
                .role
                .parse()
                .map_err(|e: String| DbError::Serialization(e))?,
            enabled: row.enabled,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL implementation of UserRepository.
#[cfg(feature = "database")]
pub struct PgUserRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgUserRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &User) -> Result<User, DbError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, password_hash, display_name, role, enabled, last_login_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(user.role.as_db_str())
        .bind(user.enabled)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(user.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let row: Option<PgUserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let row: Option<PgUserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> Result<Vec<User>, DbError> {
        let rows: Vec<PgUserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users ORDER BY username ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update(&self, id: Uuid, update: &UserUpdate) -> Result<User, DbError> {
        sqlx::query(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                display_name = COALESCE($3, display_name),
                role = COALESCE($4, role),
                enabled = COALESCE($5, enabled),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&update.email)
        .bind(&update.display_name)
        .bind(update.role.map(|r| r.as_db_str()))
        .bind(update.enabled)
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DbError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    async fn record_login(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn any_exist(&self) -> Result<bool, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    async fn count_enabled_admins(&self) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE role = 'admin' AND enabled = TRUE",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_user_repository(pool: &DbPool) -> Box<dyn UserRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteUserRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgUserRepository::new(pool.clone())),
    }
}
