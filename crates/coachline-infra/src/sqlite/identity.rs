//! SQLite identity directory implementation.
//!
//! Implements `IdentityDirectory` from `coachline-core` over the `users` table.

use coachline_core::repository::IdentityDirectory;
use coachline_types::error::RepositoryError;
use coachline_types::user::{Identity, Role, User, UserCredentials, UserId};
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_user_id};

/// SQLite-backed implementation of `IdentityDirectory`.
#[derive(Clone)]
pub struct SqliteIdentityDirectory {
    pool: DatabasePool,
}

impl SqliteIdentityDirectory {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain User.
struct UserRow {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: String,
}

impl UserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: row.try_get("role")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_credentials(self) -> Result<UserCredentials, RepositoryError> {
        let role: Role = self.role.parse().map_err(RepositoryError::Query)?;
        Ok(UserCredentials {
            user: User {
                id: parse_user_id(&self.id)?,
                username: Identity::new(self.username),
                email: self.email,
                role,
                created_at: parse_datetime(&self.created_at)?,
            },
            password_hash: self.password_hash,
        })
    }
}

impl IdentityDirectory for SqliteIdentityDirectory {
    async fn lookup_identity(&self, identity: &Identity) -> Result<Option<UserId>, RepositoryError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?")
            .bind(identity.as_str())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|(id,)| parse_user_id(&id)).transpose()
    }

    async fn create_user(&self, credentials: &UserCredentials) -> Result<User, RepositoryError> {
        let user = &credentials.user;
        let result = sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(user.username.as_str())
        .bind(&user.email)
        .bind(&credentials.password_hash)
        .bind(user.role.to_string())
        .bind(format_datetime(&user.created_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(user.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("username '{}' already exists", user.username)),
            ),
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn find_credentials(
        &self,
        identity: &Identity,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(identity.as_str())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let user_row =
                    UserRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(user_row.into_credentials()?))
            }
            None => Ok(None),
        }
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, RepositoryError> {
        let rows = match role {
            Some(role) => {
                sqlx::query("SELECT * FROM users WHERE role = ? ORDER BY username ASC")
                    .bind(role.to_string())
                    .fetch_all(&self.pool.reader)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM users ORDER BY username ASC")
                    .fetch_all(&self.pool.reader)
                    .await
            }
        }
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let user_row =
                    UserRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(user_row.into_credentials()?.user)
            })
            .collect()
    }
}
