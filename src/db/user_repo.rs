use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, timestamp};
use crate::models::{Role, User};

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    user_name: String,
    email: String,
    password_hash: String,
    role: String,
    created_by: Option<String>,
    created_date: Option<String>,
    role_updated_by: Option<String>,
    role_updated_date: Option<String>,
}

impl UserRow {
    fn into_user(self) -> Result<User, sqlx::Error> {
        let role = Role::from_str(&self.role).map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(User {
            id: parse_uuid(&self.id)?,
            user_name: self.user_name,
            email: self.email,
            password_hash: self.password_hash,
            role,
            created_by: self.created_by.as_deref().map(parse_uuid).transpose()?,
            created_date: self.created_date.as_deref().map(parse_timestamp).transpose()?,
            role_updated_by: self.role_updated_by.as_deref().map(parse_uuid).transpose()?,
            role_updated_date: self
                .role_updated_date
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

const USER_COLUMNS: &str = "id, user_name, email, password_hash, role, created_by, created_date, role_updated_by, role_updated_date";

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a new user. A taken email surfaces as a unique-violation
    /// database error.
    pub async fn create(&self, user: &User) -> Result<User, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (id, user_name, email, password_hash, role, created_by, created_date, role_updated_by, role_updated_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.user_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(user.created_by.map(|id| id.to_string()))
        .bind(user.created_date.map(timestamp))
        .bind(user.role_updated_by.map(|id| id.to_string()))
        .bind(user.role_updated_date.map(timestamp))
        .execute(&self.pool)
        .await?;

        self.get_by_id(user.id)
            .await?
            .ok_or_else(|| sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Case-insensitive lookup.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER(?)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    pub async fn list(&self) -> Result<Vec<User>, sqlx::Error> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users ORDER BY email",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    /// Returns the number of rows changed (0 if the user does not exist).
    pub async fn update_role(
        &self,
        id: Uuid,
        role: Role,
        updated_by: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET role = ?, role_updated_by = ?, role_updated_date = ? WHERE id = ?",
        )
        .bind(role.to_string())
        .bind(updated_by.to_string())
        .bind(timestamp(updated_at))
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
