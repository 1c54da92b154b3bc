use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, Theme, User, UserRow};
use crate::error::StoreError;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError>;
    async fn update_theme(&self, id: Uuid, theme: Theme) -> Result<User, StoreError>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str = "id, full_name, email, password_hash, theme, created_at";

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|d| d.code())
        .map_or(false, |code| code == "23505")
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::from))
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let res = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (full_name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.full_name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(row) => Ok(row.into()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate("email")),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let done = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.db)
            .await?;
        if done.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound.into());
        }
        Ok(())
    }

    async fn update_theme(&self, id: Uuid, theme: Theme) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET theme = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(theme.as_str())
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }
}
