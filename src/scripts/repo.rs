use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewScriptRequest, ScriptRequest};
use crate::error::StoreError;

/// Append-only per-user history of generation requests.
#[async_trait]
pub trait ScriptRepo: Send + Sync {
    /// Inserts a new record. Blank required fields or an empty script list are rejected.
    async fn create(&self, new: NewScriptRequest) -> Result<ScriptRequest, StoreError>;

    /// All records owned by `user_id`, newest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ScriptRequest>, StoreError>;
}

#[derive(Clone)]
pub struct PgScriptRepo {
    db: PgPool,
}

impl PgScriptRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ScriptRepo for PgScriptRepo {
    async fn create(&self, new: NewScriptRequest) -> Result<ScriptRequest, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        let NewScriptRequest {
            user_id,
            inputs,
            scripts,
        } = new;

        let row = sqlx::query_as::<_, ScriptRequest>(
            r#"
            INSERT INTO script_requests
                (user_id, product_name, target_audience, tone, ad_style, call_to_action, scripts)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, product_name, target_audience, tone, ad_style,
                      call_to_action, scripts, created_at
            "#,
        )
        .bind(user_id)
        .bind(inputs.product_name)
        .bind(inputs.target_audience)
        .bind(inputs.tone)
        .bind(inputs.ad_style)
        .bind(inputs.call_to_action)
        .bind(scripts)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ScriptRequest>, StoreError> {
        let rows = sqlx::query_as::<_, ScriptRequest>(
            r#"
            SELECT id, user_id, product_name, target_audience, tone, ad_style,
                   call_to_action, scripts, created_at
            FROM script_requests
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
