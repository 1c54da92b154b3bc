//! In-memory fakes for the persistence and model traits.

use std::{
    collections::VecDeque,
    sync::{Mutex, RwLock},
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{NewUser, Theme, User},
    },
    error::StoreError,
    llm::{ModelClient, ModelError, RawContent},
    scripts::{
        repo::ScriptRepo,
        repo_types::{NewScriptRequest, ScriptRequest},
    },
};

#[derive(Default)]
pub struct MemoryUserRepo {
    users: RwLock<Vec<User>>,
}

impl MemoryUserRepo {
    pub fn len(&self) -> usize {
        self.users.read().unwrap().len()
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().unwrap();
        if users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::Duplicate("email"));
        }
        let user = User {
            id: Uuid::new_v4(),
            full_name: new.full_name,
            email: new.email,
            password_hash: new.password_hash,
            theme: Theme::default(),
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn update_theme(&self, id: Uuid, theme: Theme) -> Result<User, StoreError> {
        let mut users = self.users.write().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        user.theme = theme;
        Ok(user.clone())
    }
}

/// Keeps records in insertion order; `list_by_user` walks them backwards.
#[derive(Default)]
pub struct MemoryScriptRepo {
    records: RwLock<Vec<ScriptRequest>>,
    fail_writes: bool,
}

impl MemoryScriptRepo {
    /// A store whose inserts always fail with a database error.
    pub fn failing() -> Self {
        Self {
            records: RwLock::default(),
            fail_writes: true,
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }
}

#[async_trait]
impl ScriptRepo for MemoryScriptRepo {
    async fn create(&self, new: NewScriptRequest) -> Result<ScriptRequest, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        if self.fail_writes {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let record = ScriptRequest {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            product_name: new.inputs.product_name,
            target_audience: new.inputs.target_audience,
            tone: new.inputs.tone,
            ad_style: new.inputs.ad_style,
            call_to_action: new.inputs.call_to_action,
            scripts: new.scripts,
            created_at: OffsetDateTime::now_utc(),
        };
        self.records.write().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ScriptRequest>, StoreError> {
        Ok(self
            .records
            .read()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelCall {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Replays queued responses in order and records every call.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<RawContent, ModelError>>>,
    calls: Mutex<Vec<ModelCall>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.then(Ok(RawContent::Text(text.into())))
    }

    pub fn then(self, response: Result<RawContent, ModelError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<RawContent, ModelError> {
        self.calls.lock().unwrap().push(ModelCall {
            prompt: prompt.to_string(),
            max_tokens,
            temperature,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::ResponseParsing("no scripted response".into())))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// `Script k: <tag> body k` for every k in `range`, one per line.
pub fn numbered_scripts(tag: &str, range: std::ops::RangeInclusive<usize>) -> String {
    range
        .map(|k| format!("Script {k}: {tag} body {k}\n"))
        .collect()
}
