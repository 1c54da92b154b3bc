use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::FieldErrors;

/// User-supplied fields of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptInputs {
    pub product_name: String,
    pub target_audience: String,
    pub tone: String,
    pub ad_style: String,
    pub call_to_action: Option<String>,
}

impl ScriptInputs {
    /// Every field except `call_to_action` must be non-blank.
    pub fn validate(&self) -> Result<(), String> {
        let mut errs = FieldErrors::new();
        errs.require("productName", &self.product_name);
        errs.require("targetAudience", &self.target_audience);
        errs.require("tone", &self.tone);
        errs.require("adStyle", &self.ad_style);
        errs.into_result().map_err(|e| e.to_string())
    }
}

/// A record about to be inserted into the script store.
#[derive(Debug, Clone)]
pub struct NewScriptRequest {
    pub user_id: Uuid,
    pub inputs: ScriptInputs,
    pub scripts: Vec<String>,
}

impl NewScriptRequest {
    pub fn validate(&self) -> Result<(), String> {
        self.inputs.validate()?;
        if self.scripts.is_empty() {
            return Err("scripts must not be empty".into());
        }
        if self.scripts.iter().any(|s| s.trim().is_empty()) {
            return Err("scripts must not contain empty entries".into());
        }
        Ok(())
    }
}

/// One stored generation event. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_name: String,
    pub target_audience: String,
    pub tone: String,
    pub ad_style: String,
    pub call_to_action: Option<String>,
    pub scripts: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
