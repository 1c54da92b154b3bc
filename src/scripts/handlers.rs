use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::services::CurrentUser,
    error::{AppJson, AppResult},
    scripts::{
        dto::{GenerateRequest, GenerateResponse, HistoryResponse},
        services::ScriptGenerator,
    },
    state::AppState,
};

// --- public routers ---

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/scripts/generate", post(generate))
}

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/scripts/history", get(history))
}

// --- handlers ---

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn generate(
    State(generator): State<ScriptGenerator>,
    CurrentUser(user): CurrentUser,
    AppJson(payload): AppJson<GenerateRequest>,
) -> AppResult<Json<GenerateResponse>> {
    let record = generator.generate(user.id, payload.into()).await?;
    Ok(Json(GenerateResponse {
        success: true,
        scripts: record.scripts,
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn history(
    State(generator): State<ScriptGenerator>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<HistoryResponse>> {
    let scripts = generator.history(user.id).await?;
    Ok(Json(HistoryResponse {
        success: true,
        scripts,
    }))
}
