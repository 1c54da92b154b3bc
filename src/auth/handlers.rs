use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{
            ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse, ProfileResponse,
            PublicUser, RegisterRequest, RegisterResponse, ThemeRequest, ThemeResponse,
        },
        services::{AuthService, CurrentUser},
    },
    error::{AppJson, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me))
        .route("/theme", put(update_theme).post(update_theme))
        .route("/password", put(change_password))
}

#[instrument(skip(auth, payload))]
pub async fn register(
    State(auth): State<AuthService>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let user = auth
        .register(&payload.full_name, &payload.email, &payload.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "User registered successfully".into(),
            user: user.into(),
        }),
    ))
}

#[instrument(skip(auth, payload))]
pub async fn login(
    State(auth): State<AuthService>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, user) = auth.login(&payload.email, &payload.password).await?;
    Ok(Json(LoginResponse {
        success: true,
        token,
        user: user.into(),
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        success: true,
        user: PublicUser::from(user),
    })
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_theme(
    State(auth): State<AuthService>,
    CurrentUser(user): CurrentUser,
    AppJson(payload): AppJson<ThemeRequest>,
) -> AppResult<Json<ThemeResponse>> {
    let theme = auth.update_theme(&user, &payload.theme).await?;
    info!(theme = %theme, "theme updated");
    Ok(Json(ThemeResponse {
        success: true,
        theme,
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn change_password(
    State(auth): State<AuthService>,
    CurrentUser(user): CurrentUser,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    auth.change_password(
        &user,
        &payload.current_password,
        &payload.new_password,
        &payload.confirm_password,
    )
    .await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Password updated successfully".into(),
    }))
}
