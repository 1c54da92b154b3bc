use std::net::SocketAddr;

use axum::{
    http::{request::Parts, HeaderValue},
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::AppError;
use crate::state::AppState;
use crate::{auth, scripts};

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    Router::new()
        .route("/", get(|| async { "Welcome to the PromoGenie API" }))
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(scripts::router())
                .route("/health", get(|| async { "ok" })),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = res.status();
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

async fn not_found() -> AppError {
    AppError::NotFound("Resource not found".into())
}

/// Permissive when no origins are configured. `*.example.com` entries match any
/// origin ending in `.example.com`.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return base.allow_origin(Any);
    }
    let allowed = origins.to_vec();
    base.allow_origin(AllowOrigin::predicate(
        move |origin: &HeaderValue, _: &Parts| {
            origin
                .to_str()
                .map(|o| origin_allowed(&allowed, o))
                .unwrap_or(false)
        },
    ))
}

fn origin_allowed(allowed: &[String], origin: &str) -> bool {
    allowed.iter().any(|entry| match entry.strip_prefix('*') {
        Some(suffix) => origin.ends_with(suffix),
        None => entry == origin,
    })
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
