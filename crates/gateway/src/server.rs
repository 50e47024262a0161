use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::{FromRef, Query, State},
        http::StatusCode,
        response::{IntoResponse, Json},
        routing::{get, post},
    },
    serde::Deserialize,
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
    url::Url,
};

use crate::{auth_middleware::AuthCaller, state::GatewayState};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayState>,
}

impl FromRef<AppState> for Arc<GatewayState> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.gateway)
    }
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/scrape", post(scrape_handler))
        .route("/api/history", get(history_handler))
        .layer(cors)
        .with_state(AppState { gateway: state })
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: Arc<GatewayState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
struct ScrapeBody {
    #[serde(default)]
    prompt: String,
    /// Level page to interrogate; falls back to the configured default.
    target_url: Option<Url>,
}

async fn scrape_handler(
    State(state): State<AppState>,
    AuthCaller(caller_id): AuthCaller,
    Json(body): Json<ScrapeBody>,
) -> impl IntoResponse {
    if body.prompt.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"success": false, "error": "prompt is required"})),
        );
    }

    let target_url = body
        .target_url
        .unwrap_or_else(|| state.gateway.default_target_url.clone());

    match state
        .gateway
        .scraper
        .answer(&caller_id, target_url, body.prompt.clone())
        .await
    {
        Ok(answer) => {
            if let Err(error) = state
                .gateway
                .history
                .record(&caller_id, &body.prompt, &answer)
                .await
            {
                tracing::warn!(%error, "failed to record history entry");
            }
            (
                StatusCode::OK,
                Json(serde_json::json!({"success": true, "data": {"answer": answer}})),
            )
        }
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"success": false, "error": error.to_string()})),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    limit: u32,
}

fn default_history_limit() -> u32 {
    50
}

async fn history_handler(
    State(state): State<AppState>,
    AuthCaller(caller_id): AuthCaller,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    match state.gateway.history.list(&caller_id, query.limit).await {
        Ok(entries) => (
            StatusCode::OK,
            Json(serde_json::json!({"success": true, "data": entries})),
        ),
        Err(error) => {
            tracing::error!(%error, "failed to list history");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"success": false, "error": "internal error"})),
            )
        }
    }
}
