use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Json, Response},
};

use crate::state::GatewayState;

/// Axum extractor that validates the `Authorization: Bearer <api_key>`
/// header and produces the caller id the key belongs to. Rejects with 401
/// when the header is missing or the key is unknown or revoked.
pub struct AuthCaller(pub String);

impl<S> FromRequestParts<S> for AuthCaller
where
    S: Send + Sync,
    Arc<GatewayState>: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gw = Arc::<GatewayState>::from_ref(state);

        let key = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        if let Some(key) = key
            && let Some(caller_id) = gw.keys.verify(key).await.ok().flatten()
        {
            return Ok(AuthCaller(caller_id));
        }

        Err(unauthorized())
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"success": false, "error": "not authenticated"})),
    )
        .into_response()
}
