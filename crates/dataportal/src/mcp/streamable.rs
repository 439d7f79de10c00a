//! Streamable HTTP transport.
//!
//! - `POST /` carries one JSON-RPC message; requests get a JSON response,
//!   notifications get `202 Accepted`
//! - `DELETE /` terminates the session and cancels its in-flight calls
//! - the session travels in the `Mcp-Session-Id` header

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;

use super::protocol::{handle_bytes, Reply};
use super::McpState;

pub const SESSION_HEADER: &str = "mcp-session-id";

/// Routes for the streamable transport, to be nested under `/mcp`.
pub fn router(state: Arc<McpState>) -> Router {
    Router::new()
        .route("/", post(post_handler).delete(delete_handler))
        .with_state(state)
}

fn session_hint(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

#[tracing::instrument(skip_all, fields(session_id = tracing::field::Empty))]
pub async fn post_handler(
    State(state): State<Arc<McpState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let session_id = state.sessions.get_or_create(session_hint(&headers));
    tracing::Span::current().record("session_id", session_id.as_str());
    state.sessions.touch(&session_id);

    match handle_bytes(&state, &session_id, &body).await {
        Reply::Response(body) | Reply::Cancelled(body) => {
            json_response(StatusCode::OK, &session_id, body)
        }
        Reply::Rejected(body) => json_response(StatusCode::BAD_REQUEST, &session_id, body),
        Reply::Accepted => with_session(StatusCode::ACCEPTED.into_response(), &session_id),
    }
}

#[tracing::instrument(skip_all, fields(session_id = tracing::field::Empty))]
pub async fn delete_handler(
    State(state): State<Arc<McpState>>,
    headers: HeaderMap,
) -> Response {
    let Some(session_id) = session_hint(&headers) else {
        return (StatusCode::BAD_REQUEST, "Missing Mcp-Session-Id header").into_response();
    };
    tracing::Span::current().record("session_id", session_id);

    if state.sessions.remove(session_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, "Unknown session").into_response()
    }
}

fn json_response(status: StatusCode, session_id: &str, body: Value) -> Response {
    let mut response = Json(body).into_response();
    *response.status_mut() = status;
    with_session(response, session_id)
}

fn with_session(mut response: Response, session_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}
