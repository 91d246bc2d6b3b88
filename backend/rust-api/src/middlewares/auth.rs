use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::AuthUser;
use crate::services::session_service::{SessionStoreError, SESSION_COOKIE};
use crate::services::AppState;

fn session_id(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

async fn resolve_user(
    state: &AppState,
    session_id: Option<String>,
) -> Result<Option<AuthUser>, SessionStoreError> {
    let Some(session_id) = session_id else {
        return Ok(None);
    };

    Ok(state
        .sessions
        .get(&session_id)
        .await?
        .map(|session| session.user))
}

/// Rejects requests without a live session with 401 `{ "error": "Unauthorized" }`.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let session_id = session_id(request.headers());
    match resolve_user(&state, session_id).await {
        Ok(Some(user)) => {
            tracing::debug!("Authenticated user: {}", user.id);
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => ApiError::unauthorized().into_response(),
        Err(e) => {
            tracing::error!("Session lookup failed: {}", e);
            ApiError::internal(e.to_string()).into_response()
        }
    }
}

/// Attaches the user when a valid session cookie is present; never rejects.
pub async fn optional_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let session_id = session_id(request.headers());
    match resolve_user(&state, session_id).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Session lookup failed, continuing anonymously: {}", e),
    }

    next.run(request).await
}
