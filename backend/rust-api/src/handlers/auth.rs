use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;

use crate::{
    error::ApiError,
    metrics::AUTH_CALLBACKS_TOTAL,
    models::auth::CallbackParams,
    services::{session_service::SESSION_COOKIE, AppState},
};

const DEFAULT_NEXT: &str = "/learn";

/// Characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn login_error_url(site_url: &str, message: &str) -> String {
    format!(
        "{}/login?error={}",
        site_url,
        utf8_percent_encode(message, COMPONENT)
    )
}

/// Only same-origin absolute paths are accepted as redirect targets.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => DEFAULT_NEXT,
    }
}

fn session_cookie(value: String, max_age: time::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

/// GET /auth/callback - provider redirect with query parameters
pub async fn callback_get(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    handle_callback(&state, jar, params).await
}

/// POST /auth/callback - form_post response mode
pub async fn callback_post(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(params): Form<CallbackParams>,
) -> Response {
    handle_callback(&state, jar, params).await
}

async fn handle_callback(state: &AppState, jar: CookieJar, params: CallbackParams) -> Response {
    let site_url = &state.config.site_url;

    if let Some(error) = params.error.as_deref().filter(|e| !e.is_empty()) {
        let message = params
            .error_description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(error);
        tracing::warn!("Auth provider returned an error: {}", message);
        AUTH_CALLBACKS_TOTAL
            .with_label_values(&["provider_error"])
            .inc();
        return Redirect::to(&login_error_url(site_url, message)).into_response();
    }

    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        AUTH_CALLBACKS_TOTAL.with_label_values(&["no_code"]).inc();
        return Redirect::to(&login_error_url(site_url, "no_code")).into_response();
    };

    let user = match state
        .auth
        .exchange_code(code, params.code_verifier.as_deref())
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Auth code exchange failed: {}", e);
            AUTH_CALLBACKS_TOTAL
                .with_label_values(&["exchange_failed"])
                .inc();
            return Redirect::to(&login_error_url(site_url, &e.to_string())).into_response();
        }
    };

    if let Err(e) = state.repository.ensure_profile(&user).await {
        tracing::error!("Failed to ensure profile for {}: {}", user.id, e);
        AUTH_CALLBACKS_TOTAL.with_label_values(&["error"]).inc();
        return Redirect::to(&login_error_url(site_url, &e.to_string())).into_response();
    }

    let session = match state.sessions.create(user).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Failed to create session: {}", e);
            AUTH_CALLBACKS_TOTAL.with_label_values(&["error"]).inc();
            return Redirect::to(&login_error_url(site_url, &e.to_string())).into_response();
        }
    };

    tracing::info!("User signed in: {}", session.user.id);
    AUTH_CALLBACKS_TOTAL.with_label_values(&["success"]).inc();

    let jar = jar.add(session_cookie(
        session.id,
        time::Duration::seconds(state.config.session_ttl_seconds as i64),
        state.config.cookie_secure,
    ));
    let target = format!("{}{}", site_url, safe_next(params.next.as_deref()));

    (jar, Redirect::to(&target)).into_response()
}

/// POST /auth/logout - revoke the session and clear the cookie
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(session_id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        state.sessions.revoke(&session_id).await.map_err(|e| {
            tracing::error!("Failed to revoke session: {}", e);
            ApiError::internal(e.to_string())
        })?;
        tracing::info!("Session revoked");
    }

    let jar = jar.add(session_cookie(
        String::new(),
        time::Duration::ZERO,
        state.config.cookie_secure,
    ));

    Ok((StatusCode::NO_CONTENT, jar))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_must_be_local_path() {
        assert_eq!(safe_next(None), "/learn");
        assert_eq!(safe_next(Some("/learn/astronomy")), "/learn/astronomy");
        assert_eq!(safe_next(Some("//evil.example.com")), "/learn");
        assert_eq!(safe_next(Some("https://evil.example.com")), "/learn");
        assert_eq!(safe_next(Some("/\\evil.example.com")), "/learn");
    }

    #[test]
    fn login_error_is_component_encoded() {
        assert_eq!(
            login_error_url("https://astro.example.com", "Email link is invalid or has expired"),
            "https://astro.example.com/login?error=Email%20link%20is%20invalid%20or%20has%20expired"
        );
        assert_eq!(
            login_error_url("", "a&b=c (x)"),
            "/login?error=a%26b%3Dc%20(x)"
        );
    }
}
