use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity returned by the hosted auth service after a code exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Server-side session record, stored as JSON under `session:{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub id: String,
    pub user: AuthUser,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Query or form parameters the auth provider sends back to `/auth/callback`.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub next: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    /// PKCE verifier when the browser flow kept it client side.
    pub code_verifier: Option<String>,
}
