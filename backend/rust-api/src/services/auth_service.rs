use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

use crate::config::AuthProviderConfig;
use crate::models::AuthUser;

#[derive(Debug, thiserror::Error)]
pub enum AuthGatewayError {
    /// The provider refused the code; the message is shown to the user.
    #[error("{0}")]
    Rejected(String),
    #[error("Auth service unreachable: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for AuthGatewayError {
    fn from(err: reqwest::Error) -> Self {
        AuthGatewayError::Transport(err.to_string())
    }
}

/// Exchanges one-time authorization codes for an identity.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<AuthUser, AuthGatewayError>;
}

/// Talks to the hosted auth service over its REST token endpoint.
pub struct HttpAuthGateway {
    client: reqwest::Client,
    token_url: Url,
    anon_key: String,
}

impl HttpAuthGateway {
    pub fn new(config: &AuthProviderConfig) -> Result<Self, AuthGatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            token_url: token_url(&config.url)?,
            anon_key: config.anon_key.clone(),
        })
    }
}

fn token_url(base_url: &str) -> Result<Url, AuthGatewayError> {
    let mut url = Url::parse(&format!("{}/auth/v1/token", base_url.trim_end_matches('/')))
        .map_err(|e| AuthGatewayError::Transport(format!("invalid auth url: {}", e)))?;
    url.query_pairs_mut().append_pair("grant_type", "pkce");
    Ok(url)
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<AuthUser, AuthGatewayError> {
        let response = self
            .client
            .post(self.token_url.clone())
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&json!({
                "auth_code": code,
                "code_verifier": code_verifier.unwrap_or_default(),
            }))
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = provider_error_message(&body)
                .unwrap_or_else(|| format!("Code exchange failed with status {}", status));
            tracing::warn!("Auth code exchange rejected ({}): {}", status, message);
            return Err(AuthGatewayError::Rejected(message));
        }

        parse_user(&body).ok_or_else(|| {
            AuthGatewayError::Rejected("Auth service returned no user".to_string())
        })
    }
}

/// Extracts the user from a token response (`{ user: {...} }`).
fn parse_user(body: &Value) -> Option<AuthUser> {
    let user = body.get("user")?;
    let id = user.get("id")?.as_str()?.to_string();
    let email = user
        .get("email")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let metadata = user.get("user_metadata");
    let display_name = ["full_name", "name"]
        .iter()
        .find_map(|key| metadata?.get(*key)?.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string);

    Some(AuthUser {
        id,
        email,
        display_name,
    })
}

fn provider_error_message(body: &Value) -> Option<String> {
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key)?.as_str())
        .map(str::to_string)
}

/// Fixed code→user table for local runs and tests.
#[derive(Default)]
pub struct StaticAuthGateway {
    users: HashMap<String, AuthUser>,
}

impl StaticAuthGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code(mut self, code: impl Into<String>, user: AuthUser) -> Self {
        self.users.insert(code.into(), user);
        self
    }
}

#[async_trait]
impl AuthGateway for StaticAuthGateway {
    async fn exchange_code(
        &self,
        code: &str,
        _code_verifier: Option<&str>,
    ) -> Result<AuthUser, AuthGatewayError> {
        self.users
            .get(code)
            .cloned()
            .ok_or_else(|| AuthGatewayError::Rejected("Invalid authorization code".to_string()))
    }
}
