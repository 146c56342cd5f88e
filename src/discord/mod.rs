//! Discord OAuth2 client
//!
//! Authorization code flow: redirect to `/oauth2/authorize`, exchange the
//! returned code at `/oauth2/token`, then read the operator from `/users/@me`.

use crate::config::DiscordConfig;
use crate::domain::Operator;
use crate::error::{AppError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Token endpoint response
#[derive(Clone, Deserialize)]
pub struct DiscordToken {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for DiscordToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordToken")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct DiscordErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Discord OAuth client
#[derive(Clone)]
pub struct DiscordOAuthClient {
    config: DiscordConfig,
    http_client: Client,
}

impl DiscordOAuthClient {
    pub fn new(config: DiscordConfig) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            config,
            http_client,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// URL the browser is sent to for consent
    pub fn authorization_url(&self, state: &str) -> Result<String> {
        let mut url = Url::parse(&self.endpoint("/oauth2/authorize"))
            .map_err(|e| AppError::OAuth(format!("Invalid Discord API URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.callback_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state);
        Ok(url.to_string())
    }

    /// Trade an authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<DiscordToken> {
        tracing::debug!("Exchanging Discord authorization code");

        let response = self
            .http_client
            .post(self.endpoint("/oauth2/token"))
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.callback_url.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::OAuth(format!("Token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::OAuth(format!("Token response unreadable: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<DiscordErrorResponse>(&body)
                .map(|e| e.error_description.unwrap_or(e.error))
                .unwrap_or_else(|_| status.to_string());
            return Err(AppError::OAuth(format!("Token exchange rejected: {}", message)));
        }

        serde_json::from_str(&body)
            .map_err(|e| AppError::OAuth(format!("Failed to parse token response: {}", e)))
    }

    /// Profile of the user who granted `access_token`
    pub async fn get_user(&self, access_token: &str) -> Result<Operator> {
        let response = self
            .http_client
            .get(self.endpoint("/users/@me"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::OAuth(format!("User request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::OAuth(format!(
                "User lookup rejected: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::OAuth(format!("Failed to parse user: {}", e)))
    }
}
