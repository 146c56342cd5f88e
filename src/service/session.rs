//! Session management business logic

use crate::config::SessionConfig;
use crate::crypto::{random_token, CookieSigner};
use crate::domain::Operator;
use crate::error::Result;
use crate::repository::{SessionData, SessionRepository};
use chrono::Utc;
use std::sync::Arc;

/// Cookie binding the OAuth `state` parameter to the browser
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
/// Lifetime of the OAuth state cookie in seconds
pub const OAUTH_STATE_TTL_SECS: u64 = 600;

const SESSION_ID_BYTES: usize = 32;
const OAUTH_STATE_BYTES: usize = 24;

/// A session that passed signature and expiry checks
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub session_id: String,
    pub operator: Operator,
}

pub struct SessionService<S: SessionRepository> {
    session_repo: Arc<S>,
    signer: CookieSigner,
    config: SessionConfig,
}

impl<S: SessionRepository> SessionService<S> {
    pub fn new(session_repo: Arc<S>, config: SessionConfig) -> Self {
        Self {
            session_repo,
            signer: CookieSigner::new(&config.secret),
            config,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    /// Start a session for `operator`, replacing `previous` if given.
    ///
    /// Returns the signed cookie value.
    pub async fn create_session(
        &self,
        operator: Operator,
        previous: Option<&str>,
    ) -> Result<String> {
        if let Some(previous) = previous.and_then(|cookie| self.signer.verify(cookie)) {
            self.session_repo.destroy(&previous).await?;
        }

        let session_id = random_token(SESSION_ID_BYTES);
        let expires = Utc::now().timestamp() + self.config.ttl_secs as i64;
        self.session_repo
            .save(&session_id, &SessionData { operator }, expires)
            .await?;

        Ok(self.signer.sign(&session_id))
    }

    /// Look up the session behind a signed cookie value.
    ///
    /// Unsigned, tampered, unknown and expired cookies all yield `None`.
    pub async fn resolve(&self, cookie_value: &str) -> Result<Option<ActiveSession>> {
        let Some(session_id) = self.signer.verify(cookie_value) else {
            tracing::debug!("Rejected session cookie with invalid signature");
            return Ok(None);
        };

        let data = self
            .session_repo
            .find_active(&session_id, Utc::now().timestamp())
            .await?;

        Ok(data.map(|data| ActiveSession {
            session_id,
            operator: data.operator,
        }))
    }

    pub async fn destroy(&self, session_id: &str) -> Result<()> {
        self.session_repo.destroy(session_id).await
    }

    /// Destroy whatever session a signed cookie value points at
    pub async fn destroy_by_cookie(&self, cookie_value: &str) -> Result<()> {
        match self.signer.verify(cookie_value) {
            Some(session_id) => self.destroy(&session_id).await,
            None => Ok(()),
        }
    }

    /// Purge expired sessions
    pub async fn sweep_expired(&self) -> Result<u64> {
        self.session_repo
            .delete_expired(Utc::now().timestamp())
            .await
    }

    /// `Set-Cookie` value installing the session cookie
    pub fn session_cookie(&self, cookie_value: &str) -> String {
        self.build_cookie(
            &self.config.cookie_name,
            cookie_value,
            self.config.ttl_secs,
        )
    }

    /// `Set-Cookie` value removing the session cookie
    pub fn clear_session_cookie(&self) -> String {
        self.build_cookie(&self.config.cookie_name, "", 0)
    }

    /// New OAuth `state` plus the `Set-Cookie` value binding it
    pub fn issue_oauth_state(&self) -> (String, String) {
        let state = random_token(OAUTH_STATE_BYTES);
        let cookie = self.build_cookie(
            OAUTH_STATE_COOKIE,
            &self.signer.sign(&state),
            OAUTH_STATE_TTL_SECS,
        );
        (state, cookie)
    }

    /// True when the signed state cookie matches the returned `state`
    pub fn verify_oauth_state(&self, cookie_value: Option<&str>, state: &str) -> bool {
        cookie_value
            .and_then(|value| self.signer.verify(value))
            .is_some_and(|expected| !state.is_empty() && expected == state)
    }

    pub fn clear_oauth_state_cookie(&self) -> String {
        self.build_cookie(OAUTH_STATE_COOKIE, "", 0)
    }

    fn build_cookie(&self, name: &str, value: &str, max_age_secs: u64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            name, value, max_age_secs
        );
        if self.config.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }
}
