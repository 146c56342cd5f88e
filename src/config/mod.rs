//! Configuration management for Logboard Core

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::env;
use std::time::Duration;

/// Environment variables that must be present at startup.
pub const REQUIRED_ENV_VARS: &[&str] = &[
    "DISCORD_CLIENT_ID",
    "DISCORD_CLIENT_SECRET",
    "SESSION_SECRET",
    "DB_HOST",
    "DB_USER",
    "DB_PASSWORD",
    "DB_NAME",
    "ALLOWED_USER_IDS",
];

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// `APP_ENV=production` switches on secure cookies, HSTS and gzip
    pub production: bool,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Discord OAuth configuration
    pub discord: DiscordConfig,
    /// Session cookie and store configuration
    pub session: SessionConfig,
    /// Discord user ids allowed to sign in
    pub allowed_users: AllowList,
    /// Per-query deadlines
    pub query_timeouts: QueryTimeouts,
    /// Security headers configuration
    pub security_headers: SecurityHeadersConfig,
    /// Logging and metrics
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Clone)]
pub struct DiscordConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Callback registered with Discord (e.g. https://logs.example.com/auth/discord/callback)
    pub callback_url: String,
    /// API base, overridable for tests
    pub api_url: String,
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("callback_url", &self.callback_url)
            .field("api_url", &self.api_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Clone)]
pub struct SessionConfig {
    /// HMAC key for cookie signatures
    pub secret: String,
    pub cookie_name: String,
    pub ttl_secs: u64,
    /// How often expired rows are purged from the store
    pub sweep_interval_secs: u64,
    /// Adds `Secure` to the cookie
    pub secure_cookie: bool,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"[REDACTED]")
            .field("cookie_name", &self.cookie_name)
            .field("ttl_secs", &self.ttl_secs)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

/// Static set of authorized Discord user ids
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    ids: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids
                .into_iter()
                .map(Into::into)
                .map(|id: String| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated list of ids
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

#[derive(Debug, Clone)]
pub struct QueryTimeouts {
    pub log_search: Duration,
    pub action_suggest: Duration,
}

impl Default for QueryTimeouts {
    fn default() -> Self {
        Self {
            log_search: Duration::from_secs(30),
            action_suggest: Duration::from_secs(10),
        }
    }
}

/// Security headers configuration
#[derive(Debug, Clone)]
pub struct SecurityHeadersConfig {
    pub hsts_enabled: bool,
    pub hsts_max_age_secs: u64,
    pub hsts_include_subdomains: bool,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            hsts_enabled: false,
            hsts_max_age_secs: 15_552_000,
            hsts_include_subdomains: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "json" or "text"
    pub log_format: String,
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            metrics_enabled: false,
        }
    }
}

impl TelemetryConfig {
    /// Read only the logging/metrics settings, so logging can start before
    /// the rest of the configuration is validated
    pub fn from_env() -> Self {
        Self {
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            metrics_enabled: env::var("METRICS_ENABLED")
                .map(|s| s.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

/// Names of required variables that are unset or blank
pub fn missing_required_vars() -> Vec<&'static str> {
    REQUIRED_ENV_VARS
        .iter()
        .copied()
        .filter(|name| env::var(name).map(|v| v.trim().is_empty()).unwrap_or(true))
        .collect()
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{} is required", name))
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let missing = missing_required_vars();
        if !missing.is_empty() {
            bail!(
                "Missing required environment variable(s): {}",
                missing.join(", ")
            );
        }

        let http_port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("Invalid PORT")?;
        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let allowed_users = AllowList::parse(&required("ALLOWED_USER_IDS")?);
        if allowed_users.is_empty() {
            bail!("ALLOWED_USER_IDS must contain at least one id");
        }

        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port,
            production,
            database: DatabaseConfig {
                host: required("DB_HOST")?,
                port: env::var("DB_PORT")
                    .unwrap_or_else(|_| "3306".to_string())
                    .parse()
                    .context("Invalid DB_PORT")?,
                user: required("DB_USER")?,
                password: required("DB_PASSWORD")?,
                name: required("DB_NAME")?,
                max_connections: parse_or("DB_MAX_CONNECTIONS", 20),
                acquire_timeout_secs: parse_or("DB_ACQUIRE_TIMEOUT_SECS", 10),
            },
            discord: DiscordConfig {
                client_id: required("DISCORD_CLIENT_ID")?,
                client_secret: required("DISCORD_CLIENT_SECRET")?,
                callback_url: env::var("DISCORD_CALLBACK_URL").unwrap_or_else(|_| {
                    format!("http://localhost:{}/auth/discord/callback", http_port)
                }),
                api_url: env::var("DISCORD_API_URL")
                    .unwrap_or_else(|_| "https://discord.com/api".to_string()),
                scopes: vec!["identify".to_string()],
            },
            session: SessionConfig {
                secret: required("SESSION_SECRET")?,
                cookie_name: "sessionId".to_string(),
                ttl_secs: parse_or("SESSION_TTL_SECS", 86_400),
                sweep_interval_secs: parse_or("SESSION_SWEEP_INTERVAL_SECS", 900),
                secure_cookie: production,
            },
            allowed_users,
            query_timeouts: QueryTimeouts {
                log_search: Duration::from_millis(parse_or("LOG_SEARCH_TIMEOUT_MS", 30_000)),
                action_suggest: Duration::from_millis(parse_or(
                    "ACTION_SUGGEST_TIMEOUT_MS",
                    10_000,
                )),
            },
            security_headers: SecurityHeadersConfig {
                hsts_enabled: production,
                ..SecurityHeadersConfig::default()
            },
            telemetry: TelemetryConfig::from_env(),
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    pub fn is_production(&self) -> bool {
        self.production
    }
}
