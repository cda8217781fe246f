/*
 * Responsibility
 * - Load settings from the environment (issuer / audience / token types / leeway / context key)
 * - Validate them (missing or malformed values fail startup)
 */
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::middleware::auth::bearer::{DEFAULT_BODY_LIMIT, DEFAULT_CONTEXT_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Key material for access-token verification.
pub enum AccessJwtKey {
    Ed25519PublicPem(String),
    Hs256Secret(String),
}

pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub auth_issuer: String,
    pub auth_audience: Vec<String>,
    pub auth_token_types: Vec<String>,
    pub access_token_leeway_seconds: u64,
    pub access_token_max_age_seconds: Option<u64>,
    pub auth_context_key: String,
    pub auth_required_scope: Vec<String>,
    pub auth_bind_client_metadata: bool,

    pub access_jwt_key: AccessJwtKey,

    pub http_body_limit_bytes: usize,
    pub http_timeout: Duration,
}

// "a, b c" → ["a", "b", "c"]
fn list(raw: Option<String>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parsed<T: FromStr>(raw: Option<String>, key: &'static str) -> Result<Option<T>, ConfigError> {
    raw.map(|v| v.trim().parse::<T>().map_err(|_| ConfigError::Invalid(key)))
        .transpose()
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key → value source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port: u16 = parsed(get("PORT"), "PORT")?.unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(get("APP_ENV"));

        let auth_issuer = get("AUTH_ISSUER")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("AUTH_ISSUER"))?;

        let auth_audience = list(get("AUTH_AUDIENCE"));
        if auth_audience.is_empty() {
            return Err(ConfigError::Missing("AUTH_AUDIENCE"));
        }

        let auth_token_types = match get("AUTH_TOKEN_TYPES") {
            Some(raw) => list(Some(raw)),
            None => vec!["JWT".to_string()],
        };

        let access_token_leeway_seconds =
            parsed(get("ACCESS_TOKEN_LEEWAY_SECONDS"), "ACCESS_TOKEN_LEEWAY_SECONDS")?
                .unwrap_or(60);

        let access_token_max_age_seconds = parsed(
            get("ACCESS_TOKEN_MAX_AGE_SECONDS"),
            "ACCESS_TOKEN_MAX_AGE_SECONDS",
        )?;

        let auth_context_key = get("AUTH_CONTEXT_KEY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTEXT_KEY.to_string());

        let auth_required_scope = list(get("AUTH_REQUIRED_SCOPE"));

        let auth_bind_client_metadata =
            parsed(get("AUTH_BIND_CLIENT_METADATA"), "AUTH_BIND_CLIENT_METADATA")?
                .unwrap_or(true);

        let access_jwt_key = match (
            get("ACCESS_JWT_PUBLIC_KEY_PEM"),
            get("ACCESS_JWT_HS256_SECRET"),
        ) {
            (Some(pem), _) => AccessJwtKey::Ed25519PublicPem(pem.replace("\\n", "\n")),
            (None, Some(secret)) if !secret.is_empty() => AccessJwtKey::Hs256Secret(secret),
            _ => return Err(ConfigError::Missing("ACCESS_JWT_PUBLIC_KEY_PEM")),
        };

        let http_body_limit_bytes = parsed(get("HTTP_BODY_LIMIT_BYTES"), "HTTP_BODY_LIMIT_BYTES")?
            .unwrap_or(DEFAULT_BODY_LIMIT);

        let http_timeout = Duration::from_secs(
            parsed(get("HTTP_TIMEOUT_SECONDS"), "HTTP_TIMEOUT_SECONDS")?.unwrap_or(30),
        );

        Ok(Self {
            addr,
            app_env,
            auth_issuer,
            auth_audience,
            auth_token_types,
            access_token_leeway_seconds,
            access_token_max_age_seconds,
            auth_context_key,
            auth_required_scope,
            auth_bind_client_metadata,
            access_jwt_key,
            http_body_limit_bytes,
            http_timeout,
        })
    }
}
