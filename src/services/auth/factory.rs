/// Factory: build the bearer gate from application `Config`.
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::{AccessJwtKey, Config};
use crate::error::AppError;
use crate::middleware::auth::bearer::BearerAuth;
use crate::services::auth::{ConstraintSource, ConstraintSpec, JwtTokenVerifier};

pub fn constraint_spec(config: &Config) -> ConstraintSpec {
    let mut spec = ConstraintSpec::default()
        .with_issuer(config.auth_issuer.clone())
        .with_audience(ConstraintSource::many(config.auth_audience.iter().cloned()))
        .with_types(config.auth_token_types.iter().cloned())
        .with_clock_tolerance(Duration::from_secs(config.access_token_leeway_seconds));

    if !config.auth_required_scope.is_empty() {
        spec = spec.with_scope(ConstraintSource::many(
            config.auth_required_scope.iter().cloned(),
        ));
    }
    if let Some(max_age) = config.access_token_max_age_seconds {
        spec = spec.with_max_age(Duration::from_secs(max_age));
    }
    if config.auth_bind_client_metadata {
        spec = spec.bind_client_metadata();
    }

    spec
}

pub fn build_bearer_auth(config: &Config) -> Result<Arc<BearerAuth>, AppError> {
    let verifier = match &config.access_jwt_key {
        AccessJwtKey::Ed25519PublicPem(pem) => JwtTokenVerifier::from_ed_pem(pem).map_err(|e| {
            warn!(error = %e, "invalid ed25519 public key pem");
            AppError::Internal
        })?,
        AccessJwtKey::Hs256Secret(secret) => JwtTokenVerifier::from_hs256_secret(secret.as_bytes()),
    };

    let gate = BearerAuth::new(constraint_spec(config), Arc::new(verifier))
        .with_context_key(config.auth_context_key.clone())
        .with_body_limit(config.http_body_limit_bytes);

    Ok(Arc::new(gate))
}
