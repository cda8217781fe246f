use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;

use super::constraint::ResolvedConstraints;
use super::error::BoxError;
use super::verifier::{Permission, TokenVerifier, VerifiedClaims};

// Errors returned by access-token verification + strict claim validation.
#[derive(Debug, thiserror::Error)]
pub enum AccessJwtError {
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("missing or invalid 'aud' claim")]
    MissingOrInvalidAud,
    #[error("empty '{0}' claim")]
    EmptyClaim(&'static str),
    #[error("missing '{0}' claim")]
    MissingClaim(&'static str),
    #[error("'{0}' claim mismatch")]
    ClaimMismatch(&'static str),
    #[error("token type {0:?} is not accepted")]
    UnacceptedType(Option<String>),
    #[error("token is older than the maximum age")]
    TooOld,
    #[error("invalid '{0}' timestamp")]
    InvalidTimestamp(&'static str),
}

fn aud_is_present_and_valid(aud: &Value) -> bool {
    match aud {
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(arr) => arr.iter().any(|v| match v {
            Value::String(s) => !s.trim().is_empty(),
            _ => false,
        }),
        // Missing claim ends up as Null due to #[serde(default)]
        _ => false,
    }
}

// `aud` and `scope` may be a single string or an array. Only `scope` strings
// carry several space-separated values.
fn string_list(value: &Value, separator: Option<char>) -> Vec<String> {
    match (value, separator) {
        (Value::String(s), Some(separator)) => s
            .split(separator)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        (Value::String(s), None) => vec![s.clone()],
        (Value::Array(items), _) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

fn timestamp(secs: i64, claim: &'static str) -> Result<DateTime<Utc>, AccessJwtError> {
    DateTime::from_timestamp(secs, 0).ok_or(AccessJwtError::InvalidTimestamp(claim))
}

/// Access token (JWT) claims.
///
/// NOTE:
/// - `aud` in JWT can be either string or array; jsonwebtoken validates it via `Validation::set_audience`.
/// - `scope` is accepted both as a space-separated string and as an array.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenClaims {
    pub iss: String,
    #[serde(default)]
    pub aud: Value,

    pub sub: String,
    pub exp: i64,

    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub jti: Option<String>,

    #[serde(default)]
    pub scope: Value,
    #[serde(default)]
    pub permission: Permission,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

/// JWT access-token verifier.
///
/// Signature, `exp`, `nbf`, `iss` and `aud` are checked by jsonwebtoken; the
/// remaining constraints (subject set, nonce, client/device binding, token
/// type, max age) are checked here.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct JwtTokenVerifier {
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl std::fmt::Debug for JwtTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("JwtTokenVerifier")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl JwtTokenVerifier {
    pub fn new(decoding_key: DecodingKey, algorithm: Algorithm) -> Self {
        Self {
            decoding_key,
            algorithm,
        }
    }

    /// EdDSA (Ed25519) public key in PEM format.
    pub fn from_ed_pem(public_key_pem: &str) -> Result<Self, AccessJwtError> {
        let decoding_key = DecodingKey::from_ed_pem(public_key_pem.as_bytes())?;
        Ok(Self::new(decoding_key, Algorithm::EdDSA))
    }

    pub fn from_hs256_secret(secret: &[u8]) -> Self {
        Self::new(DecodingKey::from_secret(secret), Algorithm::HS256)
    }

    fn validation(&self, constraints: &ResolvedConstraints) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        if let Some(issuer) = &constraints.issuer {
            validation.set_issuer(&[issuer]);
        }
        if constraints.audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(constraints.audience.as_slice());
        }
        validation.validate_nbf = true;
        validation.leeway = constraints.clock_tolerance.as_secs();
        validation
    }

    /// Verify signature + registered claims with jsonwebtoken.
    pub fn decode(
        &self,
        token: &str,
        constraints: &ResolvedConstraints,
    ) -> Result<(Option<String>, AccessTokenClaims), AccessJwtError> {
        let header = jsonwebtoken::decode_header(token)?;
        let data = jsonwebtoken::decode::<AccessTokenClaims>(
            token,
            &self.decoding_key,
            &self.validation(constraints),
        )?;

        Ok((header.typ, data.claims))
    }

    /// Verify + strict claim validation, then convert into `VerifiedClaims`.
    pub fn verify_strict(
        &self,
        token: &str,
        constraints: &ResolvedConstraints,
    ) -> Result<VerifiedClaims, AccessJwtError> {
        let (token_type, claims) = self.decode(token, constraints)?;

        if !constraints.types.is_empty() {
            let accepted = token_type.as_deref().is_some_and(|typ| {
                constraints
                    .types
                    .iter()
                    .any(|t| t.eq_ignore_ascii_case(typ))
            });
            if !accepted {
                return Err(AccessJwtError::UnacceptedType(token_type));
            }
        }

        if claims.iss.trim().is_empty() {
            return Err(AccessJwtError::EmptyClaim("iss"));
        }
        if claims.sub.trim().is_empty() {
            return Err(AccessJwtError::EmptyClaim("sub"));
        }
        if !constraints.audience.is_empty() && !aud_is_present_and_valid(&claims.aud) {
            return Err(AccessJwtError::MissingOrInvalidAud);
        }

        if !constraints.subject.is_empty() && !constraints.subject.contains(&claims.sub) {
            return Err(AccessJwtError::ClaimMismatch("sub"));
        }
        expect_claim("nonce", constraints.nonce.as_deref(), claims.nonce.as_deref())?;
        expect_claim(
            "client_id",
            constraints.client_id.as_deref(),
            claims.client_id.as_deref(),
        )?;
        expect_claim(
            "device_id",
            constraints.device_id.as_deref(),
            claims.device_id.as_deref(),
        )?;

        if let Some(max_age) = constraints.max_age {
            let iat = claims.iat.ok_or(AccessJwtError::MissingClaim("iat"))?;
            let limit = max_age.as_secs() + constraints.clock_tolerance.as_secs();
            let age = Utc::now().timestamp().saturating_sub(iat);
            if age > i64::try_from(limit).unwrap_or(i64::MAX) {
                return Err(AccessJwtError::TooOld);
            }
        }

        Ok(VerifiedClaims {
            id: claims.jti,
            issuer: claims.iss,
            subject: claims.sub,
            audience: string_list(&claims.aud, None),
            scope: string_list(&claims.scope, Some(' '))
                .into_iter()
                .collect::<BTreeSet<_>>(),
            permission: claims.permission,
            issued_at: claims.iat.map(|iat| timestamp(iat, "iat")).transpose()?,
            expires_at: timestamp(claims.exp, "exp")?,
            nonce: claims.nonce,
            client_id: claims.client_id,
            device_id: claims.device_id,
            token_type,
            payload: claims.payload,
        })
    }
}

// Unset expectation means the dimension is not enforced.
fn expect_claim(
    name: &'static str,
    expected: Option<&str>,
    actual: Option<&str>,
) -> Result<(), AccessJwtError> {
    match expected {
        Some(expected) if actual != Some(expected) => Err(AccessJwtError::ClaimMismatch(name)),
        _ => Ok(()),
    }
}

#[async_trait]
impl TokenVerifier for JwtTokenVerifier {
    async fn verify(
        &self,
        token: &str,
        constraints: &ResolvedConstraints,
    ) -> Result<VerifiedClaims, BoxError> {
        Ok(self.verify_strict(token, constraints)?)
    }
}
