/*
 * Responsibility
 * - TokenVerifier: the seam to whatever validates the credential cryptographically
 * - VerifiedClaims: the normalized claim set every verifier returns
 *
 * Notes
 * - Signature, expiry, not-before, key rotation are the verifier's contract, not ours
 * - Any verifier error is reclassified as InvalidCredential by the middleware
 */
use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::constraint::ResolvedConstraints;
use super::error::BoxError;

/// Validates a credential string against resolved constraints.
///
/// Implementations must be safe to call concurrently for independent requests.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(
        &self,
        token: &str,
        constraints: &ResolvedConstraints,
    ) -> Result<VerifiedClaims, BoxError>;
}

/// Permission state of the token's principal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    User,
    Admin,
    Locked,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Locked => "locked",
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verified claim set. Written once by the verifier, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedClaims {
    pub id: Option<String>,
    pub issuer: String,
    pub subject: String,
    pub audience: Vec<String>,
    pub scope: BTreeSet<String>,
    pub permission: Permission,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub nonce: Option<String>,
    pub client_id: Option<String>,
    pub device_id: Option<String>,
    pub token_type: Option<String>,
    // Application payload carried by the token; opaque to this crate.
    pub payload: Value,
}

impl VerifiedClaims {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.contains(scope)
    }
}
