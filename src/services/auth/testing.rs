//! Test helpers: token minting with a shared HS256 secret, fixed claim sets,
//! and stub verifiers.

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};

use super::access_jwt::JwtTokenVerifier;
use super::constraint::ResolvedConstraints;
use super::context::RequestContext;
use super::decision::ValidateFn;
use super::error::BoxError;
use super::verifier::{Permission, TokenVerifier, VerifiedClaims};

pub const SECRET: &[u8] = b"test-secret-test-secret-test-sec";
pub const ISSUER: &str = "https://auth.example.test/";

pub fn verifier() -> JwtTokenVerifier {
    JwtTokenVerifier::from_hs256_secret(SECRET)
}

/// JWT body issued for audience `access`, bound to `clientId` / `deviceId`.
pub fn token_claims(subject: &str, scope: Value) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "iss": ISSUER,
        "aud": "access",
        "sub": subject,
        "iat": now,
        "exp": now + 99,
        "jti": uuid::Uuid::new_v4().to_string(),
        "scope": scope,
        "nonce": "n-1",
        "client_id": "clientId",
        "device_id": "deviceId",
        "payload": { "test": true },
    })
}

pub fn mint(claims: &Value) -> String {
    sign(Header::new(Algorithm::HS256), claims)
}

pub fn mint_with_typ(claims: &Value, typ: &str) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some(typ.to_owned());
    sign(header, claims)
}

fn sign(header: Header, claims: &Value) -> String {
    jsonwebtoken::encode(&header, claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

pub fn claims(subject: &str, scope: &[&str], permission: Permission) -> VerifiedClaims {
    let now = Utc::now();
    VerifiedClaims {
        id: None,
        issuer: ISSUER.to_owned(),
        subject: subject.to_owned(),
        audience: vec!["access".to_owned()],
        scope: scope.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        permission,
        issued_at: Some(now),
        expires_at: now + chrono::TimeDelta::seconds(99),
        nonce: None,
        client_id: None,
        device_id: None,
        token_type: Some("JWT".to_owned()),
        payload: Value::Null,
    }
}

/// Hook that rejects every subject except `expected`.
pub fn failing_hook(
    expected: &'static str,
) -> ValidateFn<impl Fn(&RequestContext, &VerifiedClaims) -> Result<(), BoxError> + Send + Sync> {
    ValidateFn(move |_: &RequestContext, claims: &VerifiedClaims| -> Result<(), BoxError> {
        if claims.subject == expected {
            Ok(())
        } else {
            Err(format!("subject {} is not allowed", claims.subject).into())
        }
    })
}

/// Returns fixed claims and records every constraint set it was asked to check.
#[derive(Debug)]
pub struct StubVerifier {
    claims: VerifiedClaims,
    pub seen: Mutex<Vec<ResolvedConstraints>>,
}

impl StubVerifier {
    pub fn new(claims: VerifiedClaims) -> Self {
        Self {
            claims,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn last_seen(&self) -> Option<ResolvedConstraints> {
        self.seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TokenVerifier for StubVerifier {
    async fn verify(
        &self,
        _token: &str,
        constraints: &ResolvedConstraints,
    ) -> Result<VerifiedClaims, BoxError> {
        self.seen.lock().unwrap().push(constraints.clone());
        Ok(self.claims.clone())
    }
}
