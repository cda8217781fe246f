//! Bearer token authorization → publish VerifiedTokens into request extensions
//!
//! Pipeline (per request):
//! 1. start the timing measurement (closed on drop, on every exit path)
//! 2. extract `Authorization: Bearer <token>`
//! 3. resolve constraints against the request (metadata / headers / JSON body)
//! 4. verify with the TokenVerifier (any failure → InvalidCredential)
//! 5. lock / scope / custom validation
//! 6. publish the claims under the configured key, then `next`

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::services::auth::{
    AuthorizationError, AuthorizationPolicy, ConstraintSpec, CustomValidation, RequestContext,
    TokenVerifier, VerifiedClaims, decide, sanitize::sanitize_token,
};
use crate::services::metrics::{MetricTimer, MetricsSink, TracingMetrics};

pub const BEARER_SCHEME: &str = "Bearer";
pub const DEFAULT_CONTEXT_KEY: &str = "bearerToken";
pub const METRIC_NAME: &str = "bearer_auth";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Parsed `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialHeader {
    pub scheme: String,
    pub value: String,
}

impl CredentialHeader {
    /// `<scheme> <value>`; `None` when either part is missing.
    pub fn parse(raw: &str) -> Option<Self> {
        let (scheme, value) = raw.trim().split_once(char::is_whitespace)?;
        let value = value.trim();
        if scheme.is_empty() || value.is_empty() {
            return None;
        }

        Some(Self {
            scheme: scheme.to_owned(),
            value: value.to_owned(),
        })
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthorizationError> {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(Self::parse)
            .ok_or_else(AuthorizationError::missing_credential)
    }
}

/// Successful authorization result for one request.
#[derive(Debug, Clone)]
pub struct BearerToken {
    pub key: String,
    pub claims: Arc<VerifiedClaims>,
}

/// Verified claims published to downstream handlers, keyed by context key.
#[derive(Debug, Clone, Default)]
pub struct VerifiedTokens(BTreeMap<String, Arc<VerifiedClaims>>);

impl VerifiedTokens {
    /// An entry under the same key is replaced, other keys are kept.
    pub fn publish(&mut self, token: BearerToken) {
        self.0.insert(token.key, token.claims);
    }

    pub fn get(&self, key: &str) -> Option<&Arc<VerifiedClaims>> {
        self.0.get(key)
    }
}

/// One configured gate. Read-only after construction and shared by all requests.
pub struct BearerAuth {
    spec: ConstraintSpec,
    verifier: Arc<dyn TokenVerifier>,
    custom_validation: Option<Arc<dyn CustomValidation>>,
    metrics: Arc<dyn MetricsSink>,
    context_key: String,
    body_limit: usize,
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth")
            .field("spec", &self.spec)
            .field("custom_validation", &self.custom_validation.is_some())
            .field("context_key", &self.context_key)
            .field("body_limit", &self.body_limit)
            .finish()
    }
}

impl BearerAuth {
    pub fn new(spec: ConstraintSpec, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            spec,
            verifier,
            custom_validation: None,
            metrics: Arc::new(TracingMetrics),
            context_key: DEFAULT_CONTEXT_KEY.to_owned(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_custom_validation(mut self, hook: Arc<dyn CustomValidation>) -> Self {
        self.custom_validation = Some(hook);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_context_key(mut self, key: impl Into<String>) -> Self {
        self.context_key = key.into();
        self
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn context_key(&self) -> &str {
        &self.context_key
    }

    /// Run the whole authorization decision for one request.
    pub async fn authorize(&self, ctx: &RequestContext) -> Result<BearerToken, AuthorizationError> {
        let _timer = MetricTimer::start(self.metrics.as_ref(), METRIC_NAME);

        let credential = CredentialHeader::from_headers(ctx.headers())?;
        if credential.scheme != BEARER_SCHEME {
            return Err(AuthorizationError::wrong_scheme(&credential.scheme));
        }

        let token = credential.value.as_str();
        let fingerprint = sanitize_token(token);
        debug!(token = %fingerprint, "bearer token identified");

        let constraints = self.spec.resolve(ctx);

        let claims = self
            .verifier
            .verify(token, &constraints)
            .await
            .map_err(|err| {
                warn!(error = %err, token = %fingerprint, "bearer token verification failed");
                AuthorizationError::invalid_credential(&fingerprint, err)
            })?;

        let policy = AuthorizationPolicy::from_constraints(&constraints);
        let claims = decide(ctx, claims, &policy, self.custom_validation.as_deref())
            .await
            .into_result()
            .inspect_err(|err| {
                info!(
                    kind = ?err.kind(),
                    reason = err.description(),
                    token = %fingerprint,
                    data = ?err.public_data(),
                    "bearer token rejected by policy"
                );
            })?;

        Ok(BearerToken {
            key: self.context_key.clone(),
            claims: Arc::new(claims),
        })
    }
}

/// Put the bearer gate in front of every route of `router`.
///
/// Example:
/// ```ignore
/// let protected = Router::new().route("/me", get(me));
/// let protected = middleware::auth::bearer::apply(protected, state.gate.clone());
/// ```
pub fn apply<S>(router: Router<S>, gate: Arc<BearerAuth>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(gate, bearer_auth))
}

pub async fn bearer_auth(
    State(gate): State<Arc<BearerAuth>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let (parts, body) = req.into_parts();

    // The body is only read once a bearer credential is present.
    let has_bearer = CredentialHeader::from_headers(&parts.headers)
        .is_ok_and(|credential| credential.scheme == BEARER_SCHEME);
    let (json, body) = if has_bearer && is_json(&parts.headers) {
        buffer_json(body, gate.body_limit).await
    } else {
        (Value::Null, Ok(body))
    };

    let ctx = RequestContext::from_headers(parts.headers.clone(), json);
    let token = gate.authorize(&ctx).await?;

    let mut req = Request::from_parts(parts, body?);

    // middleware → extractor hand-off
    let mut tokens = req
        .extensions_mut()
        .remove::<VerifiedTokens>()
        .unwrap_or_default();
    tokens.publish(token);
    req.extensions_mut().insert(tokens);

    Ok(next.run(req).await)
}

// Buffer a JSON body for path lookups and hand back a replacement body.
// A body that cannot be read resolves to `Null`; the read error surfaces only
// after authorization succeeds.
async fn buffer_json(body: Body, body_limit: usize) -> (Value, Result<Body, AppError>) {
    match axum::body::to_bytes(body, body_limit).await {
        Ok(bytes) => {
            let json = serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                debug!(error = %err, "request body is not valid JSON; body paths resolve to nothing");
                Value::Null
            });
            (json, Ok(Body::from(bytes)))
        }
        Err(err) => {
            warn!(error = %err, "failed to buffer request body");
            (
                Value::Null,
                Err(AppError::bad_request(
                    "INVALID_BODY",
                    "request body could not be read",
                )),
            )
        }
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .is_some_and(|mime| mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json"))
}
