use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};

use crate::middleware::auth::bearer::VerifiedTokens;
use crate::services::auth::VerifiedClaims;
use crate::state::AppState;

/// Extractor for the claims published under the gate's context key.
/// Assumes the bearer middleware already inserted `VerifiedTokens`;
/// returns 401 when nothing was published (route not behind the gate).
pub struct BearerClaimsExtractor(pub Arc<VerifiedClaims>);

impl FromRequestParts<AppState> for BearerClaimsExtractor
where
    AppState: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedTokens>()
            .and_then(|tokens| tokens.get(state.gate.context_key()))
            .cloned()
            .map(BearerClaimsExtractor)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
