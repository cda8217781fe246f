/*
 * Responsibility
 * - GET|POST /me: echo the verified identity back to the caller
 * - Only reachable through the bearer gate
 */
use std::collections::BTreeSet;

use axum::Json;
use serde::Serialize;

use crate::api::v1::extractors::bearer_claims::BearerClaimsExtractor;
use crate::services::auth::Permission;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub subject: String,
    pub scope: BTreeSet<String>,
    pub permission: Permission,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

pub async fn me(BearerClaimsExtractor(claims): BearerClaimsExtractor) -> Json<MeResponse> {
    Json(MeResponse {
        subject: claims.subject.clone(),
        scope: claims.scope.clone(),
        permission: claims.permission,
        client_id: claims.client_id.clone(),
    })
}
