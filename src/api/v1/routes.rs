/*
 * Responsibility
 * - v1 URL layout
 * - /health is public; everything under the protected router passes the bearer gate
 */
use axum::{Router, routing::get};

use crate::api::v1::handlers::{health::health, me::me};
use crate::middleware::auth::bearer;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let public = Router::new().route("/health", get(health));

    let protected = Router::new().route("/me", get(me).post(me));
    let protected = bearer::apply(protected, state.gate.clone());

    public.merge(protected)
}
