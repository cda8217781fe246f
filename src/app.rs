/*
 * Responsibility
 * - Load Config → build dependencies → assemble the Router
 * - Apply HTTP middleware (request id / trace / limits)
 * - Start with axum::serve()
 */
use anyhow::Result;
use axum::Router;
use tracing::info;

use crate::{
    api,
    config::Config,
    middleware::http::{self, HttpLimits},
    services::auth::build_bearer_auth,
    state::AppState,
};

pub async fn run() -> Result<()> {
    let config = Config::from_env()?;
    let gate = build_bearer_auth(&config)?;
    let state = AppState::new(gate);

    let app = build_router(state, HttpLimits::from_config(&config));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(
        addr = %config.addr,
        production = config.app_env.is_production(),
        issuer = %config.auth_issuer,
        "listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState, limits: HttpLimits) -> Router {
    let router = Router::new()
        .nest("/api/v1", api::v1::routes(&state))
        .with_state(state);

    http::apply(router, limits)
}
