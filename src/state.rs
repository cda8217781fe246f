/*
 * Responsibility
 * - Shared context bound to the Router (AppState)
 * - Cheap to clone (everything behind Arc)
 */
use std::sync::Arc;

use crate::middleware::auth::bearer::BearerAuth;

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<BearerAuth>,
}

impl AppState {
    pub fn new(gate: Arc<BearerAuth>) -> Self {
        Self { gate }
    }
}
