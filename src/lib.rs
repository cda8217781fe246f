/*
 * Responsibility
 * - Bearer-token authorization gate for axum services
 * - Public modules: constraint resolution, verification seam, policy decision, middleware
 */
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
