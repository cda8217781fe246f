/*!
 * Verified bearer claims extractor
 *
 * Responsibility:
 * - Hand the claims the bearer gate published to a handler
 * - The axum glue lives in core; claim types stay in services::auth
 *
 * Public API:
 * - BearerClaimsExtractor
 */

mod core;

pub use core::BearerClaimsExtractor;
