pub mod access_jwt;
pub mod constraint;
pub mod context;
pub mod decision;
pub mod error;
pub mod factory;
pub mod sanitize;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testing;

pub use access_jwt::JwtTokenVerifier;
pub use constraint::{ConstraintSource, ConstraintSpec, FieldPath, ResolvedConstraints};
pub use context::{RequestContext, RequestMetadata};
pub use decision::{AuthorizationOutcome, AuthorizationPolicy, CustomValidation, decide};
pub use error::{AuthorizationError, BoxError, ErrorKind};
pub use factory::build_bearer_auth;
pub use verifier::{Permission, TokenVerifier, VerifiedClaims};
