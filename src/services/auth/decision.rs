//! Post-verification authorization policy.
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. permission lock
//! 2. required scope, then required permissions, against `claims.scope`
//! 3. the caller's custom validation hook, if any
//!
//! An empty requirement performs no check.

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::constraint::ResolvedConstraints;
use super::context::RequestContext;
use super::error::{AuthorizationError, BoxError};
use super::verifier::VerifiedClaims;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationPolicy {
    pub scope: Vec<String>,
    pub permissions: Vec<String>,
}

impl AuthorizationPolicy {
    pub fn from_constraints(constraints: &ResolvedConstraints) -> Self {
        Self {
            scope: constraints.scope.clone(),
            permissions: constraints.permissions.clone(),
        }
    }
}

/// Caller-supplied check that runs after all built-in checks pass.
///
/// Any error it returns rejects the request as `CustomValidationFailed`.
#[async_trait]
pub trait CustomValidation: Send + Sync {
    async fn validate(&self, ctx: &RequestContext, claims: &VerifiedClaims)
    -> Result<(), BoxError>;
}

/// Adapter for synchronous closures.
pub struct ValidateFn<F>(pub F);

#[async_trait]
impl<F> CustomValidation for ValidateFn<F>
where
    F: Fn(&RequestContext, &VerifiedClaims) -> Result<(), BoxError> + Send + Sync,
{
    async fn validate(
        &self,
        ctx: &RequestContext,
        claims: &VerifiedClaims,
    ) -> Result<(), BoxError> {
        (self.0)(ctx, claims)
    }
}

#[derive(Debug)]
pub enum AuthorizationOutcome {
    Authorized(VerifiedClaims),
    Rejected(AuthorizationError),
}

impl AuthorizationOutcome {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized(_))
    }

    pub fn into_result(self) -> Result<VerifiedClaims, AuthorizationError> {
        match self {
            Self::Authorized(claims) => Ok(claims),
            Self::Rejected(err) => Err(err),
        }
    }
}

pub async fn decide(
    ctx: &RequestContext,
    claims: VerifiedClaims,
    policy: &AuthorizationPolicy,
    custom_validation: Option<&dyn CustomValidation>,
) -> AuthorizationOutcome {
    if claims.permission.is_locked() {
        return AuthorizationOutcome::Rejected(AuthorizationError::subject_locked(
            &claims.subject,
            claims.permission,
        ));
    }

    for required in [&policy.scope, &policy.permissions] {
        if let Some(missing) = first_missing(required, &claims.scope) {
            return AuthorizationOutcome::Rejected(AuthorizationError::scope_conflict(
                missing,
                required,
                &claims.scope,
            ));
        }
    }

    if let Some(hook) = custom_validation {
        if let Err(err) = hook.validate(ctx, &claims).await {
            return AuthorizationOutcome::Rejected(AuthorizationError::custom_validation_failed(
                err,
            ));
        }
    }

    AuthorizationOutcome::Authorized(claims)
}

fn first_missing<'a>(required: &'a [String], granted: &BTreeSet<String>) -> Option<&'a str> {
    required
        .iter()
        .find(|scope| !granted.contains(scope.as_str()))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::error::ErrorKind;
    use crate::services::auth::testing::{claims, failing_hook};
    use crate::services::auth::verifier::Permission;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn policy(scope: &[&str]) -> AuthorizationPolicy {
        AuthorizationPolicy {
            scope: scope.iter().map(|s| s.to_string()).collect(),
            permissions: Vec::new(),
        }
    }

    struct CountingHook(AtomicUsize);

    #[async_trait]
    impl CustomValidation for CountingHook {
        async fn validate(&self, _: &RequestContext, _: &VerifiedClaims) -> Result<(), BoxError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn reject(
        claims: VerifiedClaims,
        policy: &AuthorizationPolicy,
        hook: Option<&dyn CustomValidation>,
    ) -> AuthorizationError {
        match decide(&RequestContext::default(), claims, policy, hook).await {
            AuthorizationOutcome::Rejected(err) => err,
            AuthorizationOutcome::Authorized(c) => panic!("unexpectedly authorized {c:?}"),
        }
    }

    #[tokio::test]
    async fn locked_subject_is_rejected_before_scope_checks() {
        let locked = claims("mock-subject", &["default"], Permission::Locked);

        // scope is also missing here; the lock must win
        let err = reject(locked, &policy(&["openid"]), None).await;

        assert_eq!(err.kind(), ErrorKind::SubjectLocked);
        assert_eq!(err.public_data()["subject"], json!("mock-subject"));
        assert_eq!(err.public_data()["permission"], json!("locked"));
    }

    #[tokio::test]
    async fn superset_or_equal_scope_passes() {
        let ctx = RequestContext::default();

        let superset = claims("s", &["default", "edit"], Permission::User);
        assert!(decide(&ctx, superset, &policy(&["default"]), None).await.is_authorized());

        let equal = claims("s", &["default", "edit"], Permission::User);
        let outcome = decide(&ctx, equal, &policy(&["edit", "default"]), None).await;
        assert!(outcome.is_authorized());
    }

    #[tokio::test]
    async fn strict_subset_names_first_missing_scope() {
        let subset = claims("s", &["default"], Permission::User);

        let err = reject(subset, &policy(&["default", "openid", "email"]), None).await;

        assert_eq!(err.kind(), ErrorKind::ScopeConflict);
        assert_eq!(err.public_data()["missing"], json!("openid"));
        assert_eq!(
            err.public_data()["required"],
            json!(["default", "openid", "email"])
        );
        assert_eq!(err.public_data()["actual"], json!(["default"]));
    }

    #[tokio::test]
    async fn required_permissions_are_checked_against_scope() {
        let policy = AuthorizationPolicy {
            scope: vec!["default".into()],
            permissions: vec!["posts:write".into()],
        };

        let err = reject(claims("s", &["default"], Permission::Admin), &policy, None).await;
        assert_eq!(err.kind(), ErrorKind::ScopeConflict);
        assert_eq!(err.public_data()["missing"], json!("posts:write"));

        let granted = claims("s", &["default", "posts:write"], Permission::Admin);
        let outcome = decide(&RequestContext::default(), granted, &policy, None).await;
        assert!(outcome.is_authorized());
    }

    #[tokio::test]
    async fn empty_requirement_performs_no_check() {
        let no_scope = claims("s", &[], Permission::User);

        let outcome = decide(
            &RequestContext::default(),
            no_scope,
            &AuthorizationPolicy::default(),
            None,
        )
        .await;

        assert!(outcome.is_authorized());
    }

    #[tokio::test]
    async fn custom_hook_error_is_reclassified() {
        let hook = failing_hook("expected-subject");

        let err = reject(
            claims("other-subject", &["default"], Permission::User),
            &policy(&["default"]),
            Some(&hook),
        )
        .await;

        assert_eq!(err.kind(), ErrorKind::CustomValidationFailed);
        assert_eq!(
            err.debug_data()["validation_error"],
            json!("subject other-subject is not allowed")
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn custom_hook_runs_only_after_built_in_checks_pass() {
        let hook = CountingHook(AtomicUsize::new(0));

        reject(
            claims("s", &["default"], Permission::Locked),
            &policy(&[]),
            Some(&hook),
        )
        .await;
        reject(
            claims("s", &["default"], Permission::User),
            &policy(&["openid"]),
            Some(&hook),
        )
        .await;
        assert_eq!(hook.0.load(Ordering::SeqCst), 0);

        let outcome = decide(
            &RequestContext::default(),
            claims("s", &["default"], Permission::User),
            &policy(&["default"]),
            Some(&hook),
        )
        .await;
        assert!(outcome.is_authorized());
        assert_eq!(hook.0.load(Ordering::SeqCst), 1);
    }
}
