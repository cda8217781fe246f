//! Claim constraints: what the verifier must check a token against.
//!
//! Each dynamic constraint is a [`ConstraintSource`]: a literal value, a
//! reference into the request ([`FieldPath`]), or a reference with a literal
//! fallback. [`ConstraintSpec::resolve`] turns the declarative spec into the
//! concrete [`ResolvedConstraints`] for one request.

use std::{fmt, str::FromStr, time::Duration};

use serde_json::Value;

use super::context::RequestContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRoot {
    Metadata,
    Body,
    Header,
}

impl PathRoot {
    fn as_str(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Body => "body",
            Self::Header => "header",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldPathError {
    #[error("empty field path")]
    Empty,
    #[error("unknown field path root: {0}")]
    UnknownRoot(String),
    #[error("field path '{0}' has an empty segment")]
    EmptySegment(String),
    #[error("field path '{0}' must name exactly one {1} field")]
    SingleSegment(String, &'static str),
}

/// Dot-separated locator into the request, e.g. `metadata.clientId` or
/// `body.grant.nonce`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    root: PathRoot,
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, FieldPathError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(FieldPathError::Empty);
        }

        let mut parts = raw.split('.');
        let root = match parts.next() {
            Some("metadata") => PathRoot::Metadata,
            Some("body") => PathRoot::Body,
            Some("header") => PathRoot::Header,
            Some(other) => return Err(FieldPathError::UnknownRoot(other.to_owned())),
            None => return Err(FieldPathError::Empty),
        };

        let segments = parts
            .map(|s| match root {
                // header names are case-insensitive; HeaderMap stores them lowercased
                PathRoot::Header => s.to_ascii_lowercase(),
                _ => s.to_owned(),
            })
            .collect::<Vec<_>>();

        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return Err(FieldPathError::EmptySegment(raw.to_owned()));
        }
        if root != PathRoot::Body && segments.len() != 1 {
            return Err(FieldPathError::SingleSegment(raw.to_owned(), root.as_str()));
        }

        Ok(Self { root, segments })
    }

    pub fn root(&self) -> PathRoot {
        self.root
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl FromStr for FieldPath {
    type Err = FieldPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.root.as_str(), self.segments.join("."))
    }
}

/// Where a constraint value comes from.
///
/// `PathOr` is the "both given" form: a resolved path value wins and the
/// literal is used only when the path resolves to nothing. A bare `Path`
/// that resolves to nothing leaves the constraint unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintSource<T> {
    Literal(T),
    Path(FieldPath),
    PathOr { path: FieldPath, default: T },
}

impl<T> ConstraintSource<T> {
    pub fn path(path: FieldPath) -> Self {
        Self::Path(path)
    }

    pub fn path_or(path: FieldPath, default: T) -> Self {
        Self::PathOr { path, default }
    }
}

impl ConstraintSource<String> {
    pub fn value(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }
}

impl ConstraintSource<Vec<String>> {
    pub fn one(value: impl Into<String>) -> Self {
        Self::Literal(vec![value.into()])
    }

    pub fn many<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Literal(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Coerce + Clone> ConstraintSource<T> {
    pub fn resolve(&self, ctx: &RequestContext) -> Option<T> {
        match self {
            Self::Literal(value) => Some(value.clone()),
            Self::Path(path) => ctx.lookup(path).as_ref().and_then(T::coerce),
            Self::PathOr { path, default } => ctx
                .lookup(path)
                .as_ref()
                .and_then(T::coerce)
                .or_else(|| Some(default.clone())),
        }
    }
}

/// Type coercion for values found through a path reference.
///
/// Only shapes are adjusted (scalar to string, scalar to collection-of-one);
/// nothing is validated.
pub trait Coerce: Sized {
    fn coerce(value: &Value) -> Option<Self>;
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl Coerce for String {
    fn coerce(value: &Value) -> Option<Self> {
        scalar_text(value)
    }
}

impl Coerce for Vec<String> {
    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(items.iter().filter_map(scalar_text).collect()),
            other => scalar_text(other).map(|s| vec![s]),
        }
    }
}

/// Declarative constraint configuration for one middleware instance.
///
/// Read-only after construction; shared by every request.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSpec {
    pub issuer: Option<String>,
    pub audience: Option<ConstraintSource<Vec<String>>>,
    pub subject: Option<ConstraintSource<Vec<String>>>,
    pub subject_hint: Option<ConstraintSource<String>>,
    pub nonce: Option<ConstraintSource<String>>,
    pub scope: Option<ConstraintSource<Vec<String>>>,
    pub permissions: Option<ConstraintSource<Vec<String>>>,
    pub client_id: Option<ConstraintSource<String>>,
    pub device_id: Option<ConstraintSource<String>>,

    // Operational bounds, passed to the verifier as-is.
    pub types: Vec<String>,
    pub clock_tolerance: Duration,
    pub max_age: Option<Duration>,
}

impl ConstraintSpec {
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, source: ConstraintSource<Vec<String>>) -> Self {
        self.audience = Some(source);
        self
    }

    pub fn with_subject(mut self, source: ConstraintSource<Vec<String>>) -> Self {
        self.subject = Some(source);
        self
    }

    pub fn with_subject_hint(mut self, source: ConstraintSource<String>) -> Self {
        self.subject_hint = Some(source);
        self
    }

    pub fn with_nonce(mut self, source: ConstraintSource<String>) -> Self {
        self.nonce = Some(source);
        self
    }

    pub fn with_scope(mut self, source: ConstraintSource<Vec<String>>) -> Self {
        self.scope = Some(source);
        self
    }

    pub fn with_permissions(mut self, source: ConstraintSource<Vec<String>>) -> Self {
        self.permissions = Some(source);
        self
    }

    pub fn with_client_id(mut self, source: ConstraintSource<String>) -> Self {
        self.client_id = Some(source);
        self
    }

    pub fn with_device_id(mut self, source: ConstraintSource<String>) -> Self {
        self.device_id = Some(source);
        self
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_clock_tolerance(mut self, tolerance: Duration) -> Self {
        self.clock_tolerance = tolerance;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Bind `client_id` / `device_id` to the request metadata.
    pub fn bind_client_metadata(self) -> Self {
        self.with_client_id(ConstraintSource::path(metadata_path("clientId")))
            .with_device_id(ConstraintSource::path(metadata_path("deviceId")))
    }

    pub fn resolve(&self, ctx: &RequestContext) -> ResolvedConstraints {
        resolve(self, ctx)
    }
}

fn metadata_path(field: &str) -> FieldPath {
    FieldPath {
        root: PathRoot::Metadata,
        segments: vec![field.to_owned()],
    }
}

/// Concrete constraints for one request. Collection fields are always
/// plural; an empty collection means "do not enforce".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConstraints {
    pub issuer: Option<String>,
    pub audience: Vec<String>,
    pub subject: Vec<String>,
    pub subject_hint: Option<String>,
    pub nonce: Option<String>,
    pub scope: Vec<String>,
    pub permissions: Vec<String>,
    pub client_id: Option<String>,
    pub device_id: Option<String>,
    pub types: Vec<String>,
    pub clock_tolerance: Duration,
    pub max_age: Option<Duration>,
}

pub fn resolve(spec: &ConstraintSpec, ctx: &RequestContext) -> ResolvedConstraints {
    fn one<T: Coerce + Clone>(
        source: &Option<ConstraintSource<T>>,
        ctx: &RequestContext,
    ) -> Option<T> {
        source.as_ref().and_then(|s| s.resolve(ctx))
    }

    ResolvedConstraints {
        issuer: spec.issuer.clone(),
        audience: one(&spec.audience, ctx).unwrap_or_default(),
        subject: one(&spec.subject, ctx).unwrap_or_default(),
        subject_hint: one(&spec.subject_hint, ctx),
        nonce: one(&spec.nonce, ctx),
        scope: one(&spec.scope, ctx).unwrap_or_default(),
        permissions: one(&spec.permissions, ctx).unwrap_or_default(),
        client_id: one(&spec.client_id, ctx),
        device_id: one(&spec.device_id, ctx),
        types: spec.types.clone(),
        clock_tolerance: spec.clock_tolerance,
        max_age: spec.max_age,
    }
}
