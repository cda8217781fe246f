//! Request data that constraint path references can point into.
//!
//! The context is a read-only snapshot taken before authorization runs:
//! request headers, a small metadata bag (client/device identifiers), and the
//! JSON body when the request carried one.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, HeaderValue, header};
use serde_json::Value;

use super::constraint::{FieldPath, PathRoot};

const CLIENT_ID_HEADER: &str = "x-client-id";
const DEVICE_ID_HEADER: &str = "x-device-id";
const EXTRA_PREFIX: &str = "x-meta-";

/// Client/device identifiers that travel with the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    pub client_id: Option<String>,
    pub device_id: Option<String>,
    pub user_agent: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl RequestMetadata {
    /// Collect metadata from the conventional headers.
    ///
    /// - `x-client-id` / `x-device-id` / `user-agent`
    /// - `x-meta-<name>` goes into `extra` under `<name>`
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };

        let extra = headers
            .iter()
            .filter_map(|(name, value)| {
                let key = name.as_str().strip_prefix(EXTRA_PREFIX)?;
                let value = value.to_str().ok()?.trim();
                (!key.is_empty() && !value.is_empty()).then(|| (key.to_owned(), value.to_owned()))
            })
            .collect();

        Self {
            client_id: text(CLIENT_ID_HEADER),
            device_id: text(DEVICE_ID_HEADER),
            user_agent: text(header::USER_AGENT.as_str()),
            extra,
        }
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "clientId" => self.client_id.as_deref(),
            "deviceId" => self.device_id.as_deref(),
            "userAgent" => self.user_agent.as_deref(),
            other => self.extra.get(other).map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    headers: HeaderMap,
    metadata: RequestMetadata,
    body: Value,
}

impl RequestContext {
    pub fn new(headers: HeaderMap, metadata: RequestMetadata, body: Value) -> Self {
        Self {
            headers,
            metadata,
            body,
        }
    }

    /// Build a context whose metadata is derived from `headers`.
    pub fn from_headers(headers: HeaderMap, body: Value) -> Self {
        let metadata = RequestMetadata::from_headers(&headers);
        Self::new(headers, metadata, body)
    }

    pub fn with_authorization(mut self, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(header::AUTHORIZATION, value);
        }
        self
    }

    pub fn with_metadata(mut self, metadata: RequestMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Resolve a field path against this request.
    ///
    /// Returns `None` when anything along the path is missing; callers treat
    /// that as "constraint not set".
    pub fn lookup(&self, path: &FieldPath) -> Option<Value> {
        match path.root() {
            PathRoot::Metadata => {
                let [name] = path.segments() else {
                    return None;
                };
                self.metadata
                    .field(name)
                    .map(|v| Value::String(v.to_owned()))
            }
            PathRoot::Header => {
                let [name] = path.segments() else {
                    return None;
                };
                self.headers
                    .get(name.as_str())
                    .and_then(|v| v.to_str().ok())
                    .map(|v| Value::String(v.to_owned()))
            }
            PathRoot::Body => navigate(&self.body, path.segments()).cloned(),
        }
    }
}

// Objects are addressed by key, arrays by numeric index.
fn navigate<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> FieldPath {
        raw.parse().unwrap()
    }

    #[test]
    fn metadata_is_read_from_conventional_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-client-id", HeaderValue::from_static("client-1"));
        headers.insert("x-device-id", HeaderValue::from_static(" device-9 "));
        headers.insert("x-meta-tenant", HeaderValue::from_static("acme"));
        headers.insert("x-meta-empty", HeaderValue::from_static(""));

        let metadata = RequestMetadata::from_headers(&headers);

        assert_eq!(metadata.client_id.as_deref(), Some("client-1"));
        assert_eq!(metadata.device_id.as_deref(), Some("device-9"));
        assert_eq!(metadata.user_agent, None);
        assert_eq!(metadata.extra.get("tenant").map(String::as_str), Some("acme"));
        assert!(!metadata.extra.contains_key("empty"));
    }

    #[test]
    fn lookup_reads_metadata_fields_and_extra() {
        let ctx = RequestContext::default().with_metadata(RequestMetadata {
            client_id: Some("client-1".into()),
            extra: BTreeMap::from([("tenant".to_string(), "acme".to_string())]),
            ..RequestMetadata::default()
        });

        assert_eq!(ctx.lookup(&path("metadata.clientId")), Some(json!("client-1")));
        assert_eq!(ctx.lookup(&path("metadata.tenant")), Some(json!("acme")));
        assert_eq!(ctx.lookup(&path("metadata.deviceId")), None);
    }

    #[test]
    fn lookup_navigates_nested_body() {
        let ctx = RequestContext::default().with_body(json!({
            "grant": { "audiences": ["access", "refresh"], "nonce": "n-1" },
        }));

        assert_eq!(ctx.lookup(&path("body.grant.nonce")), Some(json!("n-1")));
        assert_eq!(
            ctx.lookup(&path("body.grant.audiences.1")),
            Some(json!("refresh"))
        );
        assert_eq!(ctx.lookup(&path("body.grant.audiences.7")), None);
        assert_eq!(ctx.lookup(&path("body.grant.nonce.deeper")), None);
        assert_eq!(ctx.lookup(&path("body.missing")), None);
    }

    #[test]
    fn lookup_reads_headers_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant", HeaderValue::from_static("acme"));
        let ctx = RequestContext::from_headers(headers, Value::Null);

        assert_eq!(ctx.lookup(&path("header.X-Tenant")), Some(json!("acme")));
    }
}
