//! Request Context and Typed Parameter Resolution
//!
//! Action arguments arrive as query parameters, form fields or JSON body
//! members. [`RequestContext`] collects all three once per request and
//! resolves a key against them in a fixed order: query string, then (POST
//! only) form body, then (POST only) the cached JSON document.

use std::borrow::Cow;
use std::sync::Arc;

use axum::{
    extract::{FromRequest, Query, Request},
    http::{header::CONTENT_TYPE, HeaderMap, Method},
    Form,
};
use serde_json::Value;

use super::error::ApiError;

/// JSON document parsed by the normalization middleware.
///
/// Stored in request extensions so the body is parsed at most once.
#[derive(Debug, Clone)]
pub struct JsonBody(pub Arc<Value>);

/// A resolved parameter tagged with the kind of value it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Query/form value, or the empty absence sentinel. No type inference.
    Raw(String),
    /// JSON string.
    Str(String),
    /// JSON number, truncated toward zero to an integer.
    Int(i64),
    /// JSON `true`/`false`.
    Bool(bool),
    /// JSON object or array.
    Json(Value),
}

impl Param {
    /// The absence sentinel.
    pub const fn absent() -> Self {
        Self::Raw(String::new())
    }

    /// String form: raw/string values as-is, integers in base 10, booleans
    /// as `"true"`/`"false"`, JSON fragments as JSON text.
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Self::Raw(s) | Self::Str(s) => Cow::Borrowed(s),
            Self::Int(i) => Cow::Owned(i.to_string()),
            Self::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Self::Json(v) => Cow::Owned(v.to_string()),
        }
    }

    /// Empty strings count as absent whichever source they came from.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Raw(s) | Self::Str(s) if s.is_empty())
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Object(_) | Value::Array(_) => Some(Self::Json(value.clone())),
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(Self::Str(s.clone())),
            Value::Number(n) => Some(Self::Int(number_to_i64(n))),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Null => None,
        }
    }
}

/// Integer rendering of a JSON number.
///
/// No action takes fractional arguments: floats are truncated toward zero
/// and saturate at the `i64` bounds, as do unsigned values above `i64::MAX`.
fn number_to_i64(n: &serde_json::Number) -> i64 {
    if let Some(i) = n.as_i64() {
        i
    } else if n.as_u64().is_some() {
        i64::MAX
    } else {
        n.as_f64().map_or(0, |f| f as i64)
    }
}

/// Lenient boolean: `true`, `yes`, `1` (any case) are true, empty uses the
/// default, anything else is false.
pub fn ensure_bool(value: &str, default: bool) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "" => default,
        "true" | "yes" | "1" => true,
        _ => false,
    }
}

pub fn is_json_content(headers: &HeaderMap) -> bool {
    content_type(headers).contains("application/json")
}

pub fn is_form_content(headers: &HeaderMap) -> bool {
    content_type(headers).contains("application/x-www-form-urlencoded")
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// The per-request view used by action handlers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    query: Vec<(String, String)>,
    form: Option<Vec<(String, String)>>,
    json: Option<Arc<Value>>,
}

impl RequestContext {
    /// Build a context from already-extracted parts.
    pub fn new(
        method: Method,
        query: Vec<(String, String)>,
        form: Option<Vec<(String, String)>>,
        json: Option<Value>,
    ) -> Self {
        Self {
            method,
            query,
            form,
            json: json.map(Arc::new),
        }
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// The cached JSON body, if this was a POST with a JSON content type.
    pub fn json_body(&self) -> Option<&Value> {
        self.json.as_deref()
    }

    /// Resolve `key` across query, form and JSON body. First source wins.
    pub fn param_with_type(&self, key: &str) -> Param {
        if let Some(q) = first(&self.query, key).filter(|q| !q.is_empty()) {
            return Param::Raw(q.to_owned());
        }
        if self.method != Method::POST {
            return Param::absent();
        }
        if let Some(p) = self.form.as_deref().and_then(|form| first(form, key)) {
            return Param::Raw(p.to_owned());
        }
        self.json
            .as_deref()
            .and_then(|body| body.get(key))
            .and_then(Param::from_json)
            .unwrap_or_else(Param::absent)
    }

    /// String form of a parameter; empty when absent.
    pub fn param(&self, key: &str) -> String {
        self.param_with_type(key).as_str().into_owned()
    }

    /// String form of a parameter, or `default` when empty.
    pub fn param_or(&self, key: &str, default: &str) -> String {
        let value = self.param(key);
        if value.is_empty() {
            default.to_owned()
        } else {
            value
        }
    }

    /// Base-10 integer parameter; 0 when absent or invalid.
    pub fn param_i64(&self, key: &str) -> i64 {
        match self.param_with_type(key) {
            Param::Int(i) => i,
            other => other.as_str().trim().parse().unwrap_or(0),
        }
    }

    /// Like [`Self::param_i64`] for 32-bit identifiers.
    pub fn param_i32(&self, key: &str) -> i32 {
        self.param(key).trim().parse().unwrap_or(0)
    }

    /// `true` only for the literal `"true"` after applying `default`.
    pub fn param_flag(&self, key: &str, default: bool) -> bool {
        self.param_or(key, if default { "true" } else { "false" }) == "true"
    }

    /// Lenient boolean parameter, see [`ensure_bool`].
    pub fn param_bool(&self, key: &str, default: bool) -> bool {
        ensure_bool(&self.param(key), default)
    }
}

fn first<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

impl<S> FromRequest<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let method = req.method().clone();
        let query = Query::<Vec<(String, String)>>::try_from_uri(req.uri())
            .map(|Query(q)| q)
            .unwrap_or_default();
        let json = req.extensions().get::<JsonBody>().map(|b| b.0.clone());

        let form = if method == Method::POST && is_form_content(req.headers()) {
            // Malformed form bodies resolve as if no field were present.
            Some(
                Form::<Vec<(String, String)>>::from_request(req, state)
                    .await
                    .map(|Form(f)| f)
                    .unwrap_or_default(),
            )
        } else {
            None
        };

        Ok(Self {
            method,
            query,
            form,
            json,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn json_ctx(query: &[(&str, &str)], body: Value) -> RequestContext {
        RequestContext::new(Method::POST, pairs(query), None, Some(body))
    }

    #[test]
    fn query_wins_over_body() {
        let ctx = json_ctx(&[("user_id", "1")], json!({"user_id": 2}));
        assert_eq!(ctx.param_with_type("user_id"), Param::Raw("1".into()));

        let ctx = RequestContext::new(
            Method::POST,
            pairs(&[("flag", "q")]),
            Some(pairs(&[("flag", "f")])),
            None,
        );
        assert_eq!(ctx.param("flag"), "q");
    }

    #[test]
    fn empty_query_value_falls_through() {
        let ctx = json_ctx(&[("group_id", "")], json!({"group_id": 7}));
        assert_eq!(ctx.param_with_type("group_id"), Param::Int(7));
    }

    #[test]
    fn form_used_for_post_only() {
        let form = Some(pairs(&[("card", "nick")]));
        let post = RequestContext::new(Method::POST, vec![], form.clone(), None);
        assert_eq!(post.param_with_type("card"), Param::Raw("nick".into()));

        let get = RequestContext::new(Method::GET, vec![], form, None);
        assert!(get.param_with_type("card").is_empty());
    }

    #[test]
    fn json_kinds_are_tagged() {
        let ctx = json_ctx(
            &[],
            json!({
                "message": [{"type": "text", "data": {"text": "hi"}}],
                "card": "nick",
                "user_id": 456,
                "big": 18446744073709551615u64,
                "ratio": -2.9,
                "yes": true,
                "no": false,
                "nothing": null,
                "obj": {"a": 1}
            }),
        );

        assert!(matches!(ctx.param_with_type("message"), Param::Json(Value::Array(_))));
        assert_eq!(ctx.param("obj"), r#"{"a":1}"#);
        assert_eq!(ctx.param_with_type("card"), Param::Str("nick".into()));
        assert_eq!(ctx.param_with_type("user_id"), Param::Int(456));
        assert_eq!(ctx.param("user_id"), "456");
        assert_eq!(ctx.param_with_type("big"), Param::Int(i64::MAX));
        assert_eq!(ctx.param_with_type("ratio"), Param::Int(-2));
        assert_eq!(ctx.param_with_type("yes"), Param::Bool(true));
        assert_eq!(ctx.param("no"), "false");
        assert!(ctx.param_with_type("nothing").is_empty());
        assert!(ctx.param_with_type("missing").is_empty());
    }

    #[test]
    fn empty_json_string_is_absent() {
        let ctx = json_ctx(&[], json!({"group_id": "", "card": ""}));
        assert_eq!(ctx.param_with_type("group_id"), Param::absent());
        assert!(ctx.param_with_type("card").is_empty());
        assert_eq!(ctx.param_or("card", "fallback"), "fallback");
        assert!(Param::Str(String::new()).is_empty());
        assert!(!Param::Str("x".into()).is_empty());
    }

    #[test]
    fn json_string_that_looks_like_json_stays_a_string() {
        let ctx = json_ctx(&[], json!({"message": "[{\"type\":\"face\"}]"}));
        assert!(matches!(ctx.param_with_type("message"), Param::Str(_)));
    }

    #[test]
    fn resolution_is_repeatable() {
        let ctx = json_ctx(&[], json!({"group_id": 123}));
        for _ in 0..10 {
            assert_eq!(ctx.param_i64("group_id"), 123);
        }
    }

    #[test]
    fn typed_helpers() {
        let ctx = RequestContext::new(
            Method::GET,
            pairs(&[
                ("group_id", "12x"),
                ("message_id", "-5"),
                ("approve", "TRUE"),
                ("auto_escape", "Yes"),
            ]),
            None,
            None,
        );
        assert_eq!(ctx.param_i64("group_id"), 0);
        assert_eq!(ctx.param_i32("message_id"), -5);
        assert_eq!(ctx.param_or("duration", "1800"), "1800");
        // Flags compare literally after defaulting
        assert!(!ctx.param_flag("approve", true));
        assert!(ctx.param_flag("enable", true));
        assert!(!ctx.param_flag("no_cache", false));
        assert!(ctx.param_bool("auto_escape", false));
        assert!(!ctx.param_bool("missing", false));
    }

    #[test]
    fn ensure_bool_values() {
        assert!(ensure_bool("1", false));
        assert!(ensure_bool("yes", false));
        assert!(ensure_bool("", true));
        assert!(!ensure_bool("", false));
        assert!(!ensure_bool("no", true));
        assert!(!ensure_bool("2", true));
    }
}
