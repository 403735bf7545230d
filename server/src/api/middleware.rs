//! Request normalization and access-token middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, Query, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, Method, Uri},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::error::ApiError;
use super::request::{is_json_content, JsonBody};
use super::AppState;
use crate::webhooks::signing::constant_time_eq;

/// Client address for log lines, when the server was built with connect info.
fn remote_addr(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".into())
}

/// First pipeline stage, applied to every request.
///
/// - Methods other than GET/POST get `404`.
/// - POST with a JSON content type has its body read and parsed once; an
///   unreadable body or invalid JSON gets `400`. The parsed document is
///   stored as [`JsonBody`] and the raw bytes are put back for later
///   extractors.
/// - Everything else passes through untouched.
#[tracing::instrument(skip_all, fields(method = %request.method(), uri = %request.uri()))]
pub async fn normalize_request(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if request.method() != Method::GET && request.method() != Method::POST {
        warn!(remote = %remote_addr(&request), "Rejected request: method not allowed");
        return Err(ApiError::MethodNotAllowed);
    }

    if request.method() != Method::POST || !is_json_content(request.headers()) {
        return Ok(next.run(request).await);
    }

    let remote = remote_addr(&request);
    let (mut parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, state.config.max_body_size)
        .await
        .map_err(|e| {
            warn!(remote = %remote, error = %e, "Failed to read request body");
            ApiError::UnreadableBody
        })?;
    let document: Value = serde_json::from_slice(&bytes).map_err(|e| {
        warn!(remote = %remote, error = %e, "Rejected request: invalid JSON");
        ApiError::InvalidJson
    })?;

    parts.extensions.insert(JsonBody(Arc::new(document)));
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Second pipeline stage: shared access-token check.
///
/// Disabled when no token is configured. Otherwise a non-empty
/// `Authorization` header must carry the token after its first space;
/// without the header, the `access_token` query parameter must match.
#[tracing::instrument(skip_all)]
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.config.access_token.as_deref() {
        if let Err(e) = check_token(request.headers(), request.uri(), expected) {
            warn!(remote = %remote_addr(&request), error = %e, "Rejected request: unauthorized");
            return Err(e);
        }
    }

    Ok(next.run(request).await)
}

#[derive(Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

/// Check a request's credentials against `expected`.
///
/// An `Authorization` header with no space has no token part and is
/// rejected outright rather than falling back to the query parameter.
pub fn check_token(headers: &HeaderMap, uri: &Uri, expected: &str) -> Result<(), ApiError> {
    if let Some(header) = headers.get(AUTHORIZATION).filter(|h| !h.is_empty()) {
        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.split_once(' '))
            .map(|(_, token)| token)
            .ok_or(ApiError::MalformedAuthHeader)?;
        return if constant_time_eq(expected, token) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        };
    }

    let provided = Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.access_token)
        .unwrap_or_default();
    if constant_time_eq(expected, &provided) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}
