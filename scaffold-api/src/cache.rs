//! Redis-backed HTTP response cache middleware.
//!
//! GET-only. The cache key is the hex SHA-256 of the request's path and query
//! string, so it is stable across replicas. A hit replays the stored body
//! with an `x-cache: hit` header; a successful miss is stored with the
//! configured TTL. Store failures are logged and treated as misses so the
//! cache can never take the endpoint down with it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http_body_util::BodyExt;
use sha2::{Digest, Sha256};
use tracing::{error, warn};

pub const CACHE_HEADER: &str = "x-cache";

/// Backing store for cached responses. Redis in production; tests swap in an
/// in-memory store.
#[async_trait]
pub trait CacheStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore + Send + Sync>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore + Send + Sync>, ttl: Duration) -> Self {
        Self { store, ttl }
    }
}

/// Hex SHA-256 of the request path plus query string.
pub fn cache_key(path_and_query: &str) -> String {
    let digest = Sha256::digest(path_and_query.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Axum middleware; attach with `middleware::from_fn_with_state`.
pub async fn response_cache(
    State(cache): State<ResponseCache>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let key = cache_key(&path_and_query);

    match cache.store.get(&key).await {
        Ok(Some(cached)) => {
            let mut response = Response::new(Body::from(cached));
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            response
                .headers_mut()
                .insert(CACHE_HEADER, HeaderValue::from_static("hit"));
            return response;
        }
        Ok(None) => {}
        // fail open: a broken cache behaves like an empty one
        Err(err) => warn!("response cache read failed: {err}"),
    }

    let response = next.run(request).await;
    if !response.status().is_success() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            error!("failed to buffer response body for caching: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Ok(text) = std::str::from_utf8(&bytes) {
        if let Err(err) = cache.store.set_with_ttl(&key, text, cache.ttl).await {
            warn!("response cache write failed: {err}");
        }
    }

    let mut response = Response::from_parts(parts, Body::from(bytes));
    response
        .headers_mut()
        .insert(CACHE_HEADER, HeaderValue::from_static("miss"));
    response
}
