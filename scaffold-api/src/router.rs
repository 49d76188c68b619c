use std::future::ready;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use health::HealthRegistry;
use serde::Serialize;
use tracing::warn;

use crate::cache::{response_cache, ResponseCache};
use crate::caller::{ExampleService, ServiceCallError};
use crate::metrics::setup_metrics_routes;

#[derive(Serialize)]
struct ExampleResponse {
    status: &'static str,
    // changes every call, so a cache hit is observable
    served_at_ms: u128,
}

async fn example() -> Json<ExampleResponse> {
    Json(ExampleResponse {
        status: "ok",
        served_at_ms: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
    })
}

async fn example_detail(
    State(service): State<ExampleService>,
    Path(custom_id): Path<String>,
) -> Response {
    match service.detail(&custom_id).await {
        Ok(detail) => Json(detail).into_response(),
        Err(err) => {
            warn!("example detail call failed: {err}");
            let status = match &err {
                ServiceCallError::Remote { status, .. } => *status,
                ServiceCallError::Transport { .. } => StatusCode::BAD_GATEWAY,
            };
            (status, err.to_string()).into_response()
        }
    }
}

async fn index() -> &'static str {
    "scaffold-api"
}

/// Service router: index, probe endpoints, the cached example endpoint, the
/// example-detail proxy and (optionally) Prometheus metrics. The response
/// cache and example service are optional so tests can exercise routes
/// without a Redis connection or an upstream.
pub fn router(
    liveness: HealthRegistry,
    readiness: HealthRegistry,
    response_cache_state: Option<ResponseCache>,
    example_service: Option<ExampleService>,
    export_prometheus: bool,
) -> Router {
    let example_routes = {
        let routes = Router::new().route("/example", get(example));
        match response_cache_state {
            Some(cache) => routes.layer(middleware::from_fn_with_state(cache, response_cache)),
            None => routes,
        }
    };

    let detail_routes = match example_service {
        Some(service) => Router::new()
            .route("/example/detail/:custom_id", get(example_detail))
            .with_state(service),
        None => Router::new(),
    };

    let mut router = Router::new()
        .route("/", get(index))
        .route("/_liveness", get(move || ready(liveness.get_status())))
        .route("/_readiness", get(move || ready(readiness.get_status())))
        .merge(example_routes)
        .merge(detail_routes);

    if export_prometheus {
        router = setup_metrics_routes(router);
    }
    router
}
