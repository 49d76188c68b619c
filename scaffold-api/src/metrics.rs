//! Prometheus exposition and HTTP request metrics.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

const SECONDS_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Install the Prometheus recorder, add the `/metrics` route and the request
/// tracking middleware. Call once, last, on the service router.
pub fn setup_metrics_routes(router: Router) -> Router {
    let handle = install_recorder();

    router
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .layer(axum::middleware::from_fn(track_requests))
}

fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets(SECONDS_BUCKETS)
        .expect("bucket list is non-empty")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Per-request counter and latency histogram, labelled by method, matched
/// route and status.
pub async fn track_requests(req: Request<Body>, next: Next) -> impl IntoResponse {
    let start = Instant::now();

    let path = match req.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_owned(),
        None => req.uri().path().to_owned(),
    };
    let method = req.method().clone();

    let response = next.run(req).await;

    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", response.status().as_u16().to_string()),
    ];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_requests_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());

    response
}
