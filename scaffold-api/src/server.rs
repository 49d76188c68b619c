//! Component wiring: the service's ordered lifecycle set.
//!
//! `redis_cache` starts first and publishes its client into the registry,
//! `example_service` publishes the outbound microservice client, and
//! `http_server` starts last, resolving both plus the process-wide singletons
//! (config, probe registries) seeded by the entry point. Teardown runs the
//! other way round: the server drains before the cache connection is
//! released.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bootstrap::{Bootstrap, Component, Registry};
use health::{ComponentStatus, HealthRegistry};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::ResponseCache;
use crate::caller::ExampleService;
use crate::config::Config;
use crate::redis::RedisCache;
use crate::router::router;

pub fn components() -> Bootstrap {
    Bootstrap::new("scaffold-api")
        .component("redis_cache", redis_cache_component)
        .component("example_service", example_service_component)
        .component("http_server", http_server_component)
}

/// Register-only component: the outbound client needs no start-up or
/// teardown, but later components resolve it from the registry.
async fn example_service_component(registry: Registry) -> anyhow::Result<Component> {
    let config: Arc<Config> = registry.get("config")?;
    let Some(url) = config.example_service_url.clone() else {
        info!("no example service url configured, outbound calls disabled");
        return Ok(Component::builder().build());
    };

    let timeout = Duration::from_millis(config.microservice_timeout_ms);
    let service = ExampleService::new(&url, timeout)?;
    Ok(Component::value(service))
}

async fn redis_cache_component(registry: Registry) -> anyhow::Result<Component> {
    let config: Arc<Config> = registry.get("config")?;
    let url = config.redis_url.clone();
    let prefix = config.redis_key_prefix.clone();

    let slot: Arc<Mutex<Option<RedisCache>>> = Arc::new(Mutex::new(None));
    let start_slot = slot.clone();
    let register_slot = slot.clone();
    let stop_slot = slot;

    Ok(Component::builder()
        .on_start(move || async move {
            let client = RedisCache::connect(&url, &prefix).await?;
            *start_slot.lock().expect("poisoned redis slot") = Some(client);
            info!("redis cache connection is ready");
            Ok(())
        })
        .registers(move || {
            // runs only after start succeeded, so the slot is filled
            let client = register_slot
                .lock()
                .expect("poisoned redis slot")
                .clone()
                .expect("redis client present after start");
            Arc::new(client)
        })
        .on_stop(move || async move {
            // the multiplexed connection closes once its last clone is dropped
            drop(stop_slot.lock().expect("poisoned redis slot").take());
            info!("redis cache connection released");
            Ok(())
        })
        .build())
}

struct ServerTasks {
    server: JoinHandle<std::io::Result<()>>,
    heartbeat: JoinHandle<()>,
}

async fn http_server_component(registry: Registry) -> anyhow::Result<Component> {
    let config: Arc<Config> = registry.get("config")?;
    let redis: Arc<RedisCache> = registry.get("redis_cache")?;
    let liveness: Arc<HealthRegistry> = registry.get("liveness")?;
    let readiness: Arc<HealthRegistry> = registry.get("readiness")?;

    let deadline = Duration::from_secs(config.liveness_deadline_secs.max(1));
    let liveness_handle = liveness.register("http_server", deadline);
    let readiness_handle = readiness.register("http_server", deadline);
    let readiness_stop_handle = readiness_handle.clone();

    let example_service = registry
        .get::<ExampleService>("example_service")
        .ok()
        .map(|service| (*service).clone());

    let bind = config.bind();
    let ttl = Duration::from_millis(config.response_cache_ttl_ms);
    let app = router(
        (*liveness).clone(),
        (*readiness).clone(),
        Some(ResponseCache::new(redis, ttl)),
        example_service,
        config.export_prometheus,
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let tasks: Arc<Mutex<Option<ServerTasks>>> = Arc::new(Mutex::new(None));
    let start_tasks = tasks.clone();
    let stop_tasks = tasks;

    Ok(Component::builder()
        .on_start(move || async move {
            let listener = TcpListener::bind(&bind).await?;
            info!(%bind, "http server listening");

            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let server = tokio::spawn(async move { serve.await });

            let heartbeat = tokio::spawn(async move {
                let mut interval = tokio::time::interval(deadline / 2);
                loop {
                    interval.tick().await;
                    liveness_handle.report_healthy();
                    readiness_handle.report_healthy();
                }
            });

            *start_tasks.lock().expect("poisoned server task slot") =
                Some(ServerTasks { server, heartbeat });
            Ok(())
        })
        .on_stop(move || async move {
            let tasks = stop_tasks.lock().expect("poisoned server task slot").take();
            let Some(ServerTasks { server, heartbeat }) = tasks else {
                return Ok(());
            };

            heartbeat.abort();
            // flip readiness before draining so traffic stops being routed here
            readiness_stop_handle.report_status(ComponentStatus::Unhealthy);
            let _ = shutdown_tx.send(());
            server.await??;
            info!("http server drained and stopped");
            Ok(())
        })
        .build())
}
