use envconfig::Envconfig;
use tokio::signal::unix::SignalKind;
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use bootstrap::Registry;
use health::HealthRegistry;
use scaffold_api::config::Config;
use scaffold_api::server;

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())
        .expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
}

#[tokio::main]
async fn main() {
    let config = Config::init_from_env().expect("invalid configuration");

    let log_layer = {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy();
        let fmt_layer = tracing_subscriber::fmt::layer();
        if config.log_json {
            fmt_layer.json().with_filter(filter).boxed()
        } else {
            fmt_layer.with_filter(filter).boxed()
        }
    };
    tracing_subscriber::registry().with(log_layer).init();

    // process-wide singletons, visible to every component factory
    let registry = Registry::new();
    registry.insert("config", config);
    registry.insert("liveness", HealthRegistry::new("liveness"));
    registry.insert("readiness", HealthRegistry::new("readiness"));

    let running = match server::components().run(registry).await {
        Ok(running) => running,
        Err(err) => {
            error!("bootstrap failed: {err}");
            std::process::exit(1);
        }
    };
    info!("all components started");

    shutdown_signal().await;

    let errors = running.stopper.stop().await;
    if errors.is_empty() {
        info!("shutdown complete");
    } else {
        for err in &errors {
            error!("shutdown error: {err}");
        }
        std::process::exit(1);
    }
}
