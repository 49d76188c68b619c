//! Demonstration microservice for the bootstrap orchestrator: env-driven
//! config, a Redis-backed response cache, liveness/readiness probes and an
//! axum HTTP server, all composed as ordered lifecycle components and torn
//! down in reverse on shutdown.

pub mod cache;
pub mod caller;
pub mod config;
pub mod metrics;
pub mod redis;
pub mod router;
pub mod server;
