//! Health reporting for components of a service.
//!
//! A service is only trustworthy when every lifecycle component in it is
//! running and reporting, so the process-level answer is the combination of
//! the per-component answers:
//!   - if any component reported unhealthy, the process is unhealthy
//!   - if every component recently reported healthy, the process is healthy
//!   - a component that missed its reporting deadline counts as stalled,
//!     and the check fails.
//!
//! Merging the k8s notions of liveness and readiness into one state is a
//! foot-gun, so this registry does not try: create one instance per probe.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentStatus {
    /// Set when a component is registered, before its first report.
    Starting,
    /// Recently reported healthy; must report again before the deadline.
    HealthyUntil(Instant),
    /// Explicitly reported unhealthy.
    Unhealthy,
    /// Derived when a HealthyUntil deadline has passed without a new report.
    Stalled,
}

impl ComponentStatus {
    pub fn is_healthy(&self) -> bool {
        match self {
            ComponentStatus::HealthyUntil(until) => *until > Instant::now(),
            _ => false,
        }
    }
}

/// Aggregate status across all registered components.
#[derive(Debug, Default)]
pub struct HealthStatus {
    /// True only when every registered component is currently healthy.
    pub healthy: bool,
    /// Per-component detail, for the probe response body.
    pub components: HashMap<String, ComponentStatus>,
}

impl IntoResponse for HealthStatus {
    /// 200 when healthy, 500 otherwise, with the component detail in the body
    /// for debugging.
    fn into_response(self) -> Response {
        let body = format!("{self:?}");
        match self.healthy {
            true => (StatusCode::OK, body),
            false => (StatusCode::INTERNAL_SERVER_ERROR, body),
        }
        .into_response()
    }
}

/// Handle held by one component to report into the registry it was
/// registered with. Cloneable; reports are synchronous map writes.
#[derive(Clone)]
pub struct HealthHandle {
    component: String,
    deadline: Duration,
    statuses: Arc<RwLock<HashMap<String, ComponentStatus>>>,
}

impl HealthHandle {
    /// Report healthy for the next deadline window. Must be called more often
    /// than the deadline the component was registered with.
    pub fn report_healthy(&self) {
        self.report_status(ComponentStatus::HealthyUntil(Instant::now() + self.deadline));
    }

    pub fn report_status(&self, status: ComponentStatus) {
        let mut statuses = self.statuses.write().expect("poisoned health lock");
        statuses.insert(self.component.clone(), status);
    }
}

/// Registry of component health for one probe.
#[derive(Clone)]
pub struct HealthRegistry {
    name: String,
    statuses: Arc<RwLock<HashMap<String, ComponentStatus>>>,
}

impl HealthRegistry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            statuses: Default::default(),
        }
    }

    /// Register a component; the returned handle is passed to the component
    /// so it can report its status. Until the first report it is `Starting`,
    /// which fails the probe.
    pub fn register(&self, component: impl Into<String>, deadline: Duration) -> HealthHandle {
        let handle = HealthHandle {
            component: component.into(),
            deadline,
            statuses: self.statuses.clone(),
        };
        handle.report_status(ComponentStatus::Starting);
        handle
    }

    /// Overall process status for this probe, computed from every registered
    /// component. Usable directly as an axum handler return value.
    pub fn get_status(&self) -> HealthStatus {
        let statuses = self.statuses.read().expect("poisoned health lock");
        let now = Instant::now();

        // an empty registry means nothing has proven itself yet
        let mut result = HealthStatus {
            healthy: !statuses.is_empty(),
            components: HashMap::with_capacity(statuses.len()),
        };

        for (component, status) in statuses.iter() {
            let effective = match status {
                ComponentStatus::HealthyUntil(until) if *until > now => status.clone(),
                ComponentStatus::HealthyUntil(_) => ComponentStatus::Stalled,
                other => other.clone(),
            };
            if !matches!(effective, ComponentStatus::HealthyUntil(_)) {
                result.healthy = false;
            }
            result.components.insert(component.clone(), effective);
        }

        match result.healthy {
            true => info!("{} health check ok", self.name),
            false => warn!("{} health check failed: {:?}", self.name, result.components),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_is_unhealthy() {
        let registry = HealthRegistry::new("liveness");
        assert!(!registry.get_status().healthy);
    }

    #[test]
    fn component_lifecycle() {
        let registry = HealthRegistry::new("liveness");

        // registered components begin in Starting, which fails the probe
        let handle = registry.register("one", Duration::from_secs(30));
        let status = registry.get_status();
        assert!(!status.healthy);
        assert_eq!(
            status.components.get("one"),
            Some(&ComponentStatus::Starting)
        );

        // healthy once the component reports
        handle.report_healthy();
        assert!(registry.get_status().healthy);

        // unhealthy again if the component says so
        handle.report_status(ComponentStatus::Unhealthy);
        let status = registry.get_status();
        assert!(!status.healthy);
        assert_eq!(
            status.components.get("one"),
            Some(&ComponentStatus::Unhealthy)
        );
    }

    #[test]
    fn stale_report_degrades_to_stalled() {
        let registry = HealthRegistry::new("liveness");
        let handle = registry.register("one", Duration::from_secs(30));

        handle.report_healthy();
        assert!(registry.get_status().healthy);

        // a deadline in the past means the component went quiet
        handle.report_status(ComponentStatus::HealthyUntil(
            Instant::now() - Duration::from_secs(1),
        ));
        let status = registry.get_status();
        assert!(!status.healthy);
        assert_eq!(
            status.components.get("one"),
            Some(&ComponentStatus::Stalled)
        );
    }

    #[test]
    fn every_component_must_be_healthy() {
        let registry = HealthRegistry::new("liveness");
        let one = registry.register("one", Duration::from_secs(30));
        let two = registry.register("two", Duration::from_secs(30));

        one.report_healthy();
        assert!(!registry.get_status().healthy);

        two.report_healthy();
        assert!(registry.get_status().healthy);

        one.report_status(ComponentStatus::Unhealthy);
        assert!(!registry.get_status().healthy);

        one.report_healthy();
        assert!(registry.get_status().healthy);
    }

    #[test]
    fn into_response_maps_health_to_status_code() {
        let nok = HealthStatus::default().into_response();
        assert_eq!(nok.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let ok = HealthStatus {
            healthy: true,
            components: Default::default(),
        }
        .into_response();
        assert_eq!(ok.status(), StatusCode::OK);
    }
}
