//! The bootstrap pass and its composite stop function.
//!
//! Start-up is strictly sequential in registration order: a component's
//! factory and `start` only run after every earlier component has started and
//! published its registry value, so "a component only sees earlier components'
//! registrations" holds by construction. Nothing here starts components in
//! parallel; the ordering guarantee is the contract, not an accident.
//!
//! There is deliberately no timeout on an individual `start` or `stop`: a hung
//! component blocks the pass, exactly as in the system this replaces.

use std::collections::HashSet;
use std::future::Future;

use tracing::{error, info};

use crate::component::{Component, ComponentFactory, StopFn};
use crate::error::{BootstrapError, StopError};
use crate::metrics;
use crate::registry::Registry;

/// Ordered set of named component factories. Insertion order is start order.
pub struct Bootstrap {
    app: String,
    components: Vec<(String, ComponentFactory)>,
}

impl Bootstrap {
    /// `app` names the whole set, for log and metric labels.
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            components: Vec::new(),
        }
    }

    /// Append a named factory; components start in the order they are added.
    pub fn component<F, Fut>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: FnOnce(Registry) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Component>> + Send + 'static,
    {
        self.components
            .push((name.into(), Box::new(move |registry| Box::pin(factory(registry)))));
        self
    }

    /// Run the bootstrap pass over `registry`.
    ///
    /// Per component, in order: invoke the factory, await `start`, publish the
    /// `register` value under the component's name, record the stop handle.
    /// On the first failure the pass halts, every already-started component is
    /// stopped in reverse order (best effort, errors logged), and the error is
    /// returned tagged with the failing component's name.
    pub async fn run(self, registry: Registry) -> Result<Running, BootstrapError> {
        let mut seen = HashSet::new();
        for (name, _) in &self.components {
            if !seen.insert(name.as_str()) {
                return Err(BootstrapError::DuplicateName(name.clone()));
            }
        }

        let app = self.app;
        let mut handles: Vec<StopHandle> = Vec::new();

        for (name, factory) in self.components {
            match start_component(&registry, &name, factory).await {
                Ok(stop) => {
                    metrics::emit_component_started(&app, &name);
                    info!(component = %name, "component started");
                    if let Some(stop) = stop {
                        handles.push(StopHandle { name, stop });
                    }
                }
                Err(cause) => {
                    metrics::emit_component_start_failed(&app, &name);
                    error!(component = %name, "component failed to start: {cause:#}");
                    // Roll back everything already started before surfacing
                    // the error, so a partial bootstrap leaks nothing.
                    run_stop(&app, handles).await;
                    return Err(BootstrapError::Component {
                        component: name,
                        cause,
                    });
                }
            }
        }

        Ok(Running {
            registry,
            stopper: Stopper { app, handles },
        })
    }
}

async fn start_component(
    registry: &Registry,
    name: &str,
    factory: ComponentFactory,
) -> anyhow::Result<Option<StopFn>> {
    let Component {
        start,
        stop,
        register,
    } = factory(registry.clone()).await?;

    if let Some(start) = start {
        start().await?;
    }

    if let Some(register) = register {
        // Published only after start resolves, and visible to every later
        // factory and start in this same pass.
        registry.insert_value(name, register());
    }

    Ok(stop)
}

/// A successfully bootstrapped system: the populated registry plus the
/// composite stop function for it.
pub struct Running {
    pub registry: Registry,
    pub stopper: Stopper,
}

impl std::fmt::Debug for Running {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Running").finish_non_exhaustive()
    }
}

struct StopHandle {
    name: String,
    stop: StopFn,
}

/// Composite stop function returned from a successful bootstrap pass.
///
/// [`Stopper::stop`] consumes the value, so the "call exactly once" rule is a
/// compile-time property rather than a convention.
pub struct Stopper {
    app: String,
    handles: Vec<StopHandle>,
}

impl Stopper {
    /// Stop every started component, sequentially, in exact reverse start
    /// order. A failing stop is recorded and teardown proceeds to the next
    /// handle; the collected failures are returned (empty list = clean
    /// shutdown). Never fails itself.
    pub async fn stop(self) -> Vec<StopError> {
        run_stop(&self.app, self.handles).await
    }
}

async fn run_stop(app: &str, handles: Vec<StopHandle>) -> Vec<StopError> {
    let mut errors = Vec::new();
    for StopHandle { name, stop } in handles.into_iter().rev() {
        info!(component = %name, "stopping component");
        match stop().await {
            Ok(()) => info!(component = %name, "component stopped"),
            Err(cause) => {
                metrics::emit_component_stop_failed(app, &name);
                error!(component = %name, "component failed to stop: {cause:#}");
                errors.push(StopError {
                    component: name,
                    cause,
                });
            }
        }
    }
    errors
}
