//! Component contract.
//!
//! A component declares its lifecycle capabilities explicitly: each of
//! `start`, `stop` and `register` is an `Option` field, set through the
//! builder and left `None` when the component has nothing to do for that
//! phase. The callables are `FnOnce`, so "invoked at most once" is enforced by
//! the type system rather than by convention.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::registry::{Registry, RegistryValue};

pub(crate) type StartFn = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;
pub(crate) type StopFn = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;
pub(crate) type RegisterFn = Box<dyn FnOnce() -> RegistryValue + Send>;

/// Async constructor for a component, invoked with a handle to the registry
/// being populated. It sees exactly the components that started before it.
pub type ComponentFactory =
    Box<dyn FnOnce(Registry) -> BoxFuture<'static, anyhow::Result<Component>> + Send>;

/// A unit of process lifecycle: a datastore connection, an HTTP listener, a
/// consumer loop. Built with [`Component::builder`].
#[derive(Default)]
pub struct Component {
    pub(crate) start: Option<StartFn>,
    pub(crate) stop: Option<StopFn>,
    pub(crate) register: Option<RegisterFn>,
}

impl Component {
    pub fn builder() -> ComponentBuilder {
        ComponentBuilder(Component::default())
    }

    /// Register-only component exposing a pre-built value to later components.
    pub fn value<T: Send + Sync + 'static>(value: T) -> Component {
        let value = Arc::new(value);
        Component::builder().registers(move || value).build()
    }
}

pub struct ComponentBuilder(Component);

impl ComponentBuilder {
    /// Async start step. A failure here is fatal to the whole bootstrap pass.
    pub fn on_start<F, Fut>(mut self, start: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.0.start = Some(Box::new(move || Box::pin(start())));
        self
    }

    /// Async stop step, invoked during teardown only if `start` succeeded.
    /// Failures are collected, never fatal.
    pub fn on_stop<F, Fut>(mut self, stop: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.0.stop = Some(Box::new(move || Box::pin(stop())));
        self
    }

    /// Value published into the registry under the component's name, invoked
    /// strictly after `start` succeeds.
    pub fn registers<T, F>(mut self, register: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Arc<T> + Send + 'static,
    {
        self.0.register = Some(Box::new(move || {
            let value: RegistryValue = register();
            value
        }));
        self
    }

    pub fn build(self) -> Component {
        self.0
    }
}
