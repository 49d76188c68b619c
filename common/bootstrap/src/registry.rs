//! Name-keyed dependency registry.
//!
//! A `Registry` is a cloneable handle over a shared map; every clone reads and
//! writes the same entries. During a bootstrap pass the orchestrator is the
//! only writer, and it inserts a component's value strictly after that
//! component's `start` has resolved, so a lookup never observes a
//! partially-started component. After bootstrap the registry should be treated
//! as read-mostly: overrides belong on a [`Registry::child`] scope, never on
//! the shared root.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::RegistryError;

/// Type-erased value stored in the registry.
pub type RegistryValue = Arc<dyn Any + Send + Sync>;

#[derive(Clone, Default)]
pub struct Registry {
    parent: Option<Arc<Registry>>,
    entries: Arc<RwLock<HashMap<String, RegistryValue>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a scoped registry: lookups fall through to this registry, while
    /// inserts land in the child and shadow the parent without mutating it.
    /// Used for per-test and per-request overrides.
    pub fn child(&self) -> Registry {
        Registry {
            parent: Some(Arc::new(self.clone())),
            entries: Default::default(),
        }
    }

    /// Insert a value under `name`, shadowing any previous entry in this scope.
    pub fn insert<T: Send + Sync + 'static>(&self, name: impl Into<String>, value: T) {
        self.insert_value(name, Arc::new(value));
    }

    /// Insert an already type-erased value under `name`.
    pub fn insert_value(&self, name: impl Into<String>, value: RegistryValue) {
        let mut entries = self.entries.write().expect("poisoned registry lock");
        entries.insert(name.into(), value);
    }

    /// Typed lookup, walking the parent chain. Reports a missing entry and a
    /// wrongly-typed entry as distinct errors.
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        let value = self
            .lookup(name)
            .ok_or_else(|| RegistryError::Missing(name.to_string()))?;
        value
            .downcast::<T>()
            .map_err(|_| RegistryError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Every name visible from this scope, for diagnostics.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = match &self.parent {
            Some(parent) => parent.names(),
            None => Vec::new(),
        };
        let entries = self.entries.read().expect("poisoned registry lock");
        for name in entries.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names.sort();
        names
    }

    fn lookup(&self, name: &str) -> Option<RegistryValue> {
        let local = {
            let entries = self.entries.read().expect("poisoned registry lock");
            entries.get(name).cloned()
        };
        match local {
            Some(value) => Some(value),
            None => self.parent.as_ref().and_then(|parent| parent.lookup(name)),
        }
    }
}
