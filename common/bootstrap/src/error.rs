//! Error types for the registry and the bootstrap/teardown passes.

use thiserror::Error;

/// Fatal error from a bootstrap pass. Carries the name of the offending
/// component so the entry point can log something actionable before exiting.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Two factories were registered under the same name; rejected before any
    /// factory runs.
    #[error("duplicate component name '{0}'")]
    DuplicateName(String),

    /// A component's factory or `start` failed. Already-started components
    /// have been stopped by the time this is returned.
    #[error("component '{component}' failed to start: {cause:#}")]
    Component {
        component: String,
        cause: anyhow::Error,
    },
}

/// A single component's failure during teardown. Collected into a list by the
/// composite stop function, never propagated as a failure of the pass itself.
#[derive(Debug, Error)]
#[error("component '{component}' failed to stop: {cause:#}")]
pub struct StopError {
    pub component: String,
    pub cause: anyhow::Error,
}

/// Failed registry lookup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no registry entry named '{0}'")]
    Missing(String),

    #[error("registry entry '{name}' is not a {expected}")]
    TypeMismatch { name: String, expected: &'static str },
}
