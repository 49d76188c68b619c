//! Ordered component bootstrap: sequential async start-up with rollback on
//! failure, a name-keyed dependency registry that later components read their
//! dependencies from, and a composite stop function that tears everything down
//! in exact reverse start order, collecting stop failures instead of
//! short-circuiting on them.

mod component;
mod error;
mod metrics;
mod orchestrator;
mod registry;

pub use component::{Component, ComponentBuilder, ComponentFactory};
pub use error::{BootstrapError, RegistryError, StopError};
pub use orchestrator::{Bootstrap, Running, Stopper};
pub use registry::{Registry, RegistryValue};
