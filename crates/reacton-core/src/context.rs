//! Per-trigger event context.
//!
//! One [`EventContext`] is created for every triggered event name and handed
//! to each resolved handler in turn. It carries:
//!
//! - the concrete event name,
//! - the opaque *target* the event is about (shared with the caller, so
//!   handlers can observe and mutate application state reachable from it),
//! - the argument map supplied to `trigger`,
//! - the propagation flag a handler sets to halt the walk.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::HandlerError;

/// The opaque target of an event.
///
/// Handlers downcast it with [`EventContext::target`]; state that handlers
/// are meant to modify should sit behind interior mutability.
pub type Target = Arc<dyn Any + Send + Sync>;

/// Named arguments passed to `trigger`.
pub type Arguments = Map<String, Value>;

/// Returns a target for events that are not about any particular object.
pub fn no_target() -> Target {
    Arc::new(())
}

/// The context handed to handlers while an event is dispatched.
pub struct EventContext {
    name: String,
    target: Target,
    arguments: Arguments,
    propagation_stopped: bool,
}

impl EventContext {
    /// Creates a context for one dispatch walk.
    pub fn new(name: impl Into<String>, target: Target, arguments: Arguments) -> Self {
        Self {
            name: name.into(),
            target,
            arguments,
            propagation_stopped: false,
        }
    }

    /// Returns the triggered event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the target downcast to `T`, if it has that type.
    pub fn target<T: Any>(&self) -> Option<&T> {
        self.target.downcast_ref::<T>()
    }

    /// Returns a shared handle to the target downcast to `T`.
    pub fn target_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.target).downcast::<T>().ok()
    }

    /// Returns the untyped target.
    pub fn target_any(&self) -> &Target {
        &self.target
    }

    /// Returns all arguments.
    pub fn params(&self) -> &Arguments {
        &self.arguments
    }

    /// Returns one argument.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    /// Deserializes one argument into `T`.
    ///
    /// # Errors
    ///
    /// Fails if the argument is missing or has an incompatible shape.
    pub fn param_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, HandlerError> {
        let value = self
            .arguments
            .get(name)
            .ok_or_else(|| HandlerError::msg(format!("missing argument '{name}'")))?;
        Ok(T::deserialize(value)?)
    }

    /// Sets an argument, visible to the handlers that run after this one.
    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.arguments.insert(name.into(), value.into());
    }

    /// Stops the walk after the current handler returns.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Returns `true` if a handler stopped propagation.
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

impl fmt::Debug for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .field("propagation_stopped", &self.propagation_stopped)
            .finish_non_exhaustive()
    }
}
