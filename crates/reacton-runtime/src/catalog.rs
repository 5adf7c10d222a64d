//! Named handler catalog.
//!
//! Configuration refers to handlers by name. The catalog maps those names to
//! handler instances supplied by the application.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use reacton_core::{Handler, HandlerRef, Named, ReactonError, ReactonResult};
use tracing::debug;

/// A registry of handlers addressable by name.
#[derive(Clone, Default)]
pub struct HandlerCatalog {
    handlers: HashMap<String, HandlerRef>,
}

impl HandlerCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `handler` under `name`, replacing any previous entry.
    ///
    /// The handler reports `name` in logs.
    pub fn insert<H: Handler>(&mut self, name: impl Into<String>, handler: H) -> &mut Self {
        let name = name.into();
        let handler: HandlerRef = Arc::new(Named::new(name.clone(), handler));
        self.insert_ref(name, handler)
    }

    /// Adds an already shared handler under `name`.
    pub fn insert_ref(&mut self, name: impl Into<String>, handler: HandlerRef) -> &mut Self {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            debug!(handler = %name, "Replaced catalog handler");
        }
        self
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<H: Handler>(mut self, name: impl Into<String>, handler: H) -> Self {
        self.insert(name, handler);
        self
    }

    /// Looks up a handler.
    ///
    /// # Errors
    ///
    /// Returns [`ReactonError::InvalidCallback`] if no handler has that name.
    pub fn get(&self, name: &str) -> ReactonResult<HandlerRef> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| ReactonError::invalid_callback(format!("no handler named '{name}'")))
    }

    /// Returns `true` if a handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Returns the registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCatalog")
            .field("handlers", &self.names())
            .finish()
    }
}
