//! Runtime error types.

use reacton_core::ReactonError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while building or running the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A configured binding could not be wired in strict mode.
    #[error("Failed to wire binding #{index} ('{selector}' -> '{handler}'): {source}")]
    Wiring {
        index: usize,
        selector: String,
        handler: String,
        #[source]
        source: ReactonError,
    },

    /// An engine operation failed.
    #[error(transparent)]
    Engine(#[from] ReactonError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
