//! Reacton Runtime - configuration, logging and handler wiring.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `ReactonConfig`)
//! - Logging setup on top of `tracing-subscriber` (`LoggingBuilder`)
//! - A catalog of named handlers (`HandlerCatalog`)
//! - Runtime bootstrap that registers configured bindings (`ReactonRuntime`)
//!
//! # Configuration file
//!
//! ```toml
//! [dispatch]
//! default_priority = 1
//! strict = true
//!
//! [logging]
//! level = "debug"
//!
//! [[bindings]]
//! selector = "^=offer"
//! handler = "audit"
//! priority = 10
//!
//! [[bindings]]
//! selector = "offer.accept"
//! handler = "accept"
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use catalog::HandlerCatalog;
pub use config::{
    BindingConfig, ConfigError, ConfigLoader, ConfigResult, DispatchConfig, LoggingConfig,
    ReactonConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{ReactonRuntime, RuntimeBuilder, SkippedBinding, WiringReport, wire_bindings};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
