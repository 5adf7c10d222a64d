//! Configuration for the Reacton runtime.
//!
//! Configuration covers dispatcher defaults, logging and the list of
//! selector bindings wired at startup.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BindingConfig, DispatchConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    ReactonConfig, SpanEventConfig,
};
pub use validation::{validate_binding, validate_bindings, validate_config};
