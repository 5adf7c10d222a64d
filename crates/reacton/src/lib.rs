//! # Reacton
//!
//! Priority-ordered, selector-matched event dispatch.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐     ┌────────────┐     ┌──────────────────────────┐
//! │ reacton.toml  │────▶│  Runtime   │────▶│ Dispatcher               │
//! │ + catalog     │     │  (wiring)  │     │  exact + pattern handlers│
//! └───────────────┘     └────────────┘     └──────────────────────────┘
//! ```
//!
//! - **Core** (`reacton-core`): selectors, pattern matchers, the handler
//!   registry and the dispatch walk
//! - **Runtime** (`reacton-runtime`): configuration, logging, and wiring
//!   configured bindings to named handlers
//!
//! ## Quick Start
//!
//! ```rust
//! use reacton::prelude::*;
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher
//!     .on("~=accept")?
//!     .priority(5)
//!     .call(|ctx: &mut EventContext| format!("saw {}", ctx.name()))?;
//!
//! let responses = dispatcher.trigger("offer.accept", no_target(), Arguments::new())?;
//! assert_eq!(responses[0], "saw offer.accept");
//! # Ok::<(), ReactonError>(())
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use reacton_core as core;
pub use reacton_runtime as runtime;

/// Commonly used types.
///
/// ```rust,ignore
/// use reacton::prelude::*;
/// ```
pub mod prelude {
    pub use reacton_core::prelude::*;
    pub use reacton_core::{IntoResponse, MatchOperator, Named};

    pub use reacton_runtime::{
        BindingConfig, ConfigLoader, HandlerCatalog, LoggingBuilder, ReactonConfig,
        ReactonRuntime, RuntimeError, RuntimeResult,
    };
}
