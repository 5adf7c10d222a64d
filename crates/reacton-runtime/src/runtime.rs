//! Runtime bootstrap.
//!
//! [`ReactonRuntime`] turns a [`ReactonConfig`] and a [`HandlerCatalog`] into
//! a ready [`Dispatcher`]: logging is initialized, and every enabled binding
//! is registered in the order it appears in the configuration.
//!
//! ```rust,ignore
//! use reacton_runtime::{HandlerCatalog, ReactonRuntime};
//!
//! let catalog = HandlerCatalog::new()
//!     .with("accept", accept_offer)
//!     .with("audit", audit);
//!
//! let runtime = ReactonRuntime::builder()
//!     .config_file("reacton.toml")
//!     .catalog(catalog)
//!     .build()?;
//!
//! let responses = runtime.trigger("offer.accept", target, args)?;
//! ```
//!
//! # Strict and lenient wiring
//!
//! With `dispatch.strict = true` the first binding that cannot be wired
//! aborts startup with [`RuntimeError::Wiring`]. Otherwise the binding is
//! skipped, logged with `warn!`, and listed in the [`WiringReport`].

use std::path::PathBuf;

use reacton_core::{
    Arguments, Dispatcher, HandlerEntry, ReactonError, ResponseCollection, Target,
};
use tracing::{Level, debug, info, span, warn};

use crate::catalog::HandlerCatalog;
use crate::config::{BindingConfig, ConfigLoader, ReactonConfig, validate_binding};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// A binding that was not registered.
#[derive(Debug)]
pub struct SkippedBinding {
    /// Position in the configured binding list.
    pub index: usize,
    pub selector: String,
    pub handler: String,
    pub reason: ReactonError,
}

/// Outcome of wiring the configured bindings.
#[derive(Debug, Default)]
pub struct WiringReport {
    /// Registered bindings, in configuration order.
    pub bound: Vec<HandlerEntry>,
    /// Bindings that failed to wire.
    pub skipped: Vec<SkippedBinding>,
    /// Bindings turned off with `enabled = false`.
    pub disabled: usize,
}

impl WiringReport {
    /// Returns `true` if every enabled binding was registered.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Registers `bindings` on `dispatcher`, resolving handler names through
/// `catalog`.
///
/// # Errors
///
/// In strict mode, returns [`RuntimeError::Wiring`] for the first binding
/// that cannot be registered. Bindings registered before the failure stay
/// registered.
pub fn wire_bindings(
    dispatcher: &Dispatcher,
    bindings: &[BindingConfig],
    catalog: &HandlerCatalog,
    strict: bool,
) -> RuntimeResult<WiringReport> {
    let span = span!(Level::DEBUG, "wire_bindings", count = bindings.len(), strict);
    let _enter = span.enter();

    let mut report = WiringReport::default();

    for (index, binding) in bindings.iter().enumerate() {
        if !binding.enabled {
            debug!(index, selector = %binding.selector, "Binding disabled, skipping");
            report.disabled += 1;
            continue;
        }

        match wire_binding(dispatcher, binding, catalog) {
            Ok(entry) => report.bound.push(entry),
            Err(source) if strict => {
                return Err(RuntimeError::Wiring {
                    index,
                    selector: binding.selector.clone(),
                    handler: binding.handler.clone(),
                    source,
                });
            }
            Err(reason) => {
                warn!(
                    index,
                    selector = %binding.selector,
                    handler = %binding.handler,
                    error = %reason,
                    "Skipping binding"
                );
                report.skipped.push(SkippedBinding {
                    index,
                    selector: binding.selector.clone(),
                    handler: binding.handler.clone(),
                    reason,
                });
            }
        }
    }

    Ok(report)
}

fn wire_binding(
    dispatcher: &Dispatcher,
    binding: &BindingConfig,
    catalog: &HandlerCatalog,
) -> Result<HandlerEntry, ReactonError> {
    let selector = validate_binding(binding)?;
    let handler = catalog.get(&binding.handler)?;

    let mut pending = dispatcher.on_selector(selector);
    if let Some(priority) = binding.priority {
        pending = pending.priority(priority);
    }
    pending.call_ref(handler)
}

/// The Reacton runtime: a configured dispatcher.
#[derive(Debug)]
pub struct ReactonRuntime {
    config: ReactonConfig,
    dispatcher: Dispatcher,
    report: WiringReport,
}

impl ReactonRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Logging is initialized from `config.logging` unless a subscriber is
    /// already installed.
    ///
    /// # Errors
    ///
    /// See [`wire_bindings`].
    pub fn from_config(config: ReactonConfig, catalog: &HandlerCatalog) -> RuntimeResult<Self> {
        logging::init_from_config(&config.logging);
        Self::assemble(config, catalog)
    }

    fn assemble(config: ReactonConfig, catalog: &HandlerCatalog) -> RuntimeResult<Self> {
        let dispatcher = Dispatcher::with_default_priority(config.dispatch.default_priority);
        let report = wire_bindings(
            &dispatcher,
            &config.bindings,
            catalog,
            config.dispatch.strict,
        )?;

        info!(
            bound = report.bound.len(),
            skipped = report.skipped.len(),
            disabled = report.disabled,
            default_priority = config.dispatch.default_priority,
            "Runtime initialized from configuration"
        );

        Ok(Self {
            config,
            dispatcher,
            report,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ReactonConfig {
        &self.config
    }

    /// Returns the dispatcher. Further bindings may be added through it.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns the wiring report.
    pub fn report(&self) -> &WiringReport {
        &self.report
    }

    /// Triggers an event on the runtime's dispatcher.
    pub fn trigger(
        &self,
        event_name: &str,
        target: Target,
        arguments: Arguments,
    ) -> RuntimeResult<ResponseCollection> {
        Ok(self.dispatcher.trigger(event_name, target, arguments)?)
    }

    /// Triggers several events on the runtime's dispatcher.
    pub fn trigger_many<I, S>(
        &self,
        event_names: I,
        target: Target,
        arguments: Arguments,
    ) -> RuntimeResult<ResponseCollection>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self
            .dispatcher
            .trigger_many(event_names, target, arguments)?)
    }
}

/// Builder for [`ReactonRuntime`].
#[derive(Debug)]
pub struct RuntimeBuilder {
    config: Option<ReactonConfig>,
    config_file: Option<PathBuf>,
    profile: Option<String>,
    catalog: HandlerCatalog,
    init_logging: bool,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            config_file: None,
            profile: None,
            catalog: HandlerCatalog::new(),
            init_logging: true,
        }
    }

    /// Uses a preloaded configuration instead of loading one.
    pub fn config(mut self, config: ReactonConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Loads configuration from this file.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Sets the handler catalog.
    pub fn catalog(mut self, catalog: HandlerCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Adds one handler to the catalog.
    pub fn handler<H: reacton_core::Handler>(mut self, name: impl Into<String>, handler: H) -> Self {
        self.catalog.insert(name, handler);
        self
    }

    /// Whether to install the global log subscriber (default: true).
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    /// Loads configuration if needed and wires the bindings.
    ///
    /// # Errors
    ///
    /// Fails if configuration cannot be loaded or, in strict mode, if a
    /// binding cannot be wired.
    pub fn build(self) -> RuntimeResult<ReactonRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => {
                let mut loader = ConfigLoader::new();
                if let Some(profile) = &self.profile {
                    loader = loader.profile(profile);
                }
                if let Some(path) = &self.config_file {
                    loader = loader.file(path);
                }
                loader.load()?
            }
        };

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        ReactonRuntime::assemble(config, &self.catalog)
    }
}
