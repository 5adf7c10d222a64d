//! Configuration validation utilities.

use reacton_core::{ReactonError, Selector};

use super::error::{ConfigError, ConfigResult};
use super::schema::{BindingConfig, LogOutput, LoggingConfig, ReactonConfig};

/// Validates the entire configuration.
///
/// Bindings are only checked when `dispatch.strict` is set; otherwise a bad
/// binding is reported and skipped while wiring.
pub fn validate_config(config: &ReactonConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    if config.dispatch.strict {
        validate_bindings(&config.bindings)?;
    }
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Logging filter module name cannot be blank: '{module}'"
        )));
    }

    Ok(())
}

/// Validates every binding entry.
pub fn validate_bindings(bindings: &[BindingConfig]) -> ConfigResult<()> {
    for (index, binding) in bindings.iter().enumerate() {
        validate_binding(binding).map_err(|source| ConfigError::binding(index, source))?;
    }
    Ok(())
}

/// Validates one binding entry, returning the parsed selector.
pub fn validate_binding(binding: &BindingConfig) -> Result<Selector, ReactonError> {
    if binding.selector.is_empty() {
        return Err(ReactonError::UndefinedSelector);
    }

    let selector = Selector::parse(&binding.selector)?;

    if binding.handler.trim().is_empty() {
        return Err(ReactonError::invalid_callback(format!(
            "no handler named for selector '{selector}'"
        )));
    }

    Ok(selector)
}
