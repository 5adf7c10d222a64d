//! Configuration loader using figment.
//!
//! Sources are layered, later ones overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. Programmatic overrides passed to [`ConfigLoader::merge`]
//! 3. Main config file (`reacton.toml` / `reacton.yaml`)
//! 4. Profile overlay next to it (`reacton.{profile}.toml` / `.yaml`)
//! 5. Environment variables (`REACTON_*`)
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: TOML files (`reacton.toml`, `config.toml`)
//! - `yaml-config`: YAML files (`reacton.yaml`, `reacton.yml`, `config.yaml`, `config.yml`)
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `REACTON_` prefix with `__` as separator:
//!
//! - `REACTON_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `REACTON_DISPATCH__STRICT=true` → `dispatch.strict = true`
//!
//! # Example
//!
//! ```rust,ignore
//! use reacton_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/reacton.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::ReactonConfig;
use super::validation::validate_config;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "REACTON_";

/// Environment variable selecting the profile.
pub const PROFILE_ENV: &str = "REACTON_PROFILE";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name, accepting `dev` and `prod` shorthands.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads the profile from `REACTON_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_ENV)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Adds user config directory to search paths.
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(config_dir) => self.search_path(config_dir.join("reacton")),
            None => self,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: ReactonConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and validates the configuration.
    pub fn load(self) -> ConfigResult<ReactonConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: ReactonConfig = figment.extract()?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            bindings = config.bindings.len(),
            strict = config.dispatch.strict,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(ReactonConfig::default()));
        figment = figment.merge(std::mem::take(&mut self.figment));

        figment = match self.config_file.take() {
            Some(path) => self.merge_explicit_file(figment, path)?,
            None => self.merge_found_files(figment),
        };

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["PROFILE"]).split("__"));
        }

        Ok(figment)
    }

    /// Merges an explicitly requested file and its profile overlay.
    fn merge_explicit_file(&self, figment: Figment, path: PathBuf) -> ConfigResult<Figment> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path));
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let format = ConfigFormat::from_extension(ext).ok_or_else(|| {
            ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))
        })?;

        let overlay = profile_overlay(&path, &self.profile);
        Ok(self.merge_with_overlay(figment, format, &path, overlay.as_deref()))
    }

    /// Merges the first file of every enabled format found in the search paths.
    fn merge_found_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        for &format in ConfigFormat::ENABLED {
            if let Some((base, overlay)) = self.locate(&search_paths, format) {
                figment = self.merge_with_overlay(figment, format, &base, overlay.as_deref());
                found = true;
            }
        }

        if !found {
            warn!(paths = ?search_paths, "No configuration file found, using defaults");
        }
        figment
    }

    fn merge_with_overlay(
        &self,
        figment: Figment,
        format: ConfigFormat,
        base: &Path,
        overlay: Option<&Path>,
    ) -> Figment {
        info!(path = %base.display(), "Loading configuration file");
        let figment = format.merge(figment, base);

        match overlay {
            Some(path) => {
                debug!(path = %path.display(), profile = %self.profile, "Loading profile overlay");
                format.merge(figment, path)
            }
            None => figment,
        }
    }

    /// Finds the first directory holding a base file for `format`.
    fn locate(
        &self,
        search_paths: &[PathBuf],
        format: ConfigFormat,
    ) -> Option<(PathBuf, Option<PathBuf>)> {
        search_paths.iter().find_map(|dir| {
            format.base_names().iter().find_map(|name| {
                let base = dir.join(name);
                base.is_file().then(|| {
                    let overlay = profile_overlay(&base, &self.profile);
                    (base, overlay)
                })
            })
        })
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }

        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("reacton")))
            .collect()
    }
}

/// Returns `reacton.{profile}.toml` next to `reacton.toml`, if it exists.
fn profile_overlay(base: &Path, profile: &Profile) -> Option<PathBuf> {
    let stem = base.file_stem()?.to_str()?;
    let ext = base.extension()?.to_str()?;
    let overlay = base.with_file_name(format!("{stem}.{profile}.{ext}"));
    overlay.is_file().then_some(overlay)
}

/// File formats compiled into this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl ConfigFormat {
    const ENABLED: &'static [ConfigFormat] = &[
        #[cfg(feature = "toml-config")]
        ConfigFormat::Toml,
        #[cfg(feature = "yaml-config")]
        ConfigFormat::Yaml,
    ];

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Some(Self::Toml),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    fn base_names(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => &["reacton.toml", "config.toml"],
            #[cfg(feature = "yaml-config")]
            Self::Yaml => &["reacton.yaml", "reacton.yml", "config.yaml", "config.yml"],
        }
    }

    fn merge(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(Yaml::file(path)),
        }
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<ReactonConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from a specific file, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<ReactonConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{BindingConfig, LogLevel};
    use figment::Jail;

    fn jailed<F>(f: F)
    where
        F: FnOnce(&mut Jail) -> figment::error::Result<()>,
    {
        Jail::expect_with(f);
    }

    #[test]
    fn test_default_config() {
        jailed(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.logging.level, LogLevel::Info);
            assert_eq!(config.dispatch.default_priority, 1);
            assert!(!config.dispatch.strict);
            assert!(config.bindings.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("prod"), Profile::Production);
        assert_eq!(Profile::parse("Development"), Profile::Development);
        assert_eq!(Profile::parse("staging"), Profile::Custom("staging".into()));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new()
            .without_env()
            .file("definitely/not/here/reacton.toml")
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_merge_overrides_defaults() {
        jailed(|jail| {
            let mut overrides = ReactonConfig::default();
            overrides.dispatch.default_priority = 7;
            overrides
                .bindings
                .push(BindingConfig::new("offer.accept", "accept"));

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .merge(overrides)
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.dispatch.default_priority, 7);
            assert_eq!(config.bindings.len(), 1);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_toml_file_and_env_override() {
        jailed(|jail| {
            jail.create_file(
                "reacton.toml",
                r#"
                [dispatch]
                default_priority = 3

                [logging]
                level = "debug"

                [[bindings]]
                selector = "^=offer"
                handler = "audit"
                priority = 10

                [[bindings]]
                selector = "offer.accept"
                handler = "accept"
                "#,
            )?;
            jail.set_env("REACTON_LOGGING__LEVEL", "warn");
            jail.set_env("REACTON_DISPATCH__STRICT", "true");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.dispatch.default_priority, 3);
            assert!(config.dispatch.strict);
            assert_eq!(config.logging.level, LogLevel::Warn);
            assert_eq!(config.bindings.len(), 2);
            assert_eq!(config.bindings[0].priority, Some(10));
            assert_eq!(config.bindings[1].priority, None);
            assert!(config.bindings[1].enabled);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_profile_overlay_overrides_base() {
        jailed(|jail| {
            jail.create_file(
                "reacton.production.toml",
                "[dispatch]\ndefault_priority = 9\nstrict = true\n",
            )?;
            jail.create_file("reacton.toml", "[dispatch]\ndefault_priority = 4\n")?;

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .profile("prod")
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.dispatch.default_priority, 9);
            assert!(config.dispatch.strict);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_strict_config_rejects_bad_binding() {
        jailed(|jail| {
            jail.create_file(
                "reacton.toml",
                "[dispatch]\nstrict = true\n\n[[bindings]]\nhandler = \"audit\"\n",
            )?;

            let result = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load();
            assert!(matches!(result, Err(ConfigError::Binding { index: 0, .. })));
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_unknown_log_level_is_parse_error() {
        jailed(|jail| {
            jail.create_file("reacton.toml", "[logging]\nlevel = \"loud\"\n")?;
            let result = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load();
            assert!(matches!(result, Err(ConfigError::ParseError(_))));
            Ok(())
        });
    }
}
