//! Layered configuration loading on top of figment.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. [`SakuraConfig::default`]
//! 2. values passed to [`ConfigLoader::merge`]
//! 3. the config file: the one given to [`ConfigLoader::file`], or the first
//!    of `sakura.toml`, `config.toml`, `sakura.yaml`, `sakura.yml`,
//!    `config.yaml`, `config.yml` found in the search directories
//! 4. the profile overlay next to it, e.g. `sakura.production.toml`
//! 5. `SAKURA_*` environment variables, `__` separating sections
//!
//! TOML files need the `toml-config` feature and YAML files `yaml-config`.
//!
//! ```text
//! SAKURA_BOT__TOKEN=123:abc         -> bot.token = "123:abc"
//! SAKURA_POLLING__TIMEOUT_SECS=30   -> polling.timeout_secs = 30
//! SAKURA_PROFILE=production         -> reads sakura.production.toml
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::SakuraConfig;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SAKURA_";

/// Selects the profile overlay when none is set on the loader.
pub const PROFILE_ENV: &str = "SAKURA_PROFILE";

/// Profile used when neither the loader nor the environment names one.
pub const DEFAULT_PROFILE: &str = "development";

/// File names tried in each search directory, in order.
fn candidate_names() -> Vec<&'static str> {
    #[allow(unused_mut)]
    let mut names = Vec::new();
    #[cfg(feature = "toml-config")]
    names.extend(["sakura.toml", "config.toml"]);
    #[cfg(feature = "yaml-config")]
    names.extend(["sakura.yaml", "sakura.yml", "config.yaml", "config.yml"]);
    names
}

/// `dir/sakura.toml` becomes `dir/sakura.<profile>.toml`.
fn profile_overlay(path: &Path, profile: &str) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    Some(path.with_file_name(format!("{stem}.{profile}.{ext}")))
}

/// Merges one file, picking the provider from its extension.
fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match ext {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: ext.to_string(),
        }),
    }
}

/// Builder over the configuration sources.
#[derive(Default)]
pub struct ConfigLoader {
    overrides: Figment,
    profile: Option<String>,
    search_dirs: Vec<PathBuf>,
    skip_env: bool,
    file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Creates a loader that reads the environment and searches the current
    /// directory and the user config directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the profile, overriding `SAKURA_PROFILE`.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into().to_lowercase());
        self
    }

    /// Adds a directory to search; once any is added the defaults are skipped.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_dirs.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds the current directory to the search.
    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Loads this file instead of searching. It must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Reads `SAKURA_*` variables (the default).
    pub fn with_env(mut self) -> Self {
        self.skip_env = false;
        self
    }

    /// Ignores the environment, `SAKURA_PROFILE` included.
    pub fn without_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Layers `config` over the defaults, below any file.
    pub fn merge(mut self, config: SakuraConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Merges every source and extracts the configuration.
    ///
    /// The result is not validated; see
    /// [`validate_config`](super::validate_config).
    pub fn load(self) -> ConfigResult<SakuraConfig> {
        let profile = self.resolve_profile();
        let file = self.locate()?;

        let mut figment =
            Figment::from(Serialized::defaults(SakuraConfig::default())).merge(self.overrides);

        match &file {
            Some(path) => {
                info!(path = %path.display(), "Loading configuration file");
                figment = merge_file(figment, path)?;
                if let Some(overlay) = profile_overlay(path, &profile).filter(|p| p.is_file()) {
                    debug!(path = %overlay.display(), %profile, "Applying profile overlay");
                    figment = merge_file(figment, &overlay)?;
                }
            }
            None => warn!("No configuration file found, using defaults"),
        }

        if !self.skip_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let config: SakuraConfig = figment.extract()?;
        debug!(
            %profile,
            logging_level = %config.logging.level,
            max_concurrency = config.polling.max_concurrency,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn resolve_profile(&self) -> String {
        self.profile
            .clone()
            .or_else(|| {
                if self.skip_env {
                    return None;
                }
                std::env::var(PROFILE_ENV).ok().map(|p| p.to_lowercase())
            })
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    /// The explicit file, or the first candidate found while searching.
    fn locate(&self) -> ConfigResult<Option<PathBuf>> {
        if let Some(path) = &self.file {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            return Ok(Some(path.clone()));
        }

        let search: Vec<PathBuf> = if self.search_dirs.is_empty() {
            std::env::current_dir()
                .ok()
                .into_iter()
                .chain(dirs::config_dir().map(|d| d.join("sakura")))
                .collect()
        } else {
            self.search_dirs.clone()
        };

        let names = candidate_names();
        let found = search
            .iter()
            .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
            .find(|path| path.is_file());
        if found.is_none() {
            debug!(dirs = ?search, "No candidate configuration file in search directories");
        }
        Ok(found)
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<SakuraConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from a specific file, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<SakuraConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;
    use figment::Jail;

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|jail| {
            jail.set_env("SAKURA_BOT__TOKEN", "1:from-env");
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.logging.level, LogLevel::Info);
            assert_eq!(config.polling.max_concurrency, 10);
            assert!(config.bot.token.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_merge_overrides_defaults() {
        Jail::expect_with(|jail| {
            let mut overrides = SakuraConfig::default();
            overrides.polling.max_concurrency = 4;
            overrides.logging.level = LogLevel::Warn;

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .merge(overrides)
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.polling.max_concurrency, 4);
            assert_eq!(config.logging.level, LogLevel::Warn);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides() {
        Jail::expect_with(|jail| {
            jail.set_env("SAKURA_POLLING__INITIAL_OFFSET", 77);
            jail.set_env("SAKURA_BOT__TOKEN", "1:from-env");
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.polling.initial_offset, 77);
            assert_eq!(config.bot.token, "1:from-env");
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new()
            .file("/definitely/not/here/sakura.toml")
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        Jail::expect_with(|jail| {
            jail.create_file("sakura.ini", "token=1")?;
            let result = ConfigLoader::new().file("sakura.ini").without_env().load();
            assert!(matches!(
                result,
                Err(ConfigError::UnsupportedFormat { extension, .. }) if extension == "ini"
            ));
            Ok(())
        });
    }

    #[test]
    fn test_profile_overlay_name() {
        assert_eq!(
            profile_overlay(Path::new("conf/sakura.toml"), "staging"),
            Some(PathBuf::from("conf/sakura.staging.toml"))
        );
        assert_eq!(profile_overlay(Path::new("sakura"), "staging"), None);
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_toml_file_and_profile_from_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "sakura.toml",
                "[bot]\ntoken = \"1:base\"\n\n[polling]\ntimeout_secs = 30\nmax_concurrency = 8\n",
            )?;
            jail.create_file("sakura.staging.toml", "[polling]\nmax_concurrency = 2\n")?;
            jail.set_env("SAKURA_PROFILE", "Staging");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.bot.token, "1:base");
            assert_eq!(config.polling.timeout_secs, Some(30));
            // The overlay wins over the base file
            assert_eq!(config.polling.max_concurrency, 2);

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .profile("production")
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.polling.max_concurrency, 8);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_malformed_file_is_reported() {
        Jail::expect_with(|jail| {
            jail.create_file("sakura.toml", "[polling]\nmax_concurrency = \"many\"\n")?;
            let result = ConfigLoader::new().file("sakura.toml").without_env().load();
            assert!(matches!(result, Err(ConfigError::Load(_))));
            Ok(())
        });
    }

    #[cfg(feature = "yaml-config")]
    #[test]
    fn test_explicit_yaml_file() {
        Jail::expect_with(|jail| {
            jail.create_file("bot.yml", "bot:\n  token: \"7:yaml\"\n  admins: [1, 2]\n")?;
            jail.create_file("bot.dev.yml", "polling:\n  limit: 50\n")?;

            let config = ConfigLoader::new()
                .file("bot.yml")
                .profile("dev")
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.bot.token, "7:yaml");
            assert_eq!(config.bot.admins, vec![1, 2]);
            assert_eq!(config.polling.limit, Some(50));
            Ok(())
        });
    }
}
