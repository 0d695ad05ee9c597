//! Layered daemon configuration.

use std::path::{Path, PathBuf};

use aegis_license::LicenseConfig;
use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

/// Environment variable prefix, nested keys split on `__`
/// (`AEGIS__LICENSE__TOKEN_PATH`).
pub const ENV_PREFIX: &str = "AEGIS__";

pub const DEFAULT_ATTRIBUTES_DIR: &str = "/run/aegis";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub license: LicenseConfig,
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

/// Attribute file publication and periodic revalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    pub enabled: bool,
    /// Directory holding one read-only file per attribute.
    pub attributes_dir: PathBuf,
    /// Re-validate the token every N seconds. Disabled when unset.
    pub reload_interval_secs: Option<u64>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            attributes_dir: PathBuf::from(DEFAULT_ATTRIBUTES_DIR),
            reload_interval_secs: None,
        }
    }
}

/// Command-line values that take precedence over every other layer.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub token_path: Option<PathBuf>,
    pub attributes_dir: Option<PathBuf>,
    pub verbose: u8,
}

impl AppConfig {
    /// Layered load: defaults, then the YAML file (if given), then `AEGIS__*`
    /// environment variables.
    ///
    /// # Errors
    /// Returns an error if the file is missing or any layer fails to parse.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if let Some(path) = config_path {
            if !path.is_file() {
                anyhow::bail!("config file does not exist: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("invalid configuration")
    }

    pub fn apply_cli_overrides(&mut self, cli: &CliOverrides) {
        if let Some(path) = &cli.token_path {
            self.license.token_path.clone_from(path);
        }
        if let Some(dir) = &cli.attributes_dir {
            self.publish.attributes_dir.clone_from(dir);
        }
        if let Some(level) = verbosity_level(cli.verbose) {
            self.logging.level = level.to_owned();
        }
    }

    /// Effective configuration as YAML.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self).context("failed to serialize configuration")
    }
}

fn verbosity_level(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}
