//! Runtime configuration for `ehi`.
//!
//! [`Config`] is the single source of truth for every setting. Values are
//! resolved in order: built-in defaults, then the TOML file named by
//! `--config`/`EHI_CONFIG`, then command-line flags and their environment
//! variables.
//!
//! ```toml
//! mount_prefix = "/ehi"
//! seed = 7
//! latency_ms = 25
//! page_size = 10
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use paging::PAGE_SIZES;
use router::MountConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Cli;
use crate::data::Seed;
use crate::logging::LogFormat;
use crate::pages::PageEnv;
use crate::store::Backend;

/// Errors raised while loading or checking the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Every runtime setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    // ========================================================================
    // Routing
    // ========================================================================
    /// Prefix every route starts with.
    pub mount_prefix: String,

    /// Root of the template tree; `{mount_prefix}/app` when unset.
    pub app_root: Option<String>,

    /// Route for root aliases and failed navigations;
    /// `{mount_prefix}/dashboard` when unset.
    pub default_route: Option<String>,

    // ========================================================================
    // Assets
    // ========================================================================
    /// Directory to read templates and stylesheets from.
    pub assets_dir: Option<PathBuf>,

    /// Web server to fetch templates and stylesheets from.
    pub assets_url: Option<String>,

    // ========================================================================
    // Backend
    // ========================================================================
    /// Seed for the generated records.
    pub seed: u64,

    /// Records in each of the larger stores.
    pub records: usize,

    /// Simulated latency of every store call.
    pub latency_ms: u64,

    // ========================================================================
    // Tables
    // ========================================================================
    /// Initial rows per page.
    pub page_size: usize,

    /// Serial number of the first row of every table.
    pub start_serial: u64,

    /// Seconds between dashboard summary refreshes.
    pub dashboard_refresh_secs: u64,

    // ========================================================================
    // Logging
    // ========================================================================
    pub log_format: LogFormat,

    /// 0=warn, 1=info, 2=debug, 3+=trace.
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        let seed = Seed::default();
        Self {
            mount_prefix: "/ehi".to_string(),
            app_root: None,
            default_route: None,
            assets_dir: None,
            assets_url: None,
            seed: seed.seed,
            records: seed.records,
            latency_ms: 0,
            page_size: paging::DEFAULT_PAGE_SIZE,
            start_serial: paging::DEFAULT_START_SERIAL,
            dashboard_refresh_secs: 30,
            log_format: LogFormat::Text,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    /// Reads the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, then the config file, then flags; validated.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Overrides settings given on the command line.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.assets {
            self.assets_dir = Some(dir.clone());
            self.assets_url = None;
        }
        if let Some(url) = &cli.assets_url {
            self.assets_url = Some(url.clone());
            self.assets_dir = None;
        }
        if let Some(prefix) = &cli.mount {
            self.mount_prefix = prefix.clone();
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if let Some(latency) = cli.latency_ms {
            self.latency_ms = latency;
        }
        if let Some(size) = cli.page_size {
            self.page_size = size;
        }
        if let Some(format) = cli.log_format {
            self.log_format = format;
        }
        if cli.verbose > 0 {
            self.verbosity = cli.verbose;
        }
    }

    /// Checks values the rest of the app relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !PAGE_SIZES.contains(&self.page_size) {
            return Err(ConfigError::Invalid(format!(
                "page_size {} is not one of {PAGE_SIZES:?}",
                self.page_size
            )));
        }
        if !self.mount_prefix.is_empty() && !self.mount_prefix.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "mount_prefix \"{}\" must start with /",
                self.mount_prefix
            )));
        }
        if self.records == 0 {
            return Err(ConfigError::Invalid("records must be at least 1".into()));
        }
        if self.dashboard_refresh_secs == 0 {
            return Err(ConfigError::Invalid(
                "dashboard_refresh_secs must be at least 1".into(),
            ));
        }
        let mount = self.mount();
        if !mount.intercepts(&mount.default_route) {
            return Err(ConfigError::Invalid(format!(
                "default_route \"{}\" is outside {}",
                mount.default_route, mount.mount_prefix
            )));
        }
        Ok(())
    }

    /// Where the dashboard is mounted.
    #[must_use]
    pub fn mount(&self) -> MountConfig {
        let mut mount = MountConfig::new(self.mount_prefix.clone());
        if let Some(root) = &self.app_root {
            mount = mount.app_root(root.clone());
        }
        if let Some(route) = &self.default_route {
            mount = mount.default_route(route.clone());
        }
        mount
    }

    /// How the mock backend is filled.
    #[must_use]
    pub fn seed(&self) -> Seed {
        Seed {
            seed: self.seed,
            records: self.records,
            latency: Duration::from_millis(self.latency_ms),
        }
    }

    /// Settings handed to page initializers.
    #[must_use]
    pub fn page_env(&self, backend: Backend) -> PageEnv {
        PageEnv {
            backend,
            mount: self.mount(),
            page_size: self.page_size,
            start_serial: self.start_serial,
            dashboard_refresh: Duration::from_secs(self.dashboard_refresh_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        let mount = config.mount();
        assert_eq!(mount.default_route, "/ehi/dashboard");
        assert_eq!(mount.app_root, "/ehi/app");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config =
            Config::from_toml_str("seed = 9\npage_size = 10\nlog_format = \"json\"\n").unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.mount_prefix, "/ehi");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = Config::from_toml_str("sead = 9").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_invalid_values() {
        let config = Config {
            page_size: 7,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = Config {
            default_route: Some("/elsewhere/home".into()),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seed = 3\nlatency_ms = 40\nmount_prefix = \"/centre\"").unwrap();
        let cli = Cli::try_parse_from([
            "ehi",
            "--config",
            file.path().to_str().unwrap(),
            "--seed",
            "11",
        ])
        .unwrap();
        let config = Config::resolve(&cli).unwrap();
        assert_eq!(config.seed, 11);
        assert_eq!(config.latency_ms, 40);
        assert_eq!(config.mount().default_route, "/centre/dashboard");
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
