//! webcase configuration
//!
//! Configuration is layered with figment, lowest priority first:
//! - built-in defaults
//! - `webcase.toml` in the working directory
//! - the file given with `--config`
//! - `WEBCASE_` environment variables (`WEBCASE_BROWSER__HEADED=true`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;
use webcase_core::{ExecutorConfig, SettlePolicy, StabilizeConfig};
use webcase_webdriver::{BrowserKind, SessionOptions};

const DEFAULT_CONFIG_FILE: &str = "webcase.toml";
const ENV_PREFIX: &str = "WEBCASE_";

// ----------------------------------------------------------------------------
// Configuration Sections
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub browser: BrowserConfig,
    /// Page names usable with `navigate`
    pub pages: IndexMap<String, String>,
    pub paths: PathsConfig,
    pub timeouts: TimeoutConfig,
    pub settle: SettleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    /// Every suite runs once per browser
    pub browsers: Vec<String>,
    pub headed: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub slowmo_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Locator catalog YAML
    pub catalog: Option<PathBuf>,
    /// Suite file or directory used when none is given on the command line
    pub suites: PathBuf,
    pub artifacts_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub action_ms: u64,
    pub assertion_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleConfig {
    pub after_input_ms: u64,
    pub after_submit_ms: u64,
    pub network_idle_ms: u64,
    pub stabilize_enabled: bool,
    pub stabilize_timeout_ms: u64,
    pub stabilize_interval_ms: u64,
}

// ----------------------------------------------------------------------------
// Default Implementations
// ----------------------------------------------------------------------------

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            browser: BrowserConfig::default(),
            pages: IndexMap::new(),
            paths: PathsConfig::default(),
            timeouts: TimeoutConfig::default(),
            settle: SettleConfig::default(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            browsers: vec!["chrome".to_string()],
            headed: false,
            window_width: 1920,
            window_height: 1080,
            slowmo_ms: 0,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            suites: PathBuf::from("test_data"),
            artifacts_dir: PathBuf::from("test-results"),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            action_ms: 30_000,
            assertion_ms: 5_000,
        }
    }
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            after_input_ms: 200,
            after_submit_ms: 300,
            network_idle_ms: 30_000,
            stabilize_enabled: true,
            stabilize_timeout_ms: 10_000,
            stabilize_interval_ms: 500,
        }
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load defaults, `webcase.toml`, the explicit file and the environment
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(DEFAULT_CONFIG_FILE));

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::Loading(format!(
                    "configuration file {} does not exist",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load from one TOML file over the defaults, ignoring the environment
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::Loading(format!("Failed to read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Self::extract(
            Figment::new()
                .merge(Serialized::defaults(Self::default()))
                .merge(Toml::string(source)),
        )
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| ConfigError::Loading(format!("Failed to load configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.browser.webdriver_url).map_err(|e| {
            ConfigError::Validation(format!(
                "Invalid webdriver_url '{}': {}",
                self.browser.webdriver_url, e
            ))
        })?;

        if self.browser.browsers.is_empty() {
            return Err(ConfigError::Validation("At least one browser must be configured".to_string()));
        }
        self.browser_kinds()?;

        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            return Err(ConfigError::Validation("Window size must be greater than 0".to_string()));
        }

        if self.timeouts.action_ms == 0 || self.timeouts.assertion_ms == 0 {
            return Err(ConfigError::Validation("Timeouts must be greater than 0".to_string()));
        }

        if self.settle.network_idle_ms == 0 {
            return Err(ConfigError::Validation("Network idle timeout must be greater than 0".to_string()));
        }

        if self.settle.stabilize_interval_ms == 0
            || self.settle.stabilize_interval_ms >= self.settle.stabilize_timeout_ms
        {
            return Err(ConfigError::Validation(format!(
                "Stabilize interval ({}ms) must be non-zero and shorter than the stabilize timeout ({}ms)",
                self.settle.stabilize_interval_ms, self.settle.stabilize_timeout_ms
            )));
        }

        Ok(())
    }

    pub fn browser_kinds(&self) -> Result<Vec<BrowserKind>, ConfigError> {
        self.browser
            .browsers
            .iter()
            .map(|name| name.parse::<BrowserKind>().map_err(ConfigError::Validation))
            .collect()
    }

    pub fn session_options(&self, browser: BrowserKind) -> SessionOptions {
        SessionOptions {
            browser,
            headless: !self.browser.headed,
            window_width: self.browser.window_width,
            window_height: self.browser.window_height,
            slow_mo_ms: self.browser.slowmo_ms,
            ..SessionOptions::default()
        }
    }

    pub fn settle_policy(&self) -> SettlePolicy {
        SettlePolicy {
            after_input: Duration::from_millis(self.settle.after_input_ms),
            after_submit: Duration::from_millis(self.settle.after_submit_ms),
            network_idle_timeout: Duration::from_millis(self.settle.network_idle_ms),
            stabilize: StabilizeConfig {
                enabled: self.settle.stabilize_enabled,
                timeout: Duration::from_millis(self.settle.stabilize_timeout_ms),
                interval: Duration::from_millis(self.settle.stabilize_interval_ms),
            },
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            action_timeout: Duration::from_millis(self.timeouts.action_ms),
            assertion_timeout: Duration::from_millis(self.timeouts.assertion_ms),
            artifacts_dir: self.paths.artifacts_dir.clone(),
            pages: self.pages.clone(),
            settle: self.settle_policy(),
            ..ExecutorConfig::default()
        }
    }
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {0}")]
    Loading(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
