use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{
    error::ConfigError,
    matcher::{FileMatcher, DEFAULT_PATTERN},
    models::DetailLevel,
    prompt::{default_categories, DEFAULT_PROMPT},
    providers::Provider,
};

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// On-disk configuration. Every field is optional; command-line flags are
/// layered on top with [`Config::overlay`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<DetailLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retroactive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
}

impl Config {
    fn get_config_path() -> Result<PathBuf, ConfigError> {
        let home_dir = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home_dir.join(".screenshot-organiser").join("config.json"))
    }

    pub fn get_config_file_path() -> Result<PathBuf, ConfigError> {
        Self::get_config_path()
    }

    /// Loads the default config file, if there is one.
    pub fn load() -> Result<Option<Config>, ConfigError> {
        let config_path = Self::get_config_path()?;
        if !config_path.exists() {
            return Ok(None);
        }
        Self::load_from(&config_path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// A config with the defaults spelled out, for `config init`. Model and
    /// base URL stay unset so they follow whichever provider is chosen.
    pub fn with_defaults() -> Self {
        Self {
            provider: Some(Provider::default()),
            detail: Some(DetailLevel::default()),
            prompt: Some(DEFAULT_PROMPT.to_string()),
            categories: Some(default_categories()),
            file_pattern: Some(DEFAULT_PATTERN.to_string()),
            case_sensitive: Some(false),
            watch: Some(false),
            retroactive: Some(true),
            request_timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            debounce_ms: Some(DEFAULT_DEBOUNCE_MS),
            ..Self::default()
        }
    }

    /// Fields set in `overrides` win.
    pub fn overlay(self, overrides: Config) -> Config {
        Config {
            provider: overrides.provider.or(self.provider),
            model_name: overrides.model_name.or(self.model_name),
            base_url: overrides.base_url.or(self.base_url),
            watch_dir: overrides.watch_dir.or(self.watch_dir),
            output_dir: overrides.output_dir.or(self.output_dir),
            backup_dir: overrides.backup_dir.or(self.backup_dir),
            detail: overrides.detail.or(self.detail),
            prompt: overrides.prompt.or(self.prompt),
            categories: overrides.categories.or(self.categories),
            file_pattern: overrides.file_pattern.or(self.file_pattern),
            case_sensitive: overrides.case_sensitive.or(self.case_sensitive),
            watch: overrides.watch.or(self.watch),
            retroactive: overrides.retroactive.or(self.retroactive),
            request_timeout_secs: overrides.request_timeout_secs.or(self.request_timeout_secs),
            debounce_ms: overrides.debounce_ms.or(self.debounce_ms),
        }
    }
}

/// Fully resolved, validated settings the pipeline runs with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: Provider,
    pub model_name: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub watch_dir: PathBuf,
    pub output_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub detail: DetailLevel,
    pub prompt: String,
    pub categories: BTreeMap<String, String>,
    pub matcher: FileMatcher,
    pub watch: bool,
    pub retroactive: bool,
    pub request_timeout: Duration,
    pub debounce: Duration,
}

impl Settings {
    /// Applies defaults and validates. `api_key` is only required for OpenAI.
    pub fn resolve(config: Config, api_key: Option<String>) -> Result<Settings, ConfigError> {
        let watch_dir = config.watch_dir.ok_or(ConfigError::MissingWatchDir)?;
        if !watch_dir.exists() {
            return Err(ConfigError::WatchDirNotFound(watch_dir));
        }
        if !watch_dir.is_dir() {
            return Err(ConfigError::WatchDirNotADirectory(watch_dir));
        }

        let provider = config.provider.unwrap_or_default();
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        if provider == Provider::OpenAI && api_key.is_none() {
            return Err(ConfigError::MissingApiKey);
        }

        let categories = config.categories.unwrap_or_else(default_categories);
        if categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }

        let timeout_secs = config.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let matcher = FileMatcher::new(
            config.file_pattern.as_deref().unwrap_or(DEFAULT_PATTERN),
            config.case_sensitive.unwrap_or(false),
        )?;

        let output_dir = resolve_dir(&watch_dir, config.output_dir, "sorted");
        let backup_dir = resolve_dir(&watch_dir, config.backup_dir, "backup");

        Ok(Settings {
            model_name: config
                .model_name
                .unwrap_or_else(|| provider.default_model().to_string()),
            base_url: config
                .base_url
                .unwrap_or_else(|| provider.default_base_url().to_string()),
            provider,
            api_key,
            watch_dir,
            output_dir,
            backup_dir,
            detail: config.detail.unwrap_or_default(),
            prompt: config.prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            categories,
            matcher,
            watch: config.watch.unwrap_or(false),
            retroactive: config.retroactive.unwrap_or(true),
            request_timeout: Duration::from_secs(timeout_secs),
            debounce: Duration::from_millis(config.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)),
        })
    }

    /// Creates the output, category and backup directories.
    pub fn prepare_directories(&self) -> Result<(), ConfigError> {
        let category_dirs = self.categories.keys().map(|name| self.output_dir.join(name));
        for dir in [self.output_dir.clone(), self.backup_dir.clone()]
            .into_iter()
            .chain(category_dirs)
        {
            fs::create_dir_all(&dir).map_err(|source| ConfigError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Relative paths hang off the watch directory.
fn resolve_dir(watch_dir: &Path, configured: Option<PathBuf>, default_name: &str) -> PathBuf {
    match configured {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => watch_dir.join(dir),
        None => watch_dir.join(default_name),
    }
}
