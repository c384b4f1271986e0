/*!
 * Configuration types for skiff
 *
 * Credentials and endpoint come from `~/.skiff/config.toml` (or an explicit
 * `--config` path), with environment variables taking precedence so CI and
 * scripts never need a dotfile. Engine tuning lives in the same file under
 * `[engine]` and can be overridden per invocation from the CLI.
 */

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::{Result, SkiffError};
use crate::part::{DEFAULT_PART_SIZE, DEFAULT_WORKERS, MAX_WORKERS, MIN_PART_SIZE};

/// Log verbosity for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Engine tuning: part geometry and worker pool size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Size of every part but the last, in bytes
    #[serde(default = "default_part_size")]
    pub part_size: u64,

    /// Files at or above this size go multipart; defaults to `part_size`
    #[serde(default)]
    pub multipart_threshold: Option<u64>,

    /// Concurrent part/file workers
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_part_size() -> u64 {
    DEFAULT_PART_SIZE
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            multipart_threshold: None,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl EngineConfig {
    /// Effective multipart threshold: explicit value or the part size.
    pub fn threshold(&self) -> u64 {
        self.multipart_threshold.unwrap_or(self.part_size)
    }

    pub fn validate(&self) -> Result<()> {
        if self.part_size < MIN_PART_SIZE {
            return Err(SkiffError::Config(format!(
                "part_size {} is below the store minimum of {} bytes",
                self.part_size, MIN_PART_SIZE
            )));
        }
        if self.threshold() < self.part_size {
            return Err(SkiffError::Config(
                "multipart_threshold must be at least part_size".to_string(),
            ));
        }
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(SkiffError::Config(format!(
                "workers must be between 1 and {}",
                MAX_WORKERS
            )));
        }
        Ok(())
    }
}

/// Credentials and endpoint for the remote store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Base URL of the store, e.g. `https://store.example.com`
    pub endpoint: String,

    #[serde(default)]
    pub engine: EngineConfig,
}

impl Settings {
    /// Load settings: explicit path if given, otherwise environment
    /// variables, otherwise the default dotfile.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        if let Some(settings) = Self::from_env() {
            return Ok(settings);
        }
        let default = Self::default_path().ok_or_else(|| {
            SkiffError::Config("Cannot determine home directory for config file".to_string())
        })?;
        if !default.exists() {
            return Err(SkiffError::Config(format!(
                "No configuration found: create {} or set SKIFF_ACCESS_KEY_ID, \
                 SKIFF_SECRET_ACCESS_KEY and SKIFF_ENDPOINT",
                default.display()
            )));
        }
        Self::from_file(&default)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".skiff").join("config.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            SkiffError::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        let settings: Settings = toml::from_str(&raw).map_err(|e| {
            SkiffError::Config(format!("Invalid config file {}: {}", path.display(), e))
        })?;
        settings.engine.validate()?;
        Ok(settings)
    }

    fn from_env() -> Option<Self> {
        Some(Self {
            access_key_id: env::var("SKIFF_ACCESS_KEY_ID").ok()?,
            secret_access_key: env::var("SKIFF_SECRET_ACCESS_KEY").ok()?,
            endpoint: env::var("SKIFF_ENDPOINT").ok()?,
            engine: EngineConfig::default(),
        })
    }
}

/// Options carried by every orchestrator operation: the include/exclude
/// filter pair and the overwrite flag. Absent patterns mean "no filtering".
#[derive(Debug, Clone, Default)]
pub struct TransferOptions {
    pub include: Option<String>,
    pub exclude: Option<String>,
    pub force: bool,
}

impl TransferOptions {
    /// Apply the filter pair to an entry name (local relative path in unix
    /// form, or remote key relative to the listing prefix).
    pub fn qualifies(&self, name: &str) -> bool {
        crate::pattern::is_pattern_match(name, self.exclude.as_deref(), self.include.as_deref())
    }
}
