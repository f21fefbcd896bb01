//! Environment configuration handling
//!
//! All environment-dependent settings are read and validated once at startup,
//! so a typo in a variable surfaces as a clear error before any git command runs.

use crate::utils::error::{Result, SyncError};
use log::{LevelFilter, debug, info, warn};
use std::env;
use std::path::PathBuf;

/// Environment configuration keys
pub mod env_keys {
    pub const CONFIG_FILE: &str = "CLAUDE_SYNC_CONFIG";
    pub const LOG_LEVEL: &str = "CLAUDE_SYNC_LOG";
    pub const SYNC_DIR: &str = "CLAUDE_SYNC_DIR";
    pub const GIT_BINARY: &str = "CLAUDE_SYNC_GIT";
}

#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// Settings file override (CLAUDE_SYNC_CONFIG)
    pub config_file: Option<PathBuf>,

    /// Diagnostic log level (CLAUDE_SYNC_LOG)
    pub log_level: LogLevel,

    /// Sync root override (CLAUDE_SYNC_DIR)
    pub sync_dir: Option<PathBuf>,

    /// git executable (CLAUDE_SYNC_GIT), defaults to `git` on PATH
    pub git_binary: String,

    /// Whether we're in CI/CD environment
    pub is_ci_environment: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn from_env(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(SyncError::Config(format!(
                "Invalid log level '{}'. Supported values: trace, debug, info, warn, error",
                s
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            log_level: LogLevel::Warn,
            sync_dir: None,
            git_binary: "git".to_string(),
            is_ci_environment: false,
        }
    }
}

impl EnvironmentConfig {
    /// Load and validate environment configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is set to an invalid value.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`EnvironmentConfig::load`] with an explicit variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = EnvironmentConfig::default();

        if let Some(path) = lookup(env_keys::CONFIG_FILE) {
            config.config_file = Some(PathBuf::from(shellexpand::tilde(&path).into_owned()));
        }

        if let Some(level) = lookup(env_keys::LOG_LEVEL) {
            config.log_level = LogLevel::from_env(&level)?;
        }

        if let Some(dir) = lookup(env_keys::SYNC_DIR) {
            if dir.trim().is_empty() {
                return Err(SyncError::Config(format!(
                    "{} is set but empty. Unset it or point it at your Claude configuration directory.",
                    env_keys::SYNC_DIR
                )));
            }
            config.sync_dir = Some(PathBuf::from(shellexpand::tilde(&dir).into_owned()));
        }

        if let Some(git) = lookup(env_keys::GIT_BINARY) {
            if git.trim().is_empty() {
                return Err(SyncError::Config(format!(
                    "{} is set but empty. Please provide the path to a git executable.",
                    env_keys::GIT_BINARY
                )));
            }
            config.git_binary = git;
        }

        config.is_ci_environment =
            lookup("CI").is_some() || lookup("CONTINUOUS_INTEGRATION").is_some();

        Ok(config)
    }

    /// Problems worth a warning that do not stop the run
    pub fn notices(&self) -> Vec<String> {
        match &self.config_file {
            Some(path) if !path.exists() => vec![format!(
                "Configuration file specified in {} does not exist: {}",
                env_keys::CONFIG_FILE,
                path.display()
            )],
            _ => Vec::new(),
        }
    }

    /// Log notices and the configuration summary; call after logging is set up
    pub fn display_summary(&self) {
        for notice in self.notices() {
            warn!("{}", notice);
        }
        if self.is_ci_environment {
            info!("Running in CI/CD environment");
        }

        debug!("Environment Configuration Summary:");
        debug!("  Config file: {:?}", self.config_file);
        debug!("  Log level: {}", self.log_level.as_str());
        debug!("  Sync dir override: {:?}", self.sync_dir);
        debug!("  Git binary: {}", self.git_binary);
        debug!("  CI environment: {}", self.is_ci_environment);
    }
}
