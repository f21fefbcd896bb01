pub mod cli;

pub use cli::EnvironmentConfig;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::error::{Result, SyncError};
use crate::utils::error_utils::{ErrorBuilder, home_dir_not_found};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory kept in sync (default: ~/.claude)
    pub sync_dir: String,
    /// Branch name every new repository is normalized to
    pub default_branch: String,
    /// Number of commits shown after a sync
    pub recent_commits: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            sync_dir: "~/.claude".to_string(),
            default_branch: "main".to_string(),
            recent_commits: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
}

impl Config {
    /// Load settings from the override path or the default location.
    /// A missing file means defaults; nothing is written.
    pub fn load(env: &EnvironmentConfig) -> Result<Self> {
        let path = match &env.config_file {
            Some(path) => path.clone(),
            None => match Self::get_config_path() {
                Some(path) => path,
                None => return Ok(Config::default()),
            },
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)?;

        config.validate(path)?;
        Ok(config)
    }

    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("claude-sync/config.toml"))
    }

    /// Resolve the sync root: CLAUDE_SYNC_DIR, then `sync_dir`, tilde-expanded.
    pub fn sync_root(&self, env: &EnvironmentConfig) -> Result<PathBuf> {
        if let Some(dir) = &env.sync_dir {
            return Ok(dir.clone());
        }

        if self.general.sync_dir.starts_with('~') && dirs::home_dir().is_none() {
            return Err(home_dir_not_found());
        }
        let expanded = shellexpand::tilde(&self.general.sync_dir).into_owned();
        Ok(PathBuf::from(expanded))
    }

    pub fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |what: &str, why: &str| {
            ErrorBuilder::new(what.to_string())
                .why(why.to_string())
                .context("Config file", path.display().to_string())
                .solution(format!("Edit {} and fix the value", path.display()))
                .build_config_error()
        };

        if self.general.sync_dir.trim().is_empty() {
            return Err(invalid(
                "sync_dir cannot be empty",
                "The directory to keep in sync must be set",
            ));
        }

        let branch = &self.general.default_branch;
        if branch.is_empty()
            || branch.starts_with('-')
            || !branch
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '/' | '.'))
        {
            return Err(invalid(
                &format!("Invalid default_branch '{}'", branch),
                "Branch names may only contain letters, digits, '_', '-', '/' and '.'",
            ));
        }

        if !(1..=50).contains(&self.general.recent_commits) {
            return Err(invalid(
                &format!("Invalid recent_commits {}", self.general.recent_commits),
                "recent_commits must be between 1 and 50",
            ));
        }

        Ok(())
    }
}
