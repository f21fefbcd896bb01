use crate::commands::display_path;
use crate::services::git::GitOperator;
use crate::types::BranchInfo;
use crate::utils::error::Result;
use crate::utils::error_utils::ErrorBuilder;
use crate::utils::output::Logger;
use colored::Colorize;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Snapshot of the sync root for `claude-sync status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub remote_url: Option<String>,
    pub branch: BranchInfo,
    pub modified: Vec<String>,
    /// Problems that did not stop the report
    pub warnings: Vec<String>,
    pub plugins: Vec<String>,
    pub hooks: Vec<String>,
    pub skills: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Settings {
    #[serde(rename = "enabledPlugins", default)]
    enabled_plugins: BTreeMap<String, serde_json::Value>,
}

pub fn check_status(git: &dyn GitOperator, root: &Path) -> Result<StatusReport> {
    if !git.is_repository(root) {
        return Err(ErrorBuilder::new(format!(
            "{} is not a git repository",
            display_path(root)
        ))
        .why("Status needs a synced repository to report on")
        .solution("Run `claude-sync` to set up git sync first")
        .build_config_error());
    }

    let branch = git.branch_info(root)?;
    let mut warnings = Vec::new();
    let modified = match git.has_uncommitted_changes(root) {
        Ok(false) => Vec::new(),
        Ok(true) => git.changed_files(root).unwrap_or_else(|e| {
            warnings.push(format!("Could not get changed files: {}", e));
            Vec::new()
        }),
        Err(e) => {
            warnings.push(format!("Could not check for uncommitted changes: {}", e));
            Vec::new()
        }
    };

    let plugins = enabled_plugins(root).unwrap_or_else(|e| {
        warnings.push(e.to_string());
        Vec::new()
    });

    Ok(StatusReport {
        remote_url: git.remote_url(root),
        branch,
        modified,
        warnings,
        plugins,
        hooks: hooks(root),
        skills: skills(root),
    })
}

/// Plugin names from `settings.json` whose `enabledPlugins` value is `true`.
/// A missing file means no plugins; an unparsable one is an error.
pub fn enabled_plugins(root: &Path) -> Result<Vec<String>> {
    let Ok(content) = fs::read_to_string(root.join("settings.json")) else {
        return Ok(Vec::new());
    };
    let settings: Settings = serde_json::from_str(&content)?;
    Ok(settings
        .enabled_plugins
        .into_iter()
        .filter(|(_, enabled)| enabled.as_bool() == Some(true))
        .map(|(name, _)| name)
        .collect())
}

/// `*.sh` files directly under `hooks/`
pub fn hooks(root: &Path) -> Vec<String> {
    list_entries(&root.join("hooks"), |path| {
        path.is_file() && path.extension().is_some_and(|ext| ext == "sh")
    })
}

/// Directories directly under `skills/`
pub fn skills(root: &Path) -> Vec<String> {
    list_entries(&root.join("skills"), Path::is_dir)
}

fn list_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| keep(&entry.path()))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn format_branch(info: &BranchInfo) -> String {
    let mut line = format!("Branch:     {}", info.branch);
    if !info.is_diverged() {
        return line;
    }

    line.push_str(&format!(" ↑{} ↓{}", info.ahead, info.behind));
    let mut parts = Vec::new();
    if info.ahead > 0 {
        parts.push(format!("{} ahead", info.ahead));
    }
    if info.behind > 0 {
        parts.push(format!("{} behind", info.behind));
    }
    line.push_str(&format!(" ({})", parts.join(", ")).yellow().to_string());
    line
}

fn checked_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("{} {}\n", "✓".green(), item))
        .collect()
}

pub fn display_status(report: &StatusReport, logger: &dyn Logger) {
    logger.title("📊 Configuration Status");

    let repo_info = format!(
        "{}{}\n{}",
        "Repository: ".cyan(),
        report.remote_url.as_deref().unwrap_or("unknown"),
        format_branch(&report.branch).cyan()
    );
    logger.boxed("Repository", &repo_info);

    for warning in &report.warnings {
        logger.warning("⚠️", warning);
    }

    if !report.modified.is_empty() {
        let files: String = report
            .modified
            .iter()
            .map(|file| format!("• {}\n", file))
            .collect();
        logger.boxed(
            &format!("📝 Modified Files ({})", report.modified.len()),
            &files,
        );
    }

    let sections = [
        ("📦 Plugins", &report.plugins),
        ("🪝 Hooks", &report.hooks),
        ("🎯 Skills", &report.skills),
    ];
    for (title, items) in sections {
        if !items.is_empty() {
            logger.boxed(&format!("{} ({})", title, items.len()), &checked_list(items));
        }
    }

    logger.newline();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{commit_file, init_local_repo, system_git};
    use crate::utils::error::SyncError;
    use tempfile::TempDir;

    #[test]
    fn test_enabled_plugins_only_true_values() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("settings.json"),
            r#"{"enabledPlugins": {"zeta@market": true, "alpha@market": true, "off@market": false, "odd": "yes"}}"#,
        )
        .unwrap();
        assert_eq!(
            enabled_plugins(temp.path()).unwrap(),
            vec!["alpha@market", "zeta@market"]
        );
    }

    #[test]
    fn test_missing_settings_or_key_yield_nothing() {
        let temp = TempDir::new().unwrap();
        assert!(enabled_plugins(temp.path()).unwrap().is_empty());

        fs::write(temp.path().join("settings.json"), r#"{"model": "opus"}"#).unwrap();
        assert!(enabled_plugins(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_broken_settings_is_a_json_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("settings.json"), "{not json").unwrap();
        let err = enabled_plugins(temp.path()).unwrap_err();
        assert!(matches!(err, SyncError::Json(_)));
        assert!(err.to_string().starts_with("Failed to parse settings.json"));
    }

    #[test]
    fn test_status_reports_broken_settings_as_warning() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("claude");
        init_local_repo(&repo);
        commit_file(&repo, "settings.json", "{not json", "Broken settings");
        fs::create_dir_all(repo.join("skills/writing")).unwrap();

        let report = check_status(&system_git(), &repo).unwrap();
        assert!(report.plugins.is_empty());
        assert_eq!(report.skills, vec!["writing"]);
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.starts_with("Failed to parse settings.json"))
        );
    }

    #[test]
    fn test_hooks_are_sorted_shell_scripts() {
        let temp = TempDir::new().unwrap();
        let hooks_dir = temp.path().join("hooks");
        fs::create_dir_all(hooks_dir.join("nested.sh")).unwrap();
        fs::write(hooks_dir.join("pre-tool.sh"), "#!/bin/sh").unwrap();
        fs::write(hooks_dir.join("notify.sh"), "#!/bin/sh").unwrap();
        fs::write(hooks_dir.join("README.md"), "docs").unwrap();

        assert_eq!(hooks(temp.path()), vec!["notify.sh", "pre-tool.sh"]);
    }

    #[test]
    fn test_skills_are_directories() {
        let temp = TempDir::new().unwrap();
        let skills_dir = temp.path().join("skills");
        fs::create_dir_all(skills_dir.join("writing")).unwrap();
        fs::create_dir_all(skills_dir.join("debugging")).unwrap();
        fs::write(skills_dir.join("notes.txt"), "x").unwrap();

        assert_eq!(skills(temp.path()), vec!["debugging", "writing"]);
        assert!(skills(&temp.path().join("missing")).is_empty());
    }

    #[test]
    fn test_branch_line_shows_divergence() {
        let even = BranchInfo {
            branch: "main".to_string(),
            ahead: 0,
            behind: 0,
        };
        assert_eq!(format_branch(&even), "Branch:     main");

        let diverged = BranchInfo {
            branch: "main".to_string(),
            ahead: 2,
            behind: 1,
        };
        let line = format_branch(&diverged);
        assert!(line.contains("↑2 ↓1"));
        assert!(line.contains("2 ahead, 1 behind"));
    }
}
