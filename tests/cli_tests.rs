//! Integration tests for the claude-sync binary
//!
//! Every run points CLAUDE_SYNC_DIR and CLAUDE_SYNC_CONFIG into a temporary
//! directory, so the real ~/.claude and user config are never read.

#[cfg(test)]
mod cli_integration_tests {
    use std::fs;
    use std::path::Path;
    use std::process::{Command, Output};
    use tempfile::TempDir;

    fn claude_sync(temp: &Path, root: &Path, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_claude-sync"))
            .args(args)
            .env("CLAUDE_SYNC_DIR", root)
            .env("CLAUDE_SYNC_CONFIG", temp.join("config.toml"))
            .env("NO_COLOR", "1")
            .env_remove("CI")
            .output()
            .expect("failed to run claude-sync")
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .env("GIT_AUTHOR_NAME", "Sync Tester")
            .env("GIT_AUTHOR_EMAIL", "tester@example.com")
            .env("GIT_COMMITTER_NAME", "Sync Tester")
            .env("GIT_COMMITTER_EMAIL", "tester@example.com")
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_CONFIG_GLOBAL", "/dev/null")
            .status()
            .expect("failed to run git");
        assert!(status.success(), "git {:?} failed", args);
    }

    fn stdout(output: &Output) -> String {
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    #[test]
    fn test_version_subcommand() {
        let temp = TempDir::new().unwrap();
        let output = claude_sync(temp.path(), temp.path(), &["version"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains(&format!("claude-sync {}", env!("CARGO_PKG_VERSION"))));
    }

    #[test]
    fn test_completions_subcommand() {
        let temp = TempDir::new().unwrap();
        let output = claude_sync(temp.path(), temp.path(), &["completions", "bash"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("claude-sync"));
    }

    #[test]
    fn test_status_outside_repository_fails() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join(".claude");
        fs::create_dir_all(&root).unwrap();

        let output = claude_sync(temp.path(), &root, &["status"]);
        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("is not a git repository"));
    }

    #[test]
    fn test_status_lists_plugins_hooks_and_skills() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join(".claude");
        fs::create_dir_all(root.join("hooks")).unwrap();
        fs::create_dir_all(root.join("skills/debugging")).unwrap();
        fs::write(root.join("hooks/notify.sh"), "#!/bin/sh\n").unwrap();
        fs::write(
            root.join("settings.json"),
            r#"{"enabledPlugins": {"review@market": true, "off@market": false}}"#,
        )
        .unwrap();

        git(&root, &["init", "-q", "--initial-branch=main"]);
        git(&root, &["add", "."]);
        git(&root, &["commit", "-q", "-m", "Initial config"]);
        git(&root, &["remote", "add", "origin", "git@example.com:me/claude.git"]);

        let output = claude_sync(temp.path(), &root, &["status"]);
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

        let out = stdout(&output);
        assert!(out.contains("git@example.com:me/claude.git"));
        assert!(out.contains("main"));
        assert!(out.contains("review@market"));
        assert!(!out.contains("off@market"));
        assert!(out.contains("notify.sh"));
        assert!(out.contains("debugging"));
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("config.toml"), "[general]\nrecent_commits = 0\n").unwrap();

        let output = claude_sync(temp.path(), temp.path(), &["status"]);
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("recent_commits"));
    }
}
