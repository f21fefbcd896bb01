use crate::services::runner::{CommandOutput, GitRunner};
use crate::types::BranchInfo;
use crate::utils::error::{Result, SyncError};
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// Written verbatim to `.gitignore` when a repository is set up
pub const DEFAULT_GITIGNORE: &str = "\
# Credentials and secrets
credentials.json
*.key
*.pem
*.p12
*-key.json
service-account*.json

# AWS scripts (may contain credentials)
aws-*.sh

# Environment files
.env
.env.*

# IDE and editor files
.vscode/
.idea/
*.swp
*.swo
*~

# OS files
.DS_Store
Thumbs.db

# Logs
*.log
";

/// Everything the setup and sync flows need from version control.
///
/// Operations are stateless and keyed by path. Implementations are not safe for
/// concurrent use against the same repository; callers serialize access.
pub trait GitOperator {
    /// Never fails; any I/O error reads as "does not exist"
    fn dir_exists(&self, path: &Path) -> bool;
    /// True iff `path/.git` is a directory
    fn is_repository(&self, path: &Path) -> bool;
    fn create_dir(&self, path: &Path) -> Result<()>;
    fn remove_dir(&self, path: &Path) -> Result<()>;

    /// Tracked files only; untracked files never count as changes
    fn has_uncommitted_changes(&self, path: &Path) -> Result<bool>;
    fn changed_files(&self, path: &Path) -> Result<Vec<String>>;
    /// Stages modified/deleted tracked files and commits them
    fn commit_changes(&self, path: &Path, message: &str) -> Result<()>;

    fn pull_with_rebase(&self, path: &Path) -> Result<()>;
    fn push(&self, path: &Path) -> Result<()>;
    fn push_with_upstream(&self, path: &Path) -> Result<()>;

    fn current_branch(&self, path: &Path) -> Result<String>;
    fn branch_info(&self, path: &Path) -> Result<BranchInfo>;
    /// Newest first, at most `count` entries of `<short-hash> <subject>`
    fn recent_commits(&self, path: &Path, count: usize) -> Result<Vec<String>>;
    fn has_conflicts(&self, path: &Path) -> Result<bool>;
    fn abort_rebase(&self, path: &Path) -> Result<()>;

    fn init_repo(&self, path: &Path) -> Result<()>;
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;
    fn add_remote(&self, path: &Path, name: &str, url: &str) -> Result<()>;
    /// Commits everything not ignored, then normalizes the branch name
    fn initial_commit(&self, path: &Path, message: &str) -> Result<()>;
    fn validate_remote(&self, url: &str) -> Result<()>;
    fn remote_has_commits(&self, url: &str) -> Result<bool>;
    fn fetch(&self, path: &Path) -> Result<()>;
    /// Merges the remote's HEAD branch, renaming the local branch to match
    fn pull_allow_unrelated_histories(&self, path: &Path) -> Result<()>;
    fn setup_ignore_file(&self, path: &Path) -> Result<()>;
    fn ensure_default_branch(&self, path: &Path) -> Result<()>;

    /// URL of `origin`, if one is configured
    fn remote_url(&self, path: &Path) -> Option<String>;

    fn auto_commit_message(&self) -> String {
        let host = nix::unistd::gethostname()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "Auto-sync from {} at {}",
            host,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// [`GitOperator`] backed by the installed git binary
pub struct SystemGit {
    runner: GitRunner,
    default_branch: String,
}

impl SystemGit {
    pub fn new(runner: GitRunner, default_branch: impl Into<String>) -> Self {
        Self {
            runner,
            default_branch: default_branch.into(),
        }
    }

    fn git(&self, path: &Path, args: &[&str]) -> Result<CommandOutput> {
        self.runner.run(Some(path), args)
    }

    /// Local operation: failures are reported as generic git failures
    fn local(&self, op: &'static str, path: &Path, args: &[&str]) -> Result<CommandOutput> {
        self.git(path, args).map_err(|e| e.with_operation(op, path))
    }

    /// Remote operation: failures are classified from git's output
    fn remote(&self, op: &'static str, path: &Path, args: &[&str]) -> Result<CommandOutput> {
        self.git(path, args)
            .map_err(|e| e.classified(op, path.display().to_string()))
    }

    /// Branch the remote's HEAD points at, falling back to the configured default
    fn remote_head_branch(&self, path: &Path) -> String {
        let detected = self
            .git(path, &["ls-remote", "--symref", "origin", "HEAD"])
            .ok()
            .and_then(|out| parse_symref_head(out.text()));
        match detected {
            Some(branch) => {
                debug!("Remote HEAD points at {}", branch);
                branch
            }
            None => {
                debug!(
                    "Could not detect remote HEAD, using {}",
                    self.default_branch
                );
                self.default_branch.clone()
            }
        }
    }
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `ref: refs/heads/<branch>\tHEAD` from `git ls-remote --symref`
fn parse_symref_head(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let target = line.strip_prefix("ref:")?.split_whitespace().next()?;
        target.strip_prefix("refs/heads/").map(str::to_string)
    })
}

/// Parse the `<ahead>\t<behind>` pair printed by `rev-list --left-right --count`
fn parse_ahead_behind(output: &str) -> Option<(u32, u32)> {
    let mut parts = output.split_whitespace();
    let ahead = parts.next()?.parse().ok()?;
    let behind = parts.next()?.parse().ok()?;
    Some((ahead, behind))
}

impl GitOperator for SystemGit {
    fn dir_exists(&self, path: &Path) -> bool {
        fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
    }

    fn is_repository(&self, path: &Path) -> bool {
        fs::metadata(path.join(".git"))
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| SyncError::directory("create", path, e))
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).map_err(|e| SyncError::directory("remove", path, e))
    }

    fn has_uncommitted_changes(&self, path: &Path) -> Result<bool> {
        // Refresh stat info so touched-but-identical files are not reported
        if let Err(e) = self.git(path, &["update-index", "-q", "--refresh"]) {
            debug!("update-index refresh failed: {}", e);
        }

        match self.git(path, &["diff-index", "--quiet", "HEAD", "--"]) {
            Ok(_) => Ok(false),
            Err(SyncError::Command {
                exit_code: Some(1), ..
            }) => Ok(true),
            Err(e) => Err(e.with_operation("diff-index", path)),
        }
    }

    fn changed_files(&self, path: &Path) -> Result<Vec<String>> {
        let out = self.local("diff", path, &["diff", "--name-only", "HEAD"])?;
        Ok(non_empty_lines(&out.stdout))
    }

    fn commit_changes(&self, path: &Path, message: &str) -> Result<()> {
        self.local("add", path, &["add", "-u"])?;
        self.local("commit", path, &["commit", "-m", message])?;
        Ok(())
    }

    fn pull_with_rebase(&self, path: &Path) -> Result<()> {
        self.remote("pull", path, &["pull", "--rebase"])?;
        Ok(())
    }

    fn push(&self, path: &Path) -> Result<()> {
        self.remote("push", path, &["push"])?;
        Ok(())
    }

    fn push_with_upstream(&self, path: &Path) -> Result<()> {
        let branch = self.current_branch(path)?;
        self.remote("push", path, &["push", "-u", "origin", &branch])?;
        Ok(())
    }

    fn current_branch(&self, path: &Path) -> Result<String> {
        let out = self.local("branch", path, &["branch", "--show-current"])?;
        let branch = out.text();
        if branch.is_empty() {
            // Detached HEAD
            return Ok("HEAD".to_string());
        }
        Ok(branch.to_string())
    }

    fn branch_info(&self, path: &Path) -> Result<BranchInfo> {
        let branch = self.current_branch(path)?;

        // No upstream configured is not an error, the counts are simply zero
        let (ahead, behind) = self
            .git(
                path,
                &["rev-list", "--left-right", "--count", "HEAD...@{upstream}"],
            )
            .ok()
            .and_then(|out| parse_ahead_behind(out.text()))
            .unwrap_or((0, 0));

        Ok(BranchInfo {
            branch,
            ahead,
            behind,
        })
    }

    fn recent_commits(&self, path: &Path, count: usize) -> Result<Vec<String>> {
        let limit = format!("-{}", count);
        let out = self.local(
            "log",
            path,
            &["log", &limit, "--pretty=format:%h %s"],
        )?;
        Ok(non_empty_lines(&out.stdout))
    }

    fn has_conflicts(&self, path: &Path) -> Result<bool> {
        let out = self.local(
            "diff",
            path,
            &["diff", "--name-only", "--diff-filter=U"],
        )?;
        Ok(!out.text().is_empty())
    }

    fn abort_rebase(&self, path: &Path) -> Result<()> {
        self.local("rebase --abort", path, &["rebase", "--abort"])?;
        Ok(())
    }

    fn init_repo(&self, path: &Path) -> Result<()> {
        self.local("init", path, &["init"])?;
        Ok(())
    }

    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let dest_arg = dest.to_string_lossy();
        let out = self
            .runner
            .run(None, &["clone", url, &dest_arg])
            .map_err(|e| e.classified("clone", url))?;
        debug!("clone: {}", out.stderr.trim());
        Ok(())
    }

    fn add_remote(&self, path: &Path, name: &str, url: &str) -> Result<()> {
        self.local("remote add", path, &["remote", "add", name, url])?;
        Ok(())
    }

    fn initial_commit(&self, path: &Path, message: &str) -> Result<()> {
        self.local("add", path, &["add", "."])?;
        self.local("commit", path, &["commit", "-m", message])?;

        if let Err(e) = self.ensure_default_branch(path) {
            warn!(
                "Could not rename branch to '{}', continuing: {}",
                self.default_branch, e
            );
        }
        Ok(())
    }

    fn validate_remote(&self, url: &str) -> Result<()> {
        self.runner
            .run(None, &["ls-remote", url])
            .map_err(|e| e.classified("ls-remote", url))?;
        Ok(())
    }

    fn remote_has_commits(&self, url: &str) -> Result<bool> {
        let out = self
            .runner
            .run(None, &["ls-remote", "--heads", url])
            .map_err(|e| e.classified("ls-remote", url))?;
        Ok(!out.text().is_empty())
    }

    fn fetch(&self, path: &Path) -> Result<()> {
        self.remote("fetch", path, &["fetch", "origin"])?;
        Ok(())
    }

    fn pull_allow_unrelated_histories(&self, path: &Path) -> Result<()> {
        let branch = self.remote_head_branch(path);
        // Take the remote's branch name so the later push updates that branch
        let current = self.current_branch(path)?;
        if current != branch {
            debug!("Renaming branch {} -> {} to match remote HEAD", current, branch);
            self.local("branch -M", path, &["branch", "-M", &branch])?;
        }
        self.remote(
            "pull",
            path,
            &[
                "pull",
                "--no-rebase",
                "--no-edit",
                "--allow-unrelated-histories",
                "origin",
                &branch,
            ],
        )?;
        Ok(())
    }

    fn setup_ignore_file(&self, path: &Path) -> Result<()> {
        let target = path.join(".gitignore");
        fs::write(&target, DEFAULT_GITIGNORE)
            .map_err(|e| SyncError::directory("write .gitignore", &target, e))
    }

    fn ensure_default_branch(&self, path: &Path) -> Result<()> {
        let current = self.current_branch(path)?;
        if current == self.default_branch {
            return Ok(());
        }
        debug!("Renaming branch {} -> {}", current, self.default_branch);
        self.local("branch -M", path, &["branch", "-M", &self.default_branch])?;
        Ok(())
    }

    fn remote_url(&self, path: &Path) -> Option<String> {
        self.git(path, &["config", "--get", "remote.origin.url"])
            .ok()
            .map(|out| out.text().to_string())
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{commit_file, git, init_local_repo, system_git, test_runner};
    use tempfile::TempDir;

    fn repo_with_commit() -> (TempDir, std::path::PathBuf) {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        init_local_repo(&repo);
        commit_file(&repo, "settings.json", "{}\n", "Initial commit");
        (temp, repo)
    }

    #[test]
    fn test_is_repository_false_without_git_dir() {
        let temp = TempDir::new().unwrap();
        let ops = system_git();
        assert!(!ops.is_repository(temp.path()));
        assert!(!ops.is_repository(&temp.path().join("missing")));
        assert!(!ops.dir_exists(&temp.path().join("missing")));

        // A plain file named .git is not a metadata directory
        fs::write(temp.path().join(".git"), "gitdir: elsewhere").unwrap();
        assert!(!ops.is_repository(temp.path()));
    }

    #[test]
    fn test_is_repository_true_after_init() {
        let temp = TempDir::new().unwrap();
        let ops = system_git();
        ops.init_repo(temp.path()).unwrap();
        assert!(ops.is_repository(temp.path()));
    }

    #[test]
    fn test_untracked_files_are_not_changes() {
        let (_temp, repo) = repo_with_commit();
        let ops = system_git();

        assert!(!ops.has_uncommitted_changes(&repo).unwrap());
        assert!(ops.changed_files(&repo).unwrap().is_empty());

        fs::write(repo.join("scratch.txt"), "untracked").unwrap();
        assert!(!ops.has_uncommitted_changes(&repo).unwrap());
        assert!(ops.changed_files(&repo).unwrap().is_empty());
    }

    #[test]
    fn test_tracked_modification_is_a_change() {
        let (_temp, repo) = repo_with_commit();
        let ops = system_git();

        fs::write(repo.join("settings.json"), "{\"theme\": \"dark\"}\n").unwrap();
        assert!(ops.has_uncommitted_changes(&repo).unwrap());
        assert_eq!(ops.changed_files(&repo).unwrap(), vec!["settings.json"]);
    }

    #[test]
    fn test_commit_changes_clears_tracked_changes_and_skips_untracked() {
        let (_temp, repo) = repo_with_commit();
        let ops = system_git();

        fs::write(repo.join("settings.json"), "{\"a\": 1}\n").unwrap();
        fs::write(repo.join("new-file.md"), "not tracked").unwrap();
        ops.commit_changes(&repo, "Auto-sync from test at now").unwrap();

        assert!(!ops.has_uncommitted_changes(&repo).unwrap());
        let subject = git(&repo, &["log", "-1", "--pretty=format:%s"]);
        assert!(subject.starts_with("Auto-sync from test"));

        let tracked = git(&repo, &["ls-files"]);
        assert!(!tracked.contains("new-file.md"));
    }

    #[test]
    fn test_commit_changes_fails_when_nothing_staged() {
        let (_temp, repo) = repo_with_commit();
        let ops = system_git();
        assert!(ops.commit_changes(&repo, "empty").is_err());
    }

    #[test]
    fn test_branch_info_without_upstream() {
        let (_temp, repo) = repo_with_commit();
        let info = system_git().branch_info(&repo).unwrap();
        assert!(!info.branch.is_empty());
        assert_eq!((info.ahead, info.behind), (0, 0));
        assert!(!info.is_diverged());
    }

    #[test]
    fn test_recent_commits_newest_first_and_bounded() {
        let (_temp, repo) = repo_with_commit();
        commit_file(&repo, "a.md", "a", "Second");
        commit_file(&repo, "b.md", "b", "Third");
        let ops = system_git();

        let commits = ops.recent_commits(&repo, 2).unwrap();
        assert_eq!(commits.len(), 2);
        assert!(commits[0].ends_with(" Third"));
        assert!(commits[1].ends_with(" Second"));

        assert_eq!(ops.recent_commits(&repo, 10).unwrap().len(), 3);
    }

    #[test]
    fn test_initial_commit_normalizes_branch_and_respects_ignore_file() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("claude");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("CLAUDE.md"), "# notes").unwrap();
        fs::write(dir.join("credentials.json"), "secret").unwrap();

        let ops = system_git();
        ops.init_repo(&dir).unwrap();
        git(&dir, &["checkout", "-q", "-b", "trunk"]);
        ops.setup_ignore_file(&dir).unwrap();
        ops.initial_commit(&dir, "Initial Claude Code configuration")
            .unwrap();

        assert_eq!(ops.current_branch(&dir).unwrap(), "main");
        let tracked = git(&dir, &["ls-files"]);
        assert!(tracked.contains("CLAUDE.md"));
        assert!(tracked.contains(".gitignore"));
        assert!(!tracked.contains("credentials.json"));
    }

    #[test]
    fn test_initial_commit_survives_rejected_branch_rename() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("claude");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("CLAUDE.md"), "# notes").unwrap();

        // git refuses ".." in branch names
        let ops = SystemGit::new(test_runner(), "bad..name");
        ops.init_repo(&dir).unwrap();
        git(&dir, &["checkout", "-q", "-b", "trunk"]);

        ops.initial_commit(&dir, "Initial Claude Code configuration")
            .unwrap();
        assert!(ops.ensure_default_branch(&dir).is_err());
        assert_eq!(ops.current_branch(&dir).unwrap(), "trunk");
        let subject = git(&dir, &["log", "-1", "--pretty=format:%s"]);
        assert_eq!(subject, "Initial Claude Code configuration");
    }

    #[test]
    fn test_setup_ignore_file_contents() {
        let temp = TempDir::new().unwrap();
        system_git().setup_ignore_file(temp.path()).unwrap();
        let content = fs::read_to_string(temp.path().join(".gitignore")).unwrap();
        for pattern in ["credentials.json", "*.key", "*.pem", "aws-*.sh", ".env", ".env.*"] {
            assert!(content.lines().any(|l| l == pattern), "missing {pattern}");
        }
    }

    #[test]
    fn test_remote_url_absent_and_present() {
        let (_temp, repo) = repo_with_commit();
        let ops = system_git();
        assert_eq!(ops.remote_url(&repo), None);
        ops.add_remote(&repo, "origin", "git@example.com:u/claude.git")
            .unwrap();
        assert_eq!(
            ops.remote_url(&repo).as_deref(),
            Some("git@example.com:u/claude.git")
        );
    }

    #[test]
    fn test_validate_remote_rejects_missing_repository() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.git");
        let err = system_git()
            .validate_remote(&missing.to_string_lossy())
            .unwrap_err();
        match err {
            SyncError::Git(failure) => {
                assert_eq!(failure.op, "ls-remote");
                assert!(failure.remediation().is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_ahead_behind("3\t1\n"), Some((3, 1)));
        assert_eq!(parse_ahead_behind("garbage"), None);
        assert_eq!(
            parse_symref_head("ref: refs/heads/trunk\tHEAD\nabc123\tHEAD"),
            Some("trunk".to_string())
        );
        assert_eq!(parse_symref_head("abc123\tHEAD"), None);
    }

    #[test]
    fn test_auto_commit_message_format() {
        let message = system_git().auto_commit_message();
        assert!(message.starts_with("Auto-sync from "));
        let (_, timestamp) = message.rsplit_once(" at ").unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S").is_ok());
    }
}
