use crate::commands::setup::{SetupMachine, SetupOutcome, SetupState};
use crate::services::git::GitOperator;
use crate::utils::error::{Result, SyncError};
use crate::utils::output::Logger;
use crate::utils::prompt::Prompter;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// What exists at the sync root when a run starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    Missing,
    NotRepository,
    Repository,
}

pub fn discover(git: &dyn GitOperator, root: &Path) -> Discovery {
    if !git.dir_exists(root) {
        Discovery::Missing
    } else if !git.is_repository(root) {
        Discovery::NotRepository
    } else {
        Discovery::Repository
    }
}

/// Result of one `claude-sync` run that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Synced,
    Setup(SetupOutcome),
}

/// Runs setup or the commit → pull → push cycle against the sync root
pub struct SyncService<'a> {
    git: &'a dyn GitOperator,
    prompter: &'a dyn Prompter,
    logger: &'a dyn Logger,
    root: PathBuf,
    recent_commits: usize,
}

impl<'a> SyncService<'a> {
    pub fn new(
        git: &'a dyn GitOperator,
        prompter: &'a dyn Prompter,
        logger: &'a dyn Logger,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            git,
            prompter,
            logger,
            root: root.into(),
            recent_commits: 5,
        }
    }

    pub fn with_recent_commits(mut self, count: usize) -> Self {
        self.recent_commits = count;
        self
    }

    pub fn run(&self) -> Result<RunOutcome> {
        self.logger.title("🎭 Claude Config Sync");

        let discovery = discover(self.git, &self.root);
        debug!("{} -> {:?}", self.root.display(), discovery);

        let start = match discovery {
            Discovery::Repository => {
                self.sync()?;
                return Ok(RunOutcome::Synced);
            }
            Discovery::Missing => SetupState::FirstTimeChoice,
            Discovery::NotRepository => SetupState::InitPrompt,
        };

        let machine = SetupMachine::new(self.git, self.prompter, self.logger, &self.root);
        machine.run(start).map(RunOutcome::Setup)
    }

    fn sync(&self) -> Result<()> {
        self.commit_local_changes()?;
        self.pull_and_handle_conflicts()?;
        self.push_to_remote()?;
        self.show_recent_activity();

        self.logger.success("✨", "Sync complete!");
        self.logger.newline();
        Ok(())
    }

    fn commit_local_changes(&self) -> Result<()> {
        self.logger.info("🔍", "Checking for local changes...");

        let changed = self
            .git
            .has_uncommitted_changes(&self.root)
            .and_then(|dirty| {
                if dirty {
                    self.git.changed_files(&self.root)
                } else {
                    Ok(Vec::new())
                }
            });
        let changed = match changed {
            Ok(files) => files,
            Err(e) => {
                self.logger.error("✗", "Failed to check for changes", Some(&e));
                return Err(e);
            }
        };

        if changed.is_empty() {
            self.logger.success("✓", "No local changes");
            self.logger.newline();
            return Ok(());
        }

        self.logger
            .success("✓", &format!("Found {} changed file(s)", changed.len()));
        for file in &changed {
            self.logger.list_item(&format!("→ {}", file));
        }
        self.logger.newline();

        let message = self.git.auto_commit_message();
        self.logger.info("⏳", "Committing changes...");
        if let Err(e) = self.git.commit_changes(&self.root, &message) {
            self.logger.error("✗", "Failed to commit", Some(&e));
            return Err(e);
        }
        self.logger.success("✓", "Changes committed");
        self.logger.muted(&format!("  {}", message));
        self.logger.newline();
        Ok(())
    }

    fn pull_and_handle_conflicts(&self) -> Result<()> {
        let pulled = self
            .prompter
            .spin_while("Pulling from remote...", &mut || {
                self.git.pull_with_rebase(&self.root)
            });

        let Err(pull_err) = pulled else {
            self.logger.success("✓", "Pulled latest changes");
            self.logger.newline();
            return Ok(());
        };

        match self.git.has_conflicts(&self.root) {
            Ok(true) => Err(self.abort_conflicted_rebase(&pull_err)),
            Ok(false) => {
                self.logger.error("✗", "Failed to pull", Some(&pull_err));
                Err(pull_err)
            }
            Err(e) => {
                debug!("Conflict check failed: {}", e);
                self.logger.error("✗", "Failed to pull", Some(&pull_err));
                Err(pull_err)
            }
        }
    }

    /// Leave the repository as it was before the pull and explain the manual route.
    fn abort_conflicted_rebase(&self, pull_err: &SyncError) -> SyncError {
        let root_name = super::display_path(&self.root);

        self.logger
            .error("✗", "Merge conflicts detected!", Some(pull_err));
        self.logger.warning(
            "⚠️",
            "Conflicts found - aborting sync to keep your config safe",
        );
        self.logger
            .muted("  Please resolve conflicts manually and try again:");
        self.logger.muted(&format!("  1. cd {}", root_name));
        self.logger.muted("  2. git pull --rebase");
        self.logger.muted("  3. Resolve conflicts in affected files");
        self.logger.muted("  4. git add <resolved-files> && git rebase --continue");
        self.logger.muted("  5. Run claude-sync again");
        self.logger.newline();

        match self.git.abort_rebase(&self.root) {
            Ok(()) => self.logger.info(
                "ℹ️",
                "Rebase aborted - repository restored to previous state",
            ),
            Err(e) => {
                warn!("rebase --abort failed: {}", e);
                self.logger.warning(
                    "⚠️",
                    "Failed to abort rebase - manual intervention needed",
                );
            }
        }
        self.logger.newline();

        SyncError::Conflict {
            path: self.root.clone(),
        }
    }

    fn push_to_remote(&self) -> Result<()> {
        let pushed = self
            .prompter
            .spin_while("Pushing to remote...", &mut || self.git.push(&self.root));
        if let Err(e) = pushed {
            self.logger.error("✗", "Failed to push", Some(&e));
            return Err(e);
        }
        self.logger.success("✓", "Pushed to remote");
        self.logger.newline();
        Ok(())
    }

    fn show_recent_activity(&self) {
        let commits = match self.git.recent_commits(&self.root, self.recent_commits) {
            Ok(commits) if !commits.is_empty() => commits,
            Ok(_) => return,
            Err(e) => {
                debug!("Could not read recent commits: {}", e);
                return;
            }
        };

        let content: String = commits.iter().map(|c| format!("  {}\n", c)).collect();
        self.logger.boxed("Recent Activity", &content);
    }
}
