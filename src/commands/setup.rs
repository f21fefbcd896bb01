//! First-time setup and repository reconciliation
//!
//! Decides between clone, fresh init, replace-with-remote and merge-histories
//! based on what exists locally and whether the remote already has history.
//! Every terminal state leaves the sync root either untouched, fully set up, or
//! initialized with printed steps the user can finish by hand.

use crate::commands::display_path;
use crate::services::git::GitOperator;
use crate::types::{SelectOption, SetupDecision};
use crate::utils::error::{Result, SyncError};
use crate::utils::output::Logger;
use crate::utils::prompt::Prompter;
use log::debug;
use std::path::Path;

const URL_PROMPT: &str = "🔗 Enter your git remote URL:";
const URL_PLACEHOLDER: &str = "git@github.com:username/claude-config.git";
const CANCELLED_HINT: &str = "Setup cancelled - you can run claude-sync again when ready";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupState {
    /// Sync root does not exist: clone or start fresh
    FirstTimeChoice,
    /// Sync root exists but is not a repository
    InitPrompt,
    /// Remote is reachable; find out whether it has history
    RemoteStateCheck { url: String },
    FreshInit { url: String },
    /// Clone into the sync root, asking for the URL when unknown
    CloneFlow { url: Option<String> },
    /// Remote has history and so does the local directory
    ConflictChoice { url: String },
    MergeFlow { url: String },
    Done(SetupOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    Completed,
    Cancelled,
}

pub struct SetupMachine<'a> {
    git: &'a dyn GitOperator,
    prompter: &'a dyn Prompter,
    logger: &'a dyn Logger,
    root: &'a Path,
}

impl<'a> SetupMachine<'a> {
    pub fn new(
        git: &'a dyn GitOperator,
        prompter: &'a dyn Prompter,
        logger: &'a dyn Logger,
        root: &'a Path,
    ) -> Self {
        Self {
            git,
            prompter,
            logger,
            root,
        }
    }

    /// Drive the machine from `state` until it reaches a terminal state.
    pub fn run(&self, mut state: SetupState) -> Result<SetupOutcome> {
        loop {
            debug!("Setup state: {:?}", state);
            state = match state {
                SetupState::Done(outcome) => return Ok(outcome),
                SetupState::FirstTimeChoice => self.first_time_choice()?,
                SetupState::InitPrompt => self.init_prompt()?,
                SetupState::RemoteStateCheck { url } => self.remote_state_check(url),
                SetupState::FreshInit { url } => self.fresh_init(&url)?,
                SetupState::CloneFlow { url } => self.clone_flow(url)?,
                SetupState::ConflictChoice { url } => self.conflict_choice(url)?,
                SetupState::MergeFlow { url } => self.merge_flow(&url)?,
            };
        }
    }

    fn root_name(&self) -> String {
        display_path(self.root)
    }

    fn cancelled(&self, message: &str) -> SetupState {
        self.logger.info("ℹ️", message);
        self.logger.newline();
        SetupState::Done(SetupOutcome::Cancelled)
    }

    fn read_failed(&self, err: SyncError) -> SyncError {
        self.logger.error("✗", "Failed to read input", Some(&err));
        err
    }

    /// Run a step, reporting failure with `failure` and success with `success`.
    fn step(
        &self,
        progress: &str,
        success: &str,
        failure: &str,
        task: impl FnOnce() -> Result<()>,
    ) -> Result<()> {
        self.logger.info("⏳", progress);
        if let Err(e) = task() {
            self.logger.error("✗", failure, Some(&e));
            return Err(e);
        }
        self.logger.success("✓", success);
        self.logger.newline();
        Ok(())
    }

    fn decision(&self, prompt: &str, options: &[SelectOption]) -> Result<SetupDecision> {
        let choice = self
            .prompter
            .select(prompt, options)
            .map_err(|e| self.read_failed(e))?;
        choice.parse::<SetupDecision>().map_err(SyncError::Prompt)
    }

    fn first_time_choice(&self) -> Result<SetupState> {
        self.logger.newline();
        self.logger.title("🎉 First Time Setup");
        self.logger.info(
            "📋",
            &format!("No Claude Code configuration found at {}", self.root_name()),
        );
        self.logger.muted("  Let's set that up!");
        self.logger.newline();

        let decision = self.decision(
            "What would you like to do?",
            &[
                SetupDecision::Clone.option("📥 Clone existing config (I have a repo already)"),
                SetupDecision::Fresh.option("🆕 Start fresh (new configuration)"),
            ],
        )?;
        self.logger.newline();

        match decision {
            SetupDecision::Clone => Ok(SetupState::CloneFlow { url: None }),
            SetupDecision::Fresh => {
                self.step(
                    &format!("Creating {} directory...", self.root_name()),
                    "Directory created",
                    "Failed to create directory",
                    || self.git.create_dir(self.root),
                )?;
                Ok(SetupState::InitPrompt)
            }
            _ => Ok(self.cancelled(CANCELLED_HINT)),
        }
    }

    fn init_prompt(&self) -> Result<SetupState> {
        self.logger.newline();
        self.logger.title("🎉 Git Sync Setup");
        self.logger.info("📋", "Claude Code configuration detected!");
        self.logger.muted(
            "  Let's set up git sync to keep your config synchronized across machines",
        );
        self.logger.newline();

        let confirmed = self
            .prompter
            .confirm("🤔 Would you like to set up git sync now?")
            .map_err(|e| self.read_failed(e))?;
        if !confirmed {
            return Ok(self.cancelled(CANCELLED_HINT));
        }
        self.logger.newline();

        self.logger.info("📦", "Please create a private git repository first");
        self.logger.muted("  Examples:");
        self.logger.muted("    • GitHub: https://github.com/new");
        self.logger.muted("    • GitLab: https://gitlab.com/projects/new");
        self.logger.muted("    • Bitbucket: https://bitbucket.org/repo/create");
        self.logger.newline();

        let url = self
            .prompter
            .input(URL_PROMPT, URL_PLACEHOLDER)
            .map_err(|e| self.read_failed(e))?;
        if url.is_empty() {
            self.logger
                .error("✗", "No remote URL provided - setup cancelled", None);
            self.logger.newline();
            return Err(SyncError::SetupCancelled);
        }
        self.logger.newline();

        let validated = self
            .prompter
            .spin_while("Validating remote repository...", &mut || {
                self.git.validate_remote(&url)
            });
        if let Err(e) = validated {
            self.logger
                .error("✗", "Remote repository not accessible", Some(&e));
            self.logger.newline();
            self.logger.warning("⚠️", "Please make sure:");
            self.logger.muted("  1. The repository exists and you have access");
            self.logger.muted("  2. You have SSH keys set up (for git@ URLs)");
            self.logger.muted("  3. The URL is correct");
            self.logger.newline();
            self.logger
                .info("💡", "After creating the repo, run claude-sync again");
            self.logger.newline();
            return Err(SyncError::RemoteUnreachable {
                url,
                source: Box::new(e),
            });
        }
        self.logger.success("✓", "Remote repository verified!");
        self.logger.newline();

        Ok(SetupState::RemoteStateCheck { url })
    }

    /// A failed probe never blocks setup; the remote is treated as empty.
    fn remote_state_check(&self, url: String) -> SetupState {
        match self.git.remote_has_commits(&url) {
            Ok(true) => SetupState::ConflictChoice { url },
            Ok(false) => SetupState::FreshInit { url },
            Err(e) => {
                log::warn!("Remote history probe failed for {}: {}", url, e);
                self.logger.warning(
                    "⚠️",
                    "Could not check remote history, proceeding with fresh init",
                );
                SetupState::FreshInit { url }
            }
        }
    }

    /// init, .gitignore, commit everything, the remote and its upstream
    fn prepare_local_repository(
        &self,
        url: &str,
        commit_message: &str,
        committed: &str,
    ) -> Result<()> {
        self.step(
            "Initializing git repository...",
            "Git repository initialized",
            "Failed to initialize git repo",
            || self.git.init_repo(self.root),
        )?;

        self.logger.info("⏳", "Creating .gitignore for sensitive files...");
        if let Err(e) = self.git.setup_ignore_file(self.root) {
            self.logger.error("✗", "Failed to create .gitignore", Some(&e));
            return Err(e);
        }
        self.logger.success("✓", ".gitignore created");
        self.logger
            .muted("  Excluded: credentials.json, *.key, aws-*.sh, .env, etc.");
        self.logger.newline();

        self.step(
            "Creating initial commit...",
            committed,
            "Failed to create initial commit",
            || self.git.initial_commit(self.root, commit_message),
        )?;

        self.step(
            "Adding remote repository...",
            "Remote added",
            "Failed to add remote",
            || self.git.add_remote(self.root, "origin", url),
        )
    }

    fn fresh_init(&self, url: &str) -> Result<SetupState> {
        self.prepare_local_repository(
            url,
            "Initial Claude Code configuration",
            "Initial commit created",
        )?;

        let pushed = self
            .prompter
            .spin_while("Pushing to remote...", &mut || {
                self.git.push_with_upstream(self.root)
            });
        if let Err(e) = pushed {
            let branch = self
                .git
                .current_branch(self.root)
                .unwrap_or_else(|_| "main".to_string());
            self.logger.error("✗", "Failed to push", Some(&e));
            self.logger.newline();
            self.logger
                .warning("⚠️", "Git setup complete, but push failed");
            self.logger.muted("  Your config is initialized locally. Try:");
            self.logger.muted(&format!("  1. cd {}", self.root_name()));
            self.logger
                .muted(&format!("  2. git push -u origin {}", branch));
            self.logger.muted("  3. Run claude-sync again");
            self.logger.newline();
            return Err(e);
        }
        self.logger.success("✓", "Pushed to remote");
        self.logger.newline();

        self.logger.success("🎉", "Setup complete!");
        self.logger.info("💡", "Your Claude Code config is now synced!");
        self.logger.muted("  Next steps:");
        self.logger.muted("  • Make changes to your Claude config");
        self.logger.muted("  • Run 'claude-sync' to automatically sync");
        self.logger.muted(&format!(
            "  • On other machines: run claude-sync and choose to clone into {}",
            self.root_name()
        ));
        self.logger.newline();

        Ok(SetupState::Done(SetupOutcome::Completed))
    }

    fn clone_flow(&self, url: Option<String>) -> Result<SetupState> {
        let url = match url {
            Some(url) => url,
            None => {
                self.logger.info(
                    "📦",
                    "Enter the URL of your existing Claude config repository",
                );
                self.logger.muted(&format!("  Example: {}", URL_PLACEHOLDER));
                self.logger.newline();

                let url = self
                    .prompter
                    .input(URL_PROMPT, URL_PLACEHOLDER)
                    .map_err(|e| self.read_failed(e))?;
                if url.is_empty() {
                    return Ok(self.cancelled(CANCELLED_HINT));
                }
                self.logger.newline();
                url
            }
        };

        let cloned = self
            .prompter
            .spin_while("Cloning configuration...", &mut || {
                self.git.clone_repo(&url, self.root)
            });
        if let Err(e) = cloned {
            self.logger.error("✗", "Failed to clone repository", Some(&e));
            self.logger.newline();
            self.logger.warning("⚠️", "Please make sure:");
            self.logger.muted("  1. The repository URL is correct");
            self.logger.muted("  2. The repository exists and has commits");
            self.logger.muted("  3. You have SSH keys set up (for git@ URLs)");
            self.logger.newline();
            return Err(e);
        }
        self.logger.success(
            "✓",
            &format!("Configuration cloned to {}", self.root_name()),
        );
        self.logger.newline();

        self.logger.success("🎉", "Setup complete!");
        self.logger.info("💡", "Your Claude Code config is ready!");
        self.logger.muted("  Next steps:");
        self.logger.muted("  • Run 'claude-sync' anytime to sync changes");
        self.logger
            .muted("  • Your config is now synchronized across machines");
        self.logger.newline();

        Ok(SetupState::Done(SetupOutcome::Completed))
    }

    fn conflict_choice(&self, url: String) -> Result<SetupState> {
        self.logger
            .warning("⚠️", "Remote repository already has commits!");
        self.logger.muted(&format!(
            "  Your local {} has different content than the remote.",
            self.root_name()
        ));
        self.logger.newline();

        let decision = self.decision(
            "How would you like to proceed?",
            &[
                SetupDecision::Replace.option("📥 Use remote config (replace local)"),
                SetupDecision::Merge.option("🔀 Merge histories (keep both)"),
                SetupDecision::Cancel.option("❌ Cancel"),
            ],
        )?;

        match decision {
            SetupDecision::Replace => {
                self.step(
                    "Removing local configuration...",
                    "Local config removed",
                    "Failed to remove local config",
                    || self.git.remove_dir(self.root),
                )?;
                Ok(SetupState::CloneFlow { url: Some(url) })
            }
            SetupDecision::Merge => Ok(SetupState::MergeFlow { url }),
            _ => Ok(self.cancelled("Setup cancelled")),
        }
    }

    fn merge_flow(&self, url: &str) -> Result<SetupState> {
        self.prepare_local_repository(
            url,
            "Local Claude Code configuration",
            "Local files committed",
        )?;

        let fetched = self
            .prompter
            .spin_while("Fetching remote history...", &mut || self.git.fetch(self.root));
        if let Err(e) = fetched {
            self.logger.error("✗", "Failed to fetch remote", Some(&e));
            return Err(e);
        }
        self.logger.success("✓", "Remote history fetched");
        self.logger.newline();

        let merged = self
            .prompter
            .spin_while("Merging histories...", &mut || {
                self.git.pull_allow_unrelated_histories(self.root)
            });
        if let Err(e) = merged {
            self.logger.error("✗", "Failed to merge histories", Some(&e));
            self.logger.newline();
            self.logger
                .warning("⚠️", "This can happen if there are conflicting files.");
            self.logger.muted(&format!(
                "  Resolve conflicts manually in {}, then run claude-sync again.",
                self.root_name()
            ));
            self.logger.newline();
            return Err(e);
        }
        self.logger.success("✓", "Histories merged successfully");
        self.logger.newline();

        let pushed = self
            .prompter
            .spin_while("Pushing merged config...", &mut || {
                self.git.push_with_upstream(self.root)
            });
        if let Err(e) = pushed {
            self.logger.error("✗", "Failed to push", Some(&e));
            return Err(e);
        }
        self.logger.success("✓", "Pushed to remote");
        self.logger.newline();

        self.logger.success("🎉", "Setup complete!");
        self.logger.info("💡", "Histories merged successfully!");
        self.logger
            .muted("  Your local and remote configurations have been combined.");
        self.logger
            .muted("  Run 'claude-sync' anytime to keep them synchronized.");
        self.logger.newline();

        Ok(SetupState::Done(SetupOutcome::Completed))
    }
}
