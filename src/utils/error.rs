use crate::utils::error_utils::{GitFailure, GitFailureKind, classify_git_failure};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// IO errors not tied to a particular sync-root operation
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Filesystem errors on the sync root (create, remove, write .gitignore)
    #[error("directory {op} failed for {}: {source}", .path.display())]
    Directory {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Home directory lookup failed; the sync root cannot be derived
    #[error("{0}")]
    HomeDirNotFound(String),

    /// The git executable could not be spawned
    #[error(
        "git executable '{0}' was not found\n  💡 Install git and make sure it is on your PATH (or set CLAUDE_SYNC_GIT)"
    )]
    GitNotInstalled(String),

    /// Raw process failure straight from the runner, before classification
    #[error("`{command}` failed ({})", describe_exit(.exit_code))]
    Command {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    /// Classified git failure with remediation guidance
    #[error("{0}")]
    Git(#[from] GitFailure),

    /// Pull stopped on unmerged paths; the rebase has been aborted
    #[error("merge conflicts detected - sync aborted")]
    Conflict { path: PathBuf },

    /// Remote probe failed during setup
    #[error("remote repository not accessible: {url}")]
    RemoteUnreachable {
        url: String,
        #[source]
        source: Box<SyncError>,
    },

    /// Empty remote URL at the setup prompt
    #[error("setup cancelled")]
    SetupCancelled,

    /// SIGINT arrived while a git process was running
    #[error("Operation interrupted by user")]
    Interrupted,

    #[error("Failed to read input: {0}")]
    Prompt(String),

    /// Configuration errors - includes specific guidance for resolution
    #[error("{0}")]
    Config(String),

    #[error(
        "TOML parsing error in claude-sync config:\n{0}\n💡 Hint: Check TOML syntax - ensure quotes match and keys are valid"
    )]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse settings.json: {0}")]
    Json(#[from] serde_json::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl SyncError {
    /// Wrap a raw command failure as a classified git failure.
    ///
    /// Used for operations that talk to a remote, where git's output is the
    /// only signal for what went wrong. Other errors pass through untouched.
    pub fn classified(self, op: &'static str, target: impl Into<String>) -> Self {
        match self {
            SyncError::Command {
                exit_code, output, ..
            } => SyncError::Git(GitFailure {
                kind: classify_git_failure(op, &output),
                op,
                target: target.into(),
                exit_code,
                output,
            }),
            other => other,
        }
    }

    /// Wrap a raw command failure from a purely local operation.
    pub fn with_operation(self, op: &'static str, path: &Path) -> Self {
        match self {
            SyncError::Command {
                exit_code, output, ..
            } => SyncError::Git(GitFailure {
                kind: GitFailureKind::Generic,
                op,
                target: path.display().to_string(),
                exit_code,
                output,
            }),
            other => other,
        }
    }

    pub fn directory(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        SyncError::Directory {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Remediation text for the failure, if any is known
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            SyncError::Git(failure) => failure.remediation(),
            SyncError::RemoteUnreachable { source, .. } => source.remediation(),
            _ => None,
        }
    }

    /// Captured git output, if the failure came from a git process
    pub fn output(&self) -> Option<&str> {
        match self {
            SyncError::Command { output, .. } => Some(output),
            SyncError::Git(failure) => Some(&failure.output),
            SyncError::RemoteUnreachable { source, .. } => source.output(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(output: &str) -> SyncError {
        SyncError::Command {
            command: "git push".to_string(),
            exit_code: Some(128),
            output: output.to_string(),
        }
    }

    #[test]
    fn test_classified_turns_command_failure_into_git_failure() {
        let err = raw("git@github.com: Permission denied (publickey).").classified("push", "/tmp/r");
        match err {
            SyncError::Git(failure) => {
                assert_eq!(failure.kind, GitFailureKind::SshAuth);
                assert_eq!(failure.op, "push");
                assert_eq!(failure.exit_code, Some(128));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classified_passes_other_errors_through() {
        let err = SyncError::Interrupted.classified("push", "/tmp/r");
        assert!(matches!(err, SyncError::Interrupted));
    }

    #[test]
    fn test_with_operation_is_always_generic() {
        let err = raw("fatal: could not resolve host").with_operation("commit", Path::new("/tmp/r"));
        assert!(err.remediation().is_none());
        assert_eq!(err.output(), Some("fatal: could not resolve host"));
    }

    #[test]
    fn test_command_display_mentions_signal() {
        let err = SyncError::Command {
            command: "git pull --rebase".to_string(),
            exit_code: None,
            output: String::new(),
        };
        assert!(err.to_string().contains("terminated by signal"));
    }
}
