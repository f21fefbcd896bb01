/// Error message utilities - classification of git failures plus helpers for
/// consistent "What / Why / Solution" messages
use crate::utils::error::SyncError;
use std::fmt;

/// Format error messages consistently
/// Pattern: [What happened] [Why it matters] [Related elements] [What to do]
pub struct ErrorBuilder {
    what: String,
    why: Option<String>,
    solution: Vec<String>,
    context: Vec<(String, String)>,
}

impl ErrorBuilder {
    pub fn new(what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            why: None,
            solution: Vec::new(),
            context: Vec::new(),
        }
    }

    pub fn why(mut self, why: impl Into<String>) -> Self {
        self.why = Some(why.into());
        self
    }

    pub fn solution(mut self, step: impl Into<String>) -> Self {
        self.solution.push(step.into());
        self
    }

    pub fn context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    pub fn build_config_error(self) -> SyncError {
        SyncError::Config(self.format())
    }

    pub fn build_home_error(self) -> SyncError {
        SyncError::HomeDirNotFound(self.format())
    }

    fn format(&self) -> String {
        let mut msg = format!("What: {}", self.what);

        if let Some(ref why) = self.why {
            msg.push_str(&format!("\n  Why: {}", why));
        }

        for (key, value) in &self.context {
            msg.push_str(&format!("\n  {}: {}", key, value));
        }

        match self.solution.as_slice() {
            [] => {}
            [only] => msg.push_str(&format!("\n  Solution: {}", only)),
            steps => {
                msg.push_str("\n  Solution:");
                for step in steps {
                    msg.push_str(&format!("\n    - {}", step));
                }
            }
        }

        msg
    }
}

/// Home directory not found error
pub fn home_dir_not_found() -> SyncError {
    ErrorBuilder::new("Could not determine home directory")
        .why("The $HOME environment variable is not set or home directory lookup failed")
        .solution("Check that $HOME is exported: `echo $HOME`")
        .solution("Or point claude-sync at the directory directly: CLAUDE_SYNC_DIR=/path/to/.claude")
        .build_home_error()
}

/// Category of a failed git invocation, derived from its output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitFailureKind {
    SshAuth,
    HttpsAuth,
    Network,
    RepositoryNotFound,
    EmptyRepository,
    NoUpstream,
    MergeConflict,
    Generic,
}

impl GitFailureKind {
    pub fn code(self) -> &'static str {
        match self {
            GitFailureKind::SshAuth => "ssh_auth_failed",
            GitFailureKind::HttpsAuth => "https_auth_failed",
            GitFailureKind::Network => "network_error",
            GitFailureKind::RepositoryNotFound => "repository_not_found",
            GitFailureKind::EmptyRepository => "empty_repository",
            GitFailureKind::NoUpstream => "no_upstream",
            GitFailureKind::MergeConflict => "merge_conflict",
            GitFailureKind::Generic => "git_failed",
        }
    }

    fn summary(self) -> &'static str {
        match self {
            GitFailureKind::SshAuth => "SSH authentication failed",
            GitFailureKind::HttpsAuth => "authentication failed",
            GitFailureKind::Network => "network error",
            GitFailureKind::RepositoryNotFound => "repository not found",
            GitFailureKind::EmptyRepository => "repository is empty",
            GitFailureKind::NoUpstream => "no upstream branch configured",
            GitFailureKind::MergeConflict => "merge conflict",
            GitFailureKind::Generic => "command failed",
        }
    }

    pub fn remediation(self) -> Option<&'static str> {
        match self {
            GitFailureKind::SshAuth => Some(
                "Common fixes:\n  \
                 1. Add your SSH key: ssh-add ~/.ssh/id_ed25519\n  \
                 2. Generate a key: ssh-keygen -t ed25519 -C \"your@email.com\"\n  \
                 3. Add the key to GitHub: https://github.com/settings/keys\n  \
                 4. Test the connection: ssh -T git@github.com",
            ),
            GitFailureKind::HttpsAuth => Some(
                "Common fixes:\n  \
                 1. Check repository access permissions\n  \
                 2. For HTTPS: update credentials in your keychain or credential manager\n  \
                 3. For SSH: ensure SSH keys are set up correctly\n  \
                 4. Verify the repository URL: git remote -v",
            ),
            GitFailureKind::Network => Some(
                "Common fixes:\n  \
                 1. Check your internet connection\n  \
                 2. Verify the repository URL is correct\n  \
                 3. Try again in a moment\n  \
                 4. Check that the git hosting service is reachable",
            ),
            GitFailureKind::RepositoryNotFound => Some(
                "Common fixes:\n  \
                 1. Verify the repository exists on the remote\n  \
                 2. Check the repository URL: git remote -v\n  \
                 3. Ensure you have access to the repository\n  \
                 4. Create the repository if it doesn't exist",
            ),
            GitFailureKind::EmptyRepository => Some(
                "The repository exists but has no commits.\n  \
                 If this is a new repo, choose 'Start fresh' instead.",
            ),
            GitFailureKind::NoUpstream => Some(
                "This usually happens right after initial setup.\n  \
                 Set the upstream once: git -C ~/.claude push -u origin main",
            ),
            GitFailureKind::MergeConflict => Some(
                "Resolve the conflicting files in ~/.claude, commit the result,\n  \
                 then run claude-sync again.",
            ),
            GitFailureKind::Generic => None,
        }
    }
}

const SSH_AUTH: &[&str] = &[
    "permission denied",
    "publickey",
    "host key verification failed",
];
const HTTPS_AUTH: &[&str] = &[
    "authentication failed",
    "returned error: 403",
    "could not read username",
    "invalid username or password",
];
const NETWORK: &[&str] = &[
    "could not resolve host",
    "connection timed out",
    "connection refused",
    "network",
    "unable to access",
];
const EMPTY_REPOSITORY: &[&str] = &["empty repository"];
const NOT_FOUND: &[&str] = &[
    "repository not found",
    "does not appear to be a git repository",
    "not found",
];
const NO_UPSTREAM: &[&str] = &["no tracking information"];
const MERGE_CONFLICT: &[&str] = &[
    "conflict (",
    "merge conflict",
    "could not apply",
    "unmerged",
];

/// Map git output onto a failure category.
///
/// Case-insensitive substring matching, first match wins. The "no tracking
/// information" hint only means something for pulls and is checked first there.
/// Conflict markers come before the remote rows since conflict output quotes
/// file names and commit subjects that may contain any other phrase.
pub fn classify_git_failure(op: &str, output: &str) -> GitFailureKind {
    let lower = output.to_lowercase();
    let matches = |phrases: &[&str]| phrases.iter().any(|p| lower.contains(p));

    if op.starts_with("pull") && matches(NO_UPSTREAM) {
        return GitFailureKind::NoUpstream;
    }

    let table: [(&[&str], GitFailureKind); 6] = [
        (MERGE_CONFLICT, GitFailureKind::MergeConflict),
        (SSH_AUTH, GitFailureKind::SshAuth),
        (HTTPS_AUTH, GitFailureKind::HttpsAuth),
        (NETWORK, GitFailureKind::Network),
        (EMPTY_REPOSITORY, GitFailureKind::EmptyRepository),
        (NOT_FOUND, GitFailureKind::RepositoryNotFound),
    ];

    table
        .iter()
        .find(|&&(phrases, _)| matches(phrases))
        .map(|&(_, kind)| kind)
        .unwrap_or(GitFailureKind::Generic)
}

/// A git failure that has been through classification
#[derive(Debug, Clone)]
pub struct GitFailure {
    pub kind: GitFailureKind,
    pub op: &'static str,
    /// Repository path or remote URL the operation ran against
    pub target: String,
    pub exit_code: Option<i32>,
    pub output: String,
}

impl GitFailure {
    pub fn remediation(&self) -> Option<&'static str> {
        self.kind.remediation()
    }
}

impl fmt::Display for GitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "git {} failed for {}: {}", self.op, self.target, self.kind.summary())?;
        if let Some(line) = first_meaningful_line(&self.output) {
            write!(f, " ({})", line)?;
        }
        Ok(())
    }
}

impl std::error::Error for GitFailure {}

/// Prefer the `fatal:`/`error:` line git prints, else the last non-empty one.
fn first_meaningful_line(output: &str) -> Option<&str> {
    let lines = output.lines().map(str::trim).filter(|l| !l.is_empty());
    lines
        .clone()
        .find(|l| l.starts_with("fatal:") || l.starts_with("error:"))
        .or_else(|| lines.last())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_builder_basic() {
        let err = ErrorBuilder::new("Invalid recent_commits value")
            .why("Must be between 1 and 50")
            .solution("Edit the config file")
            .context("Path", "/path/to/config.toml")
            .build_config_error();

        let msg = err.to_string();
        assert!(msg.contains("What: Invalid recent_commits value"));
        assert!(msg.contains("Why: Must be between 1 and 50"));
        assert!(msg.contains("Solution: Edit the config file"));
        assert!(msg.contains("Path: /path/to/config.toml"));
    }

    #[test]
    fn test_home_dir_not_found_message() {
        let msg = home_dir_not_found().to_string();
        assert!(msg.contains("$HOME"));
        assert!(msg.contains("CLAUDE_SYNC_DIR"));
    }

    #[test]
    fn test_ssh_failures_point_at_key_setup() {
        let output = "git@github.com: Permission denied (publickey).\nfatal: Could not read from remote repository.";
        let kind = classify_git_failure("push", output);
        assert_eq!(kind, GitFailureKind::SshAuth);
        assert!(kind.remediation().unwrap().contains("ssh-keygen"));

        assert_eq!(
            classify_git_failure("clone", "PUBLICKEY rejected"),
            GitFailureKind::SshAuth
        );
    }

    #[test]
    fn test_https_auth_failure() {
        let output = "remote: Invalid username or password.\nfatal: Authentication failed for 'https://github.com/u/r.git/'";
        assert_eq!(classify_git_failure("push", output), GitFailureKind::HttpsAuth);
        assert_eq!(
            classify_git_failure(
                "fetch",
                "fatal: unable to access 'https://x/': The requested URL returned error: 403"
            ),
            GitFailureKind::HttpsAuth
        );
    }

    #[test]
    fn test_network_failure() {
        let output = "ssh: Could not resolve hostname github.invalid\nfatal: unable to access";
        assert_eq!(classify_git_failure("pull --rebase", output), GitFailureKind::Network);
        assert_eq!(
            classify_git_failure("fetch", "fatal: unable to access 'https://x/': Could not resolve host: x"),
            GitFailureKind::Network
        );
    }

    #[test]
    fn test_repository_not_found() {
        let output = "fatal: '/tmp/nope' does not appear to be a git repository";
        assert_eq!(
            classify_git_failure("clone", output),
            GitFailureKind::RepositoryNotFound
        );
        assert_eq!(
            classify_git_failure("ls-remote", "ERROR: Repository not found."),
            GitFailureKind::RepositoryNotFound
        );
    }

    #[test]
    fn test_empty_repository() {
        let output = "warning: You appear to have cloned an empty repository.";
        assert_eq!(
            classify_git_failure("clone", output),
            GitFailureKind::EmptyRepository
        );
    }

    #[test]
    fn test_no_upstream_only_on_pull() {
        let output = "There is no tracking information for the current branch.";
        assert_eq!(
            classify_git_failure("pull --rebase", output),
            GitFailureKind::NoUpstream
        );
        assert_eq!(classify_git_failure("push", output), GitFailureKind::Generic);
    }

    #[test]
    fn test_merge_conflict() {
        let output = "CONFLICT (content): Merge conflict in settings.json\nerror: could not apply 1a2b3c4... edit";
        assert_eq!(
            classify_git_failure("pull --rebase", output),
            GitFailureKind::MergeConflict
        );
    }

    #[test]
    fn test_conflict_output_naming_other_phrases_stays_a_conflict() {
        let output = "Auto-merging network.json\nCONFLICT (content): Merge conflict in network.json";
        assert_eq!(
            classify_git_failure("pull", output),
            GitFailureKind::MergeConflict
        );
        assert_eq!(
            classify_git_failure("pull --rebase", "error: could not apply 4031abc... Add not found page"),
            GitFailureKind::MergeConflict
        );
        assert_eq!(
            classify_git_failure("pull", "Merge conflict in network.json"),
            GitFailureKind::MergeConflict
        );
    }

    #[test]
    fn test_bare_403_in_output_is_not_auth() {
        assert_eq!(
            classify_git_failure("push", "fatal: ref 4031abc rejected by hook"),
            GitFailureKind::Generic
        );
    }

    #[test]
    fn test_unrecognized_output_is_generic_without_guidance() {
        let kind = classify_git_failure("push", "fatal: something unexpected happened");
        assert_eq!(kind, GitFailureKind::Generic);
        assert!(kind.remediation().is_none());
        assert_eq!(kind.code(), "git_failed");
    }

    #[test]
    fn test_display_picks_fatal_line() {
        let failure = GitFailure {
            kind: GitFailureKind::RepositoryNotFound,
            op: "clone",
            target: "git@example.com:u/r.git".to_string(),
            exit_code: Some(128),
            output: "Cloning into 'r'...\nfatal: repository not found\n".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "git clone failed for git@example.com:u/r.git: repository not found (fatal: repository not found)"
        );
    }
}
