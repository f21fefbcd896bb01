//! Git process execution
//!
//! Every effect this tool has on a repository goes through [`GitRunner::run`]:
//! one blocking `git` invocation with stdin closed, stdout/stderr captured and
//! the process-wide interrupt flag polled so a Ctrl-C never leaves an orphaned
//! git process behind.

use crate::utils::error::{Result, SyncError};
use log::{debug, warn};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use signal_hook::consts::SIGINT;
use std::ffi::OsString;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Shared cancellation flag checked while a git process runs
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

static INTERRUPT: OnceLock<CancelToken> = OnceLock::new();

/// Route SIGINT into a cancellation token instead of killing the process.
///
/// Only the first call registers the handler; later calls return a token bound
/// to the same flag.
pub fn install_interrupt_handler() -> Result<CancelToken> {
    if let Some(token) = INTERRUPT.get() {
        return Ok(token.clone());
    }

    let token = CancelToken::new();
    signal_hook::flag::register(SIGINT, Arc::clone(&token.flag))?;
    debug!("SIGINT handler installed");
    Ok(INTERRUPT.get_or_init(|| token).clone())
}

/// Captured output of a successful git invocation
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout with surrounding whitespace removed
    pub fn text(&self) -> &str {
        self.stdout.trim()
    }
}

/// Runs the git executable as a subprocess
#[derive(Debug, Clone)]
pub struct GitRunner {
    executable: OsString,
    envs: Vec<(OsString, OsString)>,
    cancel: CancelToken,
}

impl GitRunner {
    /// Prompts are disabled and messages forced to English so failures can
    /// be classified from git's output.
    pub fn new(executable: impl Into<OsString>, cancel: CancelToken) -> Self {
        Self {
            executable: executable.into(),
            envs: Vec::new(),
            cancel,
        }
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("LC_ALL", "C")
    }

    /// Add an environment variable to every invocation
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    fn display_command(&self, args: &[&str]) -> String {
        let mut parts = vec![self.executable.to_string_lossy().into_owned()];
        parts.extend(args.iter().map(|a| a.to_string()));
        parts.join(" ")
    }

    /// Run git with `args`, in `dir` when given (`git -C <dir>`).
    ///
    /// Non-zero exit becomes [`SyncError::Command`] carrying the exit code and
    /// the combined output; callers decide whether that is an error, a
    /// meaningful answer (e.g. `diff-index --quiet`) or something to classify.
    pub fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<CommandOutput> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Interrupted);
        }

        let mut cmd = Command::new(&self.executable);
        if let Some(dir) = dir {
            cmd.arg("-C").arg(dir);
        }
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }

        debug!(
            "Running: {} (in {})",
            self.display_command(args),
            dir.map(|d| d.display().to_string())
                .unwrap_or_else(|| ".".to_string())
        );

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SyncError::GitNotInstalled(self.executable.to_string_lossy().into_owned())
            } else {
                SyncError::Io(e)
            }
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait(&mut child)?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();
        self.finish(args, status, stdout, stderr)
    }

    /// Turn a finished (or stopped) process into the command result.
    ///
    /// Ctrl-C also reaches git itself, which often exits before the poll sees
    /// the flag; once cancellation is requested every outcome is `Interrupted`.
    fn finish(
        &self,
        args: &[&str],
        status: Option<ExitStatus>,
        stdout: String,
        stderr: String,
    ) -> Result<CommandOutput> {
        let status = match status {
            Some(status) if !self.cancel.is_cancelled() => status,
            _ => return Err(SyncError::Interrupted),
        };

        debug!("Exit status: {}", status);
        if status.success() {
            return Ok(CommandOutput { stdout, stderr });
        }

        let mut output = stdout;
        if !output.is_empty() && !output.ends_with('\n') && !stderr.is_empty() {
            output.push('\n');
        }
        output.push_str(&stderr);

        Err(SyncError::Command {
            command: self.display_command(args),
            exit_code: status.code(),
            output,
        })
    }

    /// Wait for the child, or terminate it once cancellation is requested.
    /// Returns `None` when the child was stopped because of cancellation.
    fn wait(&self, child: &mut Child) -> Result<Option<ExitStatus>> {
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if self.cancel.is_cancelled() {
                terminate(child)?;
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// SIGTERM first so git can clean up its lock files, SIGKILL after the grace period.
fn terminate(child: &mut Child) -> Result<()> {
    let pid = Pid::from_raw(child.id() as i32);
    warn!("Interrupted - stopping git (pid {})", pid);
    if signal::kill(pid, Signal::SIGTERM).is_ok() {
        let deadline = Instant::now() + TERMINATE_GRACE;
        while Instant::now() < deadline {
            if child.try_wait()?.is_some() {
                return Ok(());
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
    // kill() errors if the child already exited; wait() reaps it either way
    let _ = child.kill();
    child.wait()?;
    Ok(())
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}
