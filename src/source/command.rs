//! Provider command invocation.
//!
//! Runs `<program> [prefix args] -d -l <limit> -n -t <box>` and parses the
//! JSON array it prints. The child is killed if it outlives the timeout.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use super::record::{parse_records, MessageBox, Record};
use super::{RecordSource, SourceError};

/// Exit statuses a shell uses for "cannot execute" and "command not found".
const SHELL_NOT_EXECUTABLE: i32 = 126;
const SHELL_NOT_FOUND: i32 = 127;

/// Longest stderr excerpt carried in an error.
const STDERR_EXCERPT: usize = 512;

/// Record source backed by the device provider command.
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: PathBuf,
    prefix_args: Vec<OsString>,
    timeout: Duration,
}

impl CommandSource {
    /// Provider command installed by the device API package.
    pub const DEFAULT_PROGRAM: &'static str = "termux-sms-list";
    /// Upper bound on a single retrieval.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Arguments placed before the provider flags, e.g. a wrapper's own options.
    #[must_use]
    pub fn with_prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.prefix_args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full argument list for one invocation.
    pub fn args(&self, limit: u32, mbox: MessageBox) -> Vec<OsString> {
        let mut args = self.prefix_args.clone();
        args.extend(
            [
                "-d".to_string(),
                "-l".to_string(),
                limit.to_string(),
                "-n".to_string(),
                "-t".to_string(),
                mbox.as_str().to_string(),
            ]
            .map(OsString::from),
        );
        args
    }

    fn unavailable(&self, detail: impl Into<String>) -> SourceError {
        SourceError::ProviderUnavailable {
            program: self.program.display().to_string(),
            detail: detail.into(),
        }
    }

    fn spawn_error(&self, e: &io::Error) -> SourceError {
        match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                self.unavailable(e.to_string())
            }
            _ => SourceError::RetrievalFailed(format!(
                "failed to start '{}': {e}",
                self.program.display()
            )),
        }
    }
}

impl Default for CommandSource {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROGRAM)
    }
}

impl RecordSource for CommandSource {
    #[tracing::instrument(skip(self), fields(program = %self.program.display()))]
    async fn fetch(&self, limit: u32, mbox: MessageBox) -> Result<Vec<Record>, SourceError> {
        let child = Command::new(&self.program)
            .args(self.args(limit, mbox))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(&e))?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| {
                SourceError::RetrievalFailed(format!("failed to collect provider output: {e}"))
            })?,
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "Provider command timed out");
                return Err(SourceError::RetrievalTimeout(self.timeout));
            }
        };

        if !output.status.success() {
            let stderr = stderr_excerpt(&output.stderr);
            return Err(match output.status.code() {
                Some(SHELL_NOT_EXECUTABLE | SHELL_NOT_FOUND) => self.unavailable(stderr),
                code => SourceError::RetrievalFailed(format!(
                    "provider exited with status {}: {stderr}",
                    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
                )),
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| {
            SourceError::RetrievalFailed(format!("provider output is not UTF-8: {e}"))
        })?;

        let mut records = parse_records(&stdout).map_err(|e| {
            SourceError::RetrievalFailed(format!("malformed provider output: {e}"))
        })?;

        let wanted = usize::try_from(limit).unwrap_or(usize::MAX);
        if records.len() > wanted {
            tracing::debug!(
                returned = records.len(),
                limit,
                "Provider returned more records than requested, truncating"
            );
            records.truncate(wanted);
        }

        tracing::info!(count = records.len(), "Retrieved text messages");
        Ok(records)
    }
}

fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    match text.char_indices().nth(STDERR_EXCERPT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
