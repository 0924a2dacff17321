//! git::transport
//!
//! Network transport through the `git` CLI.
//!
//! # Design
//!
//! libgit2 can fetch, but lease-protected pushes and the credential helpers
//! runners ship with are only available in the real client, so both network
//! operations shell out to `git`. Each call:
//!
//! - runs against the local git directory (`git --git-dir <dir> ...`)
//! - authenticates HTTPS remotes with an `http.extraheader` passed via `-c`,
//!   never by embedding the token in the URL
//! - disables interactive prompts (`GIT_TERMINAL_PROMPT=0`)
//! - is bounded by `tokio::time::timeout`
//!
//! # Compare-and-swap
//!
//! [`Transport::push_cas`] pushes with `--force-with-lease=<ref>:<expected>`.
//! The remote accepts the update only if the ref still equals `expected`; a
//! concurrent update surfaces as [`TransportError::Rejected`] with git's own
//! reason text. Any other refusal (a hook, a protected branch) is
//! [`TransportError::Refused`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::core::types::{BranchName, Oid, RefName};

/// Errors from network git operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The `git` executable could not be started.
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    /// The operation exceeded the configured network timeout.
    #[error("git {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// git exited unsuccessfully; `stderr` is passed through unchanged.
    #[error("git {operation} failed ({status}): {stderr}")]
    Failed {
        operation: &'static str,
        status: String,
        stderr: String,
    },

    /// The lease did not hold: the remote ref no longer had the expected value.
    #[error("push to {refname} rejected: {reason}")]
    Rejected { refname: String, reason: String },

    /// The remote declined the update for its own reasons.
    #[error("push to {refname} refused by the remote: {reason}")]
    Refused { refname: String, reason: String },
}

/// Result of a successful push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote ref moved
    Updated,
    /// The remote ref already had the pushed value
    UpToDate,
}

/// Remote operations the engine needs.
///
/// Implemented by [`GitCli`]; tests substitute their own to simulate
/// unreachable remotes and races.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `branch` from `url` into the local ref `into`.
    async fn fetch(&self, url: &str, branch: &BranchName, into: &RefName)
        -> Result<(), TransportError>;

    /// Set `refname` on `url` to `new`, only if it currently equals `expected`.
    async fn push_cas(
        &self,
        url: &str,
        refname: &RefName,
        new: &Oid,
        expected: &Oid,
    ) -> Result<PushOutcome, TransportError>;
}

/// [`Transport`] backed by the `git` executable.
pub struct GitCli {
    git_dir: PathBuf,
    token: Option<String>,
    timeout: Duration,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitCli")
            .field("git_dir", &self.git_dir)
            .field("has_token", &self.token.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GitCli {
    /// Create a transport operating on the repository at `git_dir`.
    pub fn new(git_dir: &Path, token: Option<String>, timeout: Duration) -> Self {
        Self {
            git_dir: git_dir.to_path_buf(),
            token: token.filter(|t| !t.is_empty()),
            timeout,
        }
    }

    /// `-c http.extraheader=...` arguments for `url`, if any apply.
    ///
    /// Only HTTPS remotes get the header; local paths and SSH URLs are left
    /// to their own authentication.
    fn auth_args(&self, url: &str) -> Vec<String> {
        match &self.token {
            Some(token) if url.starts_with("https://") => {
                let credential = base64::engine::general_purpose::STANDARD
                    .encode(format!("x-access-token:{}", token));
                vec![
                    "-c".to_string(),
                    format!("http.extraheader=AUTHORIZATION: basic {}", credential),
                ]
            }
            _ => Vec::new(),
        }
    }

    fn command(&self, url: &str) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("--git-dir")
            .arg(&self.git_dir)
            .args(self.auth_args(url))
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(
        &self,
        operation: &'static str,
        mut cmd: Command,
    ) -> Result<std::process::Output, TransportError> {
        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(output) => Ok(output?),
            Err(_) => {
                warn!(operation, timeout_secs = self.timeout.as_secs(), "git timed out");
                Err(TransportError::Timeout {
                    operation,
                    after: self.timeout,
                })
            }
        }
    }
}

#[async_trait]
impl Transport for GitCli {
    #[instrument(skip_all, fields(branch = %branch, into = %into))]
    async fn fetch(
        &self,
        url: &str,
        branch: &BranchName,
        into: &RefName,
    ) -> Result<(), TransportError> {
        let refspec = format!("+{}:{}", RefName::for_branch(branch), into);
        let mut cmd = self.command(url);
        cmd.args(["fetch", "--no-tags", "--quiet", "--"])
            .arg(url)
            .arg(&refspec);

        let output = self.run("fetch", cmd).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(%stderr, "git fetch failed");
            return Err(TransportError::Failed {
                operation: "fetch",
                status: output.status.to_string(),
                stderr,
            });
        }
        debug!("fetched");
        Ok(())
    }

    #[instrument(skip_all, fields(refname = %refname, new = %new, expected = %expected))]
    async fn push_cas(
        &self,
        url: &str,
        refname: &RefName,
        new: &Oid,
        expected: &Oid,
    ) -> Result<PushOutcome, TransportError> {
        let mut cmd = self.command(url);
        cmd.args(["push", "--porcelain"])
            .arg(force_with_lease_arg(refname, expected))
            .arg("--")
            .arg(url)
            .arg(format!("{}:{}", new, refname));

        let output = self.run("push", cmd).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        match parse_porcelain(&stdout, refname) {
            Some(line) if line.flag == '!' => {
                let refname = refname.to_string();
                let reason = rejection_reason(&line.summary, &stderr);
                if is_stale_lease(&line.summary) {
                    warn!(summary = %line.summary, "push rejected: lease lost");
                    Err(TransportError::Rejected { refname, reason })
                } else {
                    warn!(summary = %line.summary, "push refused by remote");
                    Err(TransportError::Refused { refname, reason })
                }
            }
            Some(line) if output.status.success() => {
                let outcome = if line.flag == '=' {
                    PushOutcome::UpToDate
                } else {
                    PushOutcome::Updated
                };
                info!(?outcome, "pushed");
                Ok(outcome)
            }
            _ => Err(TransportError::Failed {
                operation: "push",
                status: output.status.to_string(),
                stderr,
            }),
        }
    }
}

/// `--force-with-lease=<ref>:<expected>`: the remote's CAS precondition.
pub fn force_with_lease_arg(refname: &RefName, expected: &Oid) -> String {
    format!("--force-with-lease={}:{}", refname, expected)
}

/// One ref line of `git push --porcelain` output.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PorcelainLine {
    flag: char,
    summary: String,
}

/// Find the status line for `refname`.
///
/// Lines look like `<flag>\t<from>:<to>\t<summary>`.
fn parse_porcelain(stdout: &str, refname: &RefName) -> Option<PorcelainLine> {
    stdout.lines().find_map(|line| {
        let mut fields = line.splitn(3, '\t');
        let flag = fields.next()?.chars().next()?;
        let spec = fields.next()?;
        let summary = fields.next().unwrap_or("").trim().to_string();
        let (_, to) = spec.split_once(':')?;
        (to == refname.as_str()).then_some(PorcelainLine { flag, summary })
    })
}

/// `[rejected] (stale info)` is how git reports a failed `--force-with-lease`.
fn is_stale_lease(summary: &str) -> bool {
    summary.starts_with("[rejected]") && summary.contains("stale info")
}

/// The porcelain summary, plus any `remote:` or `error:` lines git printed.
fn rejection_reason(summary: &str, stderr: &str) -> String {
    let detail: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("remote:") || l.starts_with("error:"))
        .collect();
    if detail.is_empty() {
        summary.to_string()
    } else {
        format!("{}\n{}", summary, detail.join("\n"))
    }
}
