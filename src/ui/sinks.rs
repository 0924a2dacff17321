//! ui::sinks
//!
//! Where a finished [`Report`] goes.
//!
//! - the step summary file receives the markdown (always)
//! - the output file receives the JSON envelope under the key `comment`
//! - the pull request receives a comment, when the policy says so
//!
//! Failures here are logged and returned, never turned into a failed run.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::report::Report;
use crate::core::config::CommentPolicy;
use crate::forge::Forge;

/// Output key carrying the envelope.
pub const OUTPUT_KEY: &str = "comment";

/// Errors writing a sink file.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What happened to the remote comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentStatus {
    /// Posted; the comment's URL
    Posted(String),
    /// The policy (or a missing pull request) said not to post
    Skipped,
    /// Posting was attempted and failed
    Failed(String),
}

/// The file sinks provided by the runner environment.
#[derive(Debug, Clone, Default)]
pub struct Sinks {
    /// Append-only step summary (`GITHUB_STEP_SUMMARY`)
    pub step_summary: Option<PathBuf>,
    /// Key-value output file (`GITHUB_OUTPUT`)
    pub output: Option<PathBuf>,
}

/// Result of [`publish`], one entry per channel.
#[derive(Debug)]
pub struct Publication {
    pub step_summary: Result<(), SinkError>,
    pub output: Result<(), SinkError>,
    pub comment: CommentStatus,
}

impl Sinks {
    /// Append the markdown to the step summary, if one is configured.
    pub fn write_step_summary(&self, report: &Report) -> Result<(), SinkError> {
        let Some(path) = &self.step_summary else {
            debug!("no step summary configured");
            return Ok(());
        };
        append(path, &format!("{}\n", report.to_markdown()))
    }

    /// Append the envelope under [`OUTPUT_KEY`], if an output file is configured.
    pub fn write_output(&self, report: &Report) -> Result<(), SinkError> {
        let Some(path) = &self.output else {
            debug!("no output file configured");
            return Ok(());
        };
        let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
        append(path, &output_entry(OUTPUT_KEY, &report.envelope_json(), &delimiter))
    }
}

/// A multi-line `key<<delimiter` entry as the runner's output file expects.
pub fn output_entry(key: &str, value: &str, delimiter: &str) -> String {
    format!("{}<<{}\n{}\n{}\n", key, delimiter, value, delimiter)
}

fn append(path: &Path, text: &str) -> Result<(), SinkError> {
    let wrap = |source| SinkError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(wrap)?;
    file.write_all(text.as_bytes()).map_err(wrap)
}

/// Post `report` on the pull request in `target` when `policy` allows it.
pub async fn post_comment(
    target: Option<(&dyn Forge, u64)>,
    policy: CommentPolicy,
    report: &Report,
) -> CommentStatus {
    if !policy.should_post(report.success) {
        debug!(policy = %policy, success = report.success, "not commenting");
        return CommentStatus::Skipped;
    }
    let Some((forge, number)) = target else {
        warn!("no pull request to comment on");
        return CommentStatus::Skipped;
    };

    match forge.post_comment(number, &report.to_markdown()).await {
        Ok(url) => {
            info!(%url, "posted comment");
            CommentStatus::Posted(url)
        }
        Err(e) => {
            warn!(error = %e, number, "failed to post comment");
            CommentStatus::Failed(e.to_string())
        }
    }
}

/// Write `report` to every channel.
pub async fn publish(
    report: &Report,
    sinks: &Sinks,
    target: Option<(&dyn Forge, u64)>,
    policy: CommentPolicy,
) -> Publication {
    let step_summary = sinks.write_step_summary(report);
    if let Err(e) = &step_summary {
        warn!(error = %e, "step summary not written");
    }
    let output = sinks.write_output(report);
    if let Err(e) = &output {
        warn!(error = %e, "output not written");
    }
    let comment = post_comment(target, policy, report).await;

    Publication {
        step_summary,
        output,
        comment,
    }
}
