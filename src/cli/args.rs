//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! Every collaborator the workflow runner passes through the environment
//! (`GITHUB_*`) has a matching flag, so the binary can be run by hand
//! against a saved event payload.

use clap::Parser;
use std::path::PathBuf;

use crate::core::config::{CommentPolicy, MergeStrategy, MessageStyle, Overrides};
use crate::forge::github::DEFAULT_API_BASE;

/// Directory name of the scratch object store.
pub const SCRATCH_DIR: &str = "fast-forward.git";

/// Fast-forward a pull request's base branch to its head, or explain why not
#[derive(Parser, Debug)]
#[command(name = "fast-forward")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
EXAMPLES:
    # Inside a workflow: everything comes from the environment
    fast-forward

    # Check a saved event by hand
    fast-forward --event-name issue_comment --event-path event.json \\
        --repository octocat/hello --no-merge")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Local repository used as object store (created bare if missing).
    /// Defaults to the enclosing checkout, else `$RUNNER_TEMP/fast-forward.git`
    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// JSON payload of the triggering event
    #[arg(long, env = "GITHUB_EVENT_PATH", value_name = "PATH")]
    pub event_path: PathBuf,

    /// Name of the triggering event
    #[arg(long, env = "GITHUB_EVENT_NAME", value_name = "NAME")]
    pub event_name: String,

    /// API token for the forge and for git over HTTPS
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Base URL of the REST API
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_BASE, value_name = "URL")]
    pub api_url: String,

    /// `owner/name` of the repository, when the payload lacks it
    #[arg(long, env = "GITHUB_REPOSITORY", value_name = "OWNER/NAME")]
    pub repository: Option<String>,

    /// File the Markdown report is appended to
    #[arg(long, env = "GITHUB_STEP_SUMMARY", value_name = "PATH")]
    pub step_summary: Option<PathBuf>,

    /// File the `comment` output value is appended to
    #[arg(long, env = "GITHUB_OUTPUT", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Update the base branch when a fast-forward is possible
    #[arg(long, overrides_with = "no_merge")]
    pub merge: bool,

    /// Only report whether a fast-forward is possible
    #[arg(long, overrides_with = "merge")]
    pub no_merge: bool,

    /// When to post the report on the pull request
    #[arg(long, value_name = "POLICY", value_parser = clap::builder::PossibleValuesParser::new(CommentPolicy::VALUES))]
    pub comment: Option<String>,

    /// How to update the base branch
    #[arg(long, value_name = "STRATEGY", value_parser = clap::builder::PossibleValuesParser::new(MergeStrategy::VALUES))]
    pub merge_strategy: Option<String>,

    /// Message template for merge commits
    #[arg(long, value_name = "STYLE", value_parser = clap::builder::PossibleValuesParser::new(MessageStyle::VALUES))]
    pub merge_commit_message_style: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Where to create the object store when there is neither `--repo` nor
    /// an enclosing checkout. Never the working directory itself.
    pub fn scratch_path(runner_temp: Option<PathBuf>) -> PathBuf {
        runner_temp
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(std::env::temp_dir)
            .join(SCRATCH_DIR)
    }

    /// The highest-precedence configuration layer.
    pub fn overrides(&self) -> Result<Overrides, crate::core::config::ConfigError> {
        let merge = if self.merge {
            Some(true)
        } else if self.no_merge {
            Some(false)
        } else {
            None
        };

        Ok(Overrides {
            merge,
            comment: self.comment.as_deref().map(str::parse).transpose()?,
            merge_strategy: self.merge_strategy.as_deref().map(str::parse).transpose()?,
            merge_commit_message_style: self
                .merge_commit_message_style
                .as_deref()
                .map(str::parse)
                .transpose()?,
            debug: self.debug.then_some(true),
        })
    }
}
