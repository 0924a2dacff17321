//! core::config::schema
//!
//! Configuration schema types.
//!
//! # File Format
//!
//! ```toml
//! merge = true
//! comment = "on-error"
//! merge_strategy = "fast-forward"
//! merge_commit_message_style = "pr-title"
//! debug = false
//! network_timeout_secs = 60
//! max_listed_commits = 20
//! noreply_domain = "users.noreply.github.com"
//! ```
//!
//! Every key is optional; unknown keys are rejected so typos surface
//! instead of silently falling back to defaults.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// When the rendered report is posted back as a pull request comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommentPolicy {
    /// Post after every run
    Always,
    /// Post only when the run failed
    #[default]
    OnError,
    /// Never post
    Never,
}

impl CommentPolicy {
    /// Decide whether to post given the run's final success flag.
    ///
    /// # Example
    ///
    /// ```
    /// use fast_forward::core::config::CommentPolicy;
    ///
    /// assert!(CommentPolicy::OnError.should_post(false));
    /// assert!(!CommentPolicy::OnError.should_post(true));
    /// assert!(CommentPolicy::Always.should_post(true));
    /// assert!(!CommentPolicy::Never.should_post(false));
    /// ```
    pub fn should_post(self, success: bool) -> bool {
        match self {
            CommentPolicy::Always => true,
            CommentPolicy::OnError => !success,
            CommentPolicy::Never => false,
        }
    }
}

/// How a granted merge moves the base branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Move the base ref to the head commit
    #[default]
    FastForward,
    /// Create a merge commit with parents `[base, head]` and head's tree
    MergeCommit,
}

/// Message template for synthesized merge commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageStyle {
    /// `Merge pull request #N from owner:branch`
    #[default]
    Default,
    /// PR title followed by the reference line
    PrTitle,
    /// PR title, the reference line, then the PR body
    PrTitleAndBody,
}

macro_rules! kebab_enum {
    ($ty:ty, $what:literal, { $($text:literal => $variant:path),+ $(,)? }) => {
        impl $ty {
            /// Accepted spellings, in declaration order.
            pub const VALUES: &'static [&'static str] = &[$($text),+];

            /// The canonical kebab-case spelling.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($variant => $text,)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok($variant),)+
                    other => Err(ConfigError::InvalidValue(format!(
                        "invalid {} '{}', must be one of: {}",
                        $what,
                        other,
                        Self::VALUES.join(", ")
                    ))),
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

kebab_enum!(CommentPolicy, "comment policy", {
    "always" => CommentPolicy::Always,
    "on-error" => CommentPolicy::OnError,
    "never" => CommentPolicy::Never,
});

kebab_enum!(MergeStrategy, "merge strategy", {
    "fast-forward" => MergeStrategy::FastForward,
    "merge-commit" => MergeStrategy::MergeCommit,
});

kebab_enum!(MessageStyle, "merge commit message style", {
    "default" => MessageStyle::Default,
    "pr-title" => MessageStyle::PrTitle,
    "pr-title-and-body" => MessageStyle::PrTitleAndBody,
});

/// Configuration as read from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Perform the merge (false: only check)
    pub merge: Option<bool>,

    /// When to post the report as a comment
    pub comment: Option<CommentPolicy>,

    /// Fast-forward or merge commit
    pub merge_strategy: Option<MergeStrategy>,

    /// Template for merge commit messages
    pub merge_commit_message_style: Option<MessageStyle>,

    /// Verbose logging
    pub debug: Option<bool>,

    /// Upper bound for every network call, in seconds
    pub network_timeout_secs: Option<u64>,

    /// Commits listed per side when histories diverged
    pub max_listed_commits: Option<usize>,

    /// Domain for synthesized merge commit author addresses
    pub noreply_domain: Option<String>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "network_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.max_listed_commits == Some(0) {
            return Err(ConfigError::InvalidValue(
                "max_listed_commits must be greater than zero".into(),
            ));
        }
        if let Some(domain) = &self.noreply_domain {
            if domain.trim().is_empty() || domain.contains('@') {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid noreply_domain '{}'",
                    domain
                )));
            }
        }
        Ok(())
    }
}
