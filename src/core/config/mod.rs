//! core::config
//!
//! Configuration schema, loading, and precedence.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. TOML file (`--config <path>`, else `$FAST_FORWARD_CONFIG`)
//! 3. Action inputs from the environment (`INPUT_MERGE`, `INPUT_COMMENT`, ...)
//! 4. CLI flags
//!
//! Action inputs arrive as strings and an unset input arrives as an empty
//! string, so empty values are treated as absent.
//!
//! # Example
//!
//! ```no_run
//! use fast_forward::core::config::{Config, Overrides};
//!
//! let loaded = Config::load(None, &|key| std::env::var(key).ok(), Overrides::default())?;
//! for warning in &loaded.warnings {
//!     eprintln!("warning: {}", warning.message);
//! }
//! println!("merge: {}", loaded.config.merge);
//! # Ok::<(), fast_forward::core::config::ConfigError>(())
//! ```

pub mod schema;

pub use schema::{CommentPolicy, FileConfig, MergeStrategy, MessageStyle};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "FAST_FORWARD_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The resolved configuration.
    pub config: Config,
    /// The file that contributed values, if any.
    pub source: Option<PathBuf>,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// One layer of optional settings (environment or command line).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub merge: Option<bool>,
    pub comment: Option<CommentPolicy>,
    pub merge_strategy: Option<MergeStrategy>,
    pub merge_commit_message_style: Option<MessageStyle>,
    pub debug: Option<bool>,
}

impl Overrides {
    /// Read GitHub Action inputs through `lookup`.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`; tests pass a map.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unparseable inputs.
    pub fn from_action_inputs(
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let input = |name: &str| {
            lookup(&format!("INPUT_{}", name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            merge: input("MERGE").map(|v| parse_bool("merge", &v)).transpose()?,
            comment: input("COMMENT").map(|v| v.parse()).transpose()?,
            merge_strategy: input("MERGE_STRATEGY").map(|v| v.parse()).transpose()?,
            merge_commit_message_style: input("MERGE_COMMIT_MESSAGE_STYLE")
                .map(|v| v.parse())
                .transpose()?,
            debug: input("DEBUG").map(|v| parse_bool("debug", &v)).transpose()?,
        })
    }
}

/// Parse an action-style boolean (`true`/`false`, case-insensitive).
fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(ConfigError::InvalidValue(format!(
            "invalid boolean for {}: '{}'",
            key, other
        ))),
    }
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Perform the merge (false: check only)
    pub merge: bool,
    /// When to post the report as a comment
    pub comment: CommentPolicy,
    /// Fast-forward or merge commit
    pub merge_strategy: MergeStrategy,
    /// Template for merge commit messages
    pub merge_commit_message_style: MessageStyle,
    /// Verbose logging; never changes the outcome
    pub debug: bool,
    /// Upper bound for every network call
    pub network_timeout: Duration,
    /// Commits listed per side when histories diverged
    pub max_listed_commits: usize,
    /// Domain for synthesized author addresses
    pub noreply_domain: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            merge: false,
            comment: CommentPolicy::default(),
            merge_strategy: MergeStrategy::default(),
            merge_commit_message_style: MessageStyle::default(),
            debug: false,
            network_timeout: Duration::from_secs(60),
            max_listed_commits: 20,
            noreply_domain: "users.noreply.github.com".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all layers.
    ///
    /// `explicit_path` (the `--config` flag) must exist. A path from
    /// `$FAST_FORWARD_CONFIG` that does not exist only produces a warning.
    pub fn load(
        explicit_path: Option<&Path>,
        lookup: &dyn Fn(&str) -> Option<String>,
        cli: Overrides,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (file, source) = match explicit_path {
            Some(path) => (Some(Self::read_file(path)?), Some(path.to_path_buf())),
            None => match lookup(CONFIG_ENV).filter(|v| !v.is_empty()) {
                Some(path) => {
                    let path = PathBuf::from(path);
                    if path.exists() {
                        (Some(Self::read_file(&path)?), Some(path))
                    } else {
                        warnings.push(ConfigWarning {
                            message: format!(
                                "${} points to a missing file; using defaults",
                                CONFIG_ENV
                            ),
                            path,
                        });
                        (None, None)
                    }
                }
                None => (None, None),
            },
        };

        let env = Overrides::from_action_inputs(lookup)?;
        let config = Self::resolve(file.as_ref(), &env, &cli)?;

        Ok(ConfigLoadResult {
            config,
            source,
            warnings,
        })
    }

    /// Apply the layers over the defaults.
    pub fn resolve(
        file: Option<&FileConfig>,
        env: &Overrides,
        cli: &Overrides,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(file) = file {
            file.validate()?;
            config.apply(&Overrides {
                merge: file.merge,
                comment: file.comment,
                merge_strategy: file.merge_strategy,
                merge_commit_message_style: file.merge_commit_message_style,
                debug: file.debug,
            });
            if let Some(secs) = file.network_timeout_secs {
                config.network_timeout = Duration::from_secs(secs);
            }
            if let Some(max) = file.max_listed_commits {
                config.max_listed_commits = max;
            }
            if let Some(domain) = &file.noreply_domain {
                config.noreply_domain = domain.trim().to_string();
            }
        }

        config.apply(env);
        config.apply(cli);
        Ok(config)
    }

    fn apply(&mut self, layer: &Overrides) {
        if let Some(v) = layer.merge {
            self.merge = v;
        }
        if let Some(v) = layer.comment {
            self.comment = v;
        }
        if let Some(v) = layer.merge_strategy {
            self.merge_strategy = v;
        }
        if let Some(v) = layer.merge_commit_message_style {
            self.merge_commit_message_style = v;
        }
        if let Some(v) = layer.debug {
            self.debug = v;
        }
    }

    /// Read and parse a config file.
    fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
