//! core::types
//!
//! Strong types for the values that flow through a fast-forward run.
//!
//! # Types
//!
//! - [`Oid`] - Content-addressed commit identifier (SHA-1 or SHA-256 hex)
//! - [`BranchName`] - Validated branch name (`main`, `feature/x`)
//! - [`RefName`] - Validated full reference name (`refs/heads/main`)
//! - [`CommitRef`] - A symbolic name paired with the commit it resolved to
//! - [`RepositoryEndpoint`] - A remote repository plus the branch of interest
//! - [`Role`] - Which side of the comparison an endpoint plays
//!
//! # Validation
//!
//! Names and identifiers are validated at construction time, so the engine
//! never has to re-check a ref name before handing it to git.
//!
//! # Examples
//!
//! ```
//! use fast_forward::core::types::{BranchName, Oid, RefName};
//!
//! let branch = BranchName::new("feature/my-branch").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let refname = RefName::for_branch(&branch);
//! assert_eq!(refname.as_str(), "refs/heads/feature/my-branch");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! # let _ = oid;
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),
}

/// Characters git refuses anywhere in a refname.
const FORBIDDEN_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

/// Shared `git check-ref-format` rules for branch and ref names.
///
/// Returns a human-readable reason on failure; callers wrap it in the
/// appropriate [`TypeError`] variant.
fn check_refname_rules(name: &str, what: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("{what} cannot be empty"));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(format!("{what} cannot start or end with '/'"));
    }
    if name.ends_with(".lock") {
        return Err(format!("{what} cannot end with '.lock'"));
    }
    for bad in ["..", "@{", "//"] {
        if name.contains(bad) {
            return Err(format!("{what} cannot contain '{bad}'"));
        }
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(format!("{what} cannot contain '{c}'"));
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Err(format!("{what} cannot contain control characters"));
    }
    for component in name.split('/') {
        if component.starts_with('.') {
            return Err("path component cannot start with '.'".into());
        }
        if component.ends_with(".lock") {
            return Err("path component cannot end with '.lock'".into());
        }
    }
    Ok(())
}

/// A validated Git branch name (the part after `refs/heads/`).
///
/// # Example
///
/// ```
/// use fast_forward::core::types::BranchName;
///
/// let name = BranchName::new("release/1.x").unwrap();
/// assert_eq!(name.as_str(), "release/1.x");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("-flag").is_err());
/// assert!(BranchName::new("@").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// A fully qualified `refs/heads/` prefix is accepted and stripped, since
    /// event payloads occasionally carry one.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let name = match name.strip_prefix("refs/heads/") {
            Some(short) => short.to_string(),
            None => name,
        };

        if name == "@" {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be '@' (reserved)".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }
        check_refname_rules(&name, "branch name").map_err(TypeError::InvalidBranchName)?;

        Ok(Self(name))
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256), normalized to lowercase.
///
/// Once resolved, an `Oid` names exactly one point in history; the branch
/// that led to it may move, the identifier never does.
///
/// # Example
///
/// ```
/// use fast_forward::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();

        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }

        Ok(Self(oid))
    }

    /// Abbreviated form: the first `len` characters (or the whole id).
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which side of the comparison an endpoint plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The destination branch that would be advanced.
    Base,
    /// The source branch (the pull request's branch).
    Head,
}

impl Role {
    /// Lowercase label, used in tracking ref names and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Base => "base",
            Role::Head => "head",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated full Git reference name.
///
/// # Example
///
/// ```
/// use fast_forward::core::types::{BranchName, RefName, Role};
///
/// let branch = BranchName::new("main").unwrap();
/// assert_eq!(RefName::for_branch(&branch).as_str(), "refs/heads/main");
/// assert_eq!(
///     RefName::for_tracking(Role::Base, &branch).as_str(),
///     "refs/fast-forward/base/main"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Namespace for the local copies of fetched endpoint branches.
    pub const TRACKING_PREFIX: &'static str = "refs/fast-forward/";

    /// Create a new validated ref name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        check_refname_rules(&name, "ref name").map_err(TypeError::InvalidRefName)?;
        Ok(Self(name))
    }

    /// `refs/heads/<branch>`.
    pub fn for_branch(branch: &BranchName) -> Self {
        Self(format!("refs/heads/{}", branch.as_str()))
    }

    /// `refs/fast-forward/<role>/<branch>`: where a fetched endpoint lands.
    ///
    /// Base and head live in separate namespaces so a fork's branch named
    /// like the base branch cannot shadow it.
    pub fn for_tracking(role: Role, branch: &BranchName) -> Self {
        Self(format!(
            "{}{}/{}",
            Self::TRACKING_PREFIX,
            role.as_str(),
            branch.as_str()
        ))
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A symbolic name paired with the commit it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    /// Branch the identifier was read from
    pub name: BranchName,
    /// Resolved commit
    pub oid: Oid,
}

impl std::fmt::Display for CommitRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.oid.short(7))
    }
}

/// A remote repository location plus the branch of interest.
///
/// Built per invocation from event data; never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct RepositoryEndpoint {
    /// `owner/name` of the repository
    pub full_name: String,
    /// URL git can fetch from and push to
    pub clone_url: String,
    /// Branch on that repository
    pub branch: BranchName,
    /// Commit the event says the branch points at, if it says so.
    ///
    /// Pull request payloads pin the head commit; resolving a pinned
    /// endpoint yields this commit even if the branch has moved since.
    pub pinned: Option<Oid>,
}

impl RepositoryEndpoint {
    /// `owner:branch`, the label GitHub uses for pull request sides.
    pub fn label(&self) -> String {
        let owner = self
            .full_name
            .split_once('/')
            .map(|(owner, _)| owner)
            .unwrap_or(&self.full_name);
        format!("{}:{}", owner, self.branch)
    }
}

// Clone URLs may carry credentials in some setups; keep them out of logs.
impl std::fmt::Debug for RepositoryEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryEndpoint")
            .field("full_name", &self.full_name)
            .field("branch", &self.branch)
            .field("pinned", &self.pinned)
            .finish_non_exhaustive()
    }
}
