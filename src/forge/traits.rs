//! forge::traits
//!
//! Forge trait definition for interacting with the hosting service.
//!
//! # Design
//!
//! The `Forge` trait is async because forge operations involve network I/O.
//! All methods return `Result` to handle API errors gracefully; callers
//! decide what a failure means (the authorization gate, for one, treats
//! every error as "denied").
//!
//! # Example
//!
//! ```ignore
//! use fast_forward::forge::{Forge, ForgeError};
//!
//! async fn may_push(forge: &dyn Forge, login: &str) -> Result<bool, ForgeError> {
//!     Ok(forge.permission(login).await?.can_push)
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{BranchName, Oid, RepositoryEndpoint};

/// Errors from forge operations.
///
/// These error types map to common failure modes when interacting
/// with remote hosting services like GitHub.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was understood but refused (HTTP 422).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The request did not complete within the network timeout.
    #[error("request timed out")]
    Timeout,

    /// A response could not be interpreted.
    #[error("unexpected response: {0}")]
    Malformed(String),
}

/// One side (base or head) of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrSide {
    /// Branch name
    pub branch: BranchName,
    /// Commit the side pointed at when the event fired
    pub sha: Oid,
    /// `owner/name` of the repository holding the branch
    pub repo_full_name: String,
    /// URL to fetch the branch from
    pub clone_url: String,
}

impl PrSide {
    /// Endpoint for this side, optionally pinned to the recorded sha.
    pub fn endpoint(&self, pinned: bool) -> RepositoryEndpoint {
        RepositoryEndpoint {
            full_name: self.repo_full_name.clone(),
            clone_url: self.clone_url.clone(),
            branch: self.branch.clone(),
            pinned: pinned.then(|| self.sha.clone()),
        }
    }
}

/// Pull request information returned from the forge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// PR body/description
    pub body: Option<String>,
    /// PR URL (web URL for viewing)
    pub url: String,
    /// Login of the PR author
    pub author: String,
    /// Destination branch
    pub base: PrSide,
    /// Source branch
    pub head: PrSide,
}

/// A collaborator's permission on the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    /// Who the permission belongs to
    pub login: String,
    /// `admin`, `maintain`, `write`, `triage`, `read`, or `none`
    pub level: String,
    /// Whether the collaborator may push
    pub can_push: bool,
}

impl Permission {
    /// Levels that include push access.
    pub const PUSH_LEVELS: &'static [&'static str] = &["admin", "maintain", "write"];

    /// Derive push capability from a permission level alone.
    pub fn from_level(login: impl Into<String>, level: impl Into<String>) -> Self {
        let level = level.into();
        let can_push = Self::PUSH_LEVELS.contains(&level.as_str());
        Self {
            login: login.into(),
            level,
            can_push,
        }
    }
}

/// A user account on the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeUser {
    pub login: String,
    /// Numeric account id
    pub id: u64,
    /// Display name, when the user set one
    pub name: Option<String>,
}

/// Forge trait for interacting with remote hosting services.
///
/// The repository is fixed when the forge is constructed.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Get a pull request by number.
    async fn get_pr(&self, number: u64) -> Result<PullRequest, ForgeError>;

    /// Query `login`'s current permission on the repository.
    async fn permission(&self, login: &str) -> Result<Permission, ForgeError>;

    /// Look up a user account.
    async fn get_user(&self, login: &str) -> Result<ForgeUser, ForgeError>;

    /// Post a comment on a pull request's conversation; returns its URL.
    async fn post_comment(&self, number: u64, body: &str) -> Result<String, ForgeError>;
}
