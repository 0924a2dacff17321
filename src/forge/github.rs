//! forge::github
//!
//! GitHub forge implementation using the REST API.
//!
//! # Endpoints
//!
//! - `GET  /repos/{owner}/{repo}/pulls/{number}`
//! - `GET  /repos/{owner}/{repo}/collaborators/{login}/permission`
//! - `GET  /users/{login}`
//! - `POST /repos/{owner}/{repo}/issues/{number}/comments`
//!
//! # Rate Limiting
//!
//! GitHub has rate limits. This implementation returns
//! `ForgeError::RateLimited` when limits are hit and never retries; a run
//! makes a handful of calls at most.
//!
//! # Example
//!
//! ```ignore
//! use fast_forward::forge::github::GitHubForge;
//! use fast_forward::forge::Forge;
//!
//! let forge = GitHubForge::new(token, "octocat", "hello-world")
//!     .with_timeout(std::time::Duration::from_secs(30));
//! let pr = forge.get_pr(42).await?;
//! println!("{} -> {}", pr.head.branch, pr.base.branch);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::traits::{Forge, ForgeError, ForgeUser, Permission, PrSide, PullRequest};
use crate::core::types::{BranchName, Oid};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("fast-forward/", env!("CARGO_PKG_VERSION"));

/// GitHub forge implementation.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Bearer token
    token: String,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
    /// Per-request timeout
    timeout: Duration,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("has_token", &!self.token.is_empty())
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GitHubForge {
    /// Create a forge for `owner/repo` against api.github.com.
    pub fn new(token: impl Into<String>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Create a forge from an `owner/repo` string.
    ///
    /// Returns `None` if `full_name` is not of that shape.
    pub fn from_full_name(token: impl Into<String>, full_name: &str) -> Option<Self> {
        let (owner, repo) = parse_full_name(full_name)?;
        Some(Self::new(token, owner, repo))
    }

    /// Point the forge at another API base (GitHub Enterprise, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound every request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        if self.token.is_empty() {
            return Err(ForgeError::AuthRequired);
        }
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ForgeError::AuthFailed("token is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Send a request with headers and timeout applied.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ForgeError> {
        request
            .headers(self.headers()?)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_transport_error)
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| {
                if e.is_timeout() {
                    ForgeError::Timeout
                } else {
                    ForgeError::Malformed(format!("failed to parse response: {}", e))
                }
            })
        } else {
            let message = match response.json::<GitHubErrorResponse>().await {
                Ok(err) => err.message,
                Err(_) => "Unknown error".to_string(),
            };
            Err(error_for_status(status, message))
        }
    }
}

/// Map a non-success HTTP status to a [`ForgeError`].
pub fn error_for_status(status: StatusCode, message: String) -> ForgeError {
    match status {
        StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
        StatusCode::FORBIDDEN => {
            // GitHub reports secondary rate limits as 403
            if message.to_ascii_lowercase().contains("rate limit") {
                ForgeError::RateLimited
            } else {
                ForgeError::AuthFailed(format!("Permission denied: {}", message))
            }
        }
        StatusCode::NOT_FOUND => ForgeError::NotFound(message),
        StatusCode::UNPROCESSABLE_ENTITY => ForgeError::Validation(message),
        StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
        _ if status.is_server_error() => ForgeError::ApiError {
            status: status.as_u16(),
            message: format!("GitHub server error: {}", message),
        },
        _ => ForgeError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}

fn map_transport_error(err: reqwest::Error) -> ForgeError {
    if err.is_timeout() {
        ForgeError::Timeout
    } else {
        ForgeError::NetworkError(err.to_string())
    }
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    #[instrument(skip(self))]
    async fn get_pr(&self, number: u64) -> Result<PullRequest, ForgeError> {
        let url = self.repo_url(&format!("pulls/{}", number));
        let response = self.send(self.client.get(&url)).await?;
        let pr: GitHubPullRequest = self.handle_response(response).await?;
        debug!(head = %pr.head.sha, base = %pr.base.sha, "fetched pull request");
        pr.try_into()
    }

    #[instrument(skip(self))]
    async fn permission(&self, login: &str) -> Result<Permission, ForgeError> {
        let url = self.repo_url(&format!("collaborators/{}/permission", login));
        let response = self.send(self.client.get(&url)).await?;
        let body: GitHubPermission = self.handle_response(response).await?;
        debug!(level = %body.permission, "fetched permission");
        Ok(body.into_permission(login))
    }

    #[instrument(skip(self))]
    async fn get_user(&self, login: &str) -> Result<ForgeUser, ForgeError> {
        let url = format!("{}/users/{}", self.api_base, login);
        let response = self.send(self.client.get(&url)).await?;
        let user: GitHubUser = self.handle_response(response).await?;
        Ok(ForgeUser {
            login: user.login,
            id: user.id,
            name: user.name.filter(|n| !n.trim().is_empty()),
        })
    }

    #[instrument(skip(self, body))]
    async fn post_comment(&self, number: u64, body: &str) -> Result<String, ForgeError> {
        let url = self.repo_url(&format!("issues/{}/comments", number));
        let response = self
            .send(self.client.post(&url).json(&CommentBody { body }))
            .await?;
        let comment: GitHubComment = self.handle_response(response).await?;
        debug!(url = %comment.html_url, "posted comment");
        Ok(comment.html_url)
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// Request body for posting a comment.
#[derive(Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// GitHub PR format, shared by the REST API and webhook payloads.
#[derive(Deserialize)]
struct GitHubPullRequest {
    number: u64,
    html_url: String,
    title: String,
    body: Option<String>,
    user: GitHubAccount,
    head: GitHubRef,
    base: GitHubRef,
}

/// GitHub ref (head/base) format.
#[derive(Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: String,
    /// None when the fork was deleted
    repo: Option<GitHubRepo>,
}

#[derive(Deserialize)]
struct GitHubRepo {
    full_name: String,
    clone_url: String,
}

#[derive(Deserialize)]
struct GitHubAccount {
    login: String,
}

#[derive(Deserialize)]
struct GitHubPermission {
    permission: String,
    user: Option<GitHubPermissionUser>,
}

#[derive(Deserialize)]
struct GitHubPermissionUser {
    permissions: Option<GitHubPermissionFlags>,
}

#[derive(Deserialize)]
struct GitHubPermissionFlags {
    push: Option<bool>,
}

impl GitHubPermission {
    /// Explicit `user.permissions.push` wins; otherwise derive from the level.
    fn into_permission(self, login: &str) -> Permission {
        let explicit = self
            .user
            .and_then(|u| u.permissions)
            .and_then(|p| p.push);
        let mut permission = Permission::from_level(login, self.permission);
        if let Some(push) = explicit {
            permission.can_push = push;
        }
        permission
    }
}

#[derive(Deserialize)]
struct GitHubUser {
    login: String,
    id: u64,
    name: Option<String>,
}

#[derive(Deserialize)]
struct GitHubComment {
    html_url: String,
}

impl GitHubRef {
    fn into_side(self, which: &str) -> Result<PrSide, ForgeError> {
        let repo = self.repo.ok_or_else(|| {
            ForgeError::Malformed(format!("{} repository no longer exists", which))
        })?;
        Ok(PrSide {
            branch: BranchName::new(self.ref_name)
                .map_err(|e| ForgeError::Malformed(format!("{} ref: {}", which, e)))?,
            sha: Oid::new(self.sha)
                .map_err(|e| ForgeError::Malformed(format!("{} sha: {}", which, e)))?,
            repo_full_name: repo.full_name,
            clone_url: repo.clone_url,
        })
    }
}

impl TryFrom<GitHubPullRequest> for PullRequest {
    type Error = ForgeError;

    fn try_from(pr: GitHubPullRequest) -> Result<Self, Self::Error> {
        Ok(PullRequest {
            number: pr.number,
            title: pr.title,
            body: pr.body,
            url: pr.html_url,
            author: pr.user.login,
            base: pr.base.into_side("base")?,
            head: pr.head.into_side("head")?,
        })
    }
}

/// Interpret a `pull_request` object from a webhook payload.
///
/// Payloads embed the same representation the REST API returns.
pub fn pull_request_from_json(value: &serde_json::Value) -> Result<PullRequest, ForgeError> {
    let pr: GitHubPullRequest = serde_json::from_value(value.clone())
        .map_err(|e| ForgeError::Malformed(format!("pull request: {}", e)))?;
    pr.try_into()
}

// --------------------------------------------------------------------------
// Name Parsing
// --------------------------------------------------------------------------

/// Split `owner/repo` into its parts.
///
/// # Example
///
/// ```
/// use fast_forward::forge::github::parse_full_name;
///
/// assert_eq!(
///     parse_full_name("octocat/hello-world"),
///     Some(("octocat".to_string(), "hello-world".to_string()))
/// );
/// assert_eq!(parse_full_name("octocat"), None);
/// ```
pub fn parse_full_name(full_name: &str) -> Option<(String, String)> {
    let (owner, repo) = full_name.trim().split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}
