//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge stores pull requests, permissions, and users in memory,
//! records every call, and can be told to fail a specific operation.
//!
//! # Example
//!
//! ```
//! use fast_forward::forge::mock::{FailOn, MockForge};
//! use fast_forward::forge::{Forge, ForgeError};
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new().with_permission("alice", "write");
//! assert!(forge.permission("alice").await.unwrap().can_push);
//! assert!(!forge.permission("mallory").await.unwrap().can_push);
//!
//! let forge = forge.fail_on(FailOn::Permission(ForgeError::RateLimited));
//! assert!(forge.permission("alice").await.is_err());
//! # });
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::{Forge, ForgeError, ForgeUser, Permission, PullRequest};

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockForge {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockForgeInner {
    /// Stored PRs by number.
    prs: HashMap<u64, PullRequest>,
    /// Permission level by login; unknown logins have `none`.
    permissions: HashMap<String, String>,
    /// Users by login.
    users: HashMap<String, ForgeUser>,
    /// Posted comments, in order.
    comments: Vec<(u64, String)>,
    /// Method to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail get_pr with the given error.
    GetPr(ForgeError),
    /// Fail permission with the given error.
    Permission(ForgeError),
    /// Fail get_user with the given error.
    GetUser(ForgeError),
    /// Fail post_comment with the given error.
    PostComment(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetPr { number: u64 },
    Permission { login: String },
    GetUser { login: String },
    PostComment { number: u64 },
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockForgeInner> {
        // A panicking test thread must not hide state from the assertions
        // that follow it.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a pull request.
    pub fn with_pr(self, pr: PullRequest) -> Self {
        self.lock().prs.insert(pr.number, pr);
        self
    }

    /// Grant `login` a permission level (`admin`, `write`, `read`, ...).
    pub fn with_permission(self, login: &str, level: &str) -> Self {
        self.lock()
            .permissions
            .insert(login.to_string(), level.to_string());
        self
    }

    /// Register a user account.
    pub fn with_user(self, user: ForgeUser) -> Self {
        self.lock().users.insert(user.login.clone(), user);
        self
    }

    /// Configure the mock to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    /// Change a login's permission after construction.
    pub fn set_permission(&self, login: &str, level: &str) {
        self.lock()
            .permissions
            .insert(login.to_string(), level.to_string());
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Comments posted so far, as `(number, body)`.
    pub fn comments(&self) -> Vec<(u64, String)> {
        self.lock().comments.clone()
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        self.lock().operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, expected: &str) -> Result<(), ForgeError> {
        let inner = self.lock();
        match &inner.fail_on {
            Some(FailOn::GetPr(e)) if expected == "get_pr" => Err(e.clone()),
            Some(FailOn::Permission(e)) if expected == "permission" => Err(e.clone()),
            Some(FailOn::GetUser(e)) if expected == "get_user" => Err(e.clone()),
            Some(FailOn::PostComment(e)) if expected == "post_comment" => Err(e.clone()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_pr(&self, number: u64) -> Result<PullRequest, ForgeError> {
        self.record(MockOperation::GetPr { number });
        self.check_fail("get_pr")?;
        self.lock()
            .prs
            .get(&number)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("PR #{}", number)))
    }

    async fn permission(&self, login: &str) -> Result<Permission, ForgeError> {
        self.record(MockOperation::Permission {
            login: login.to_string(),
        });
        self.check_fail("permission")?;
        let level = self
            .lock()
            .permissions
            .get(login)
            .cloned()
            .unwrap_or_else(|| "none".to_string());
        Ok(Permission::from_level(login, level))
    }

    async fn get_user(&self, login: &str) -> Result<ForgeUser, ForgeError> {
        self.record(MockOperation::GetUser {
            login: login.to_string(),
        });
        self.check_fail("get_user")?;
        self.lock()
            .users
            .get(login)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("user {}", login)))
    }

    async fn post_comment(&self, number: u64, body: &str) -> Result<String, ForgeError> {
        self.record(MockOperation::PostComment { number });
        self.check_fail("post_comment")?;
        let mut inner = self.lock();
        inner.comments.push((number, body.to_string()));
        Ok(format!(
            "https://example.invalid/pull/{}#issuecomment-{}",
            number,
            inner.comments.len()
        ))
    }
}
