//! git::interface
//!
//! Local object database access using git2.
//!
//! This module is the **single doorway** to the repository's objects and
//! refs. Network transport lives next door in [`super::transport`]; nothing
//! else in the crate imports `git2`.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::ObjectNotFound`]: Requested commit is not in the object database
//! - [`GitError::CasFailed`]: Compare-and-swap precondition failed
//!
//! # Example
//!
//! ```ignore
//! use fast_forward::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let oid = git.resolve_ref("refs/fast-forward/base/main")?;
//! println!("base is at {}", oid.short(7));
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::core::types::{Oid, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Compare-and-swap precondition failed.
    #[error("CAS failed for {refname}: expected {expected}, found {actual}")]
    CasFailed {
        /// The ref being updated
        refname: String,
        /// The expected old value
        expected: String,
        /// The actual current value
        actual: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("repository is locked: {}", err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }

    fn internal(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidRefName(msg) => GitError::InvalidRefName { message: msg },
            TypeError::InvalidBranchName(msg) => GitError::InvalidRefName { message: msg },
        }
    }
}

/// Information about a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// The commit OID
    pub oid: Oid,
    /// First line of the commit message
    pub summary: String,
    /// Author name
    pub author_name: String,
    /// Author timestamp
    pub author_time: chrono::DateTime<chrono::Utc>,
}

/// Commits reachable from one tip and not another, capped at a limit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitRange {
    /// Newest first, at most `limit` entries
    pub commits: Vec<CommitInfo>,
    /// How many commits the full range holds
    pub total: usize,
}

impl CommitRange {
    /// Number of commits left out of [`CommitRange::commits`].
    pub fn omitted(&self) -> usize {
        self.total.saturating_sub(self.commits.len())
    }
}

/// Identity stamped on a synthesized commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

/// The Git interface.
///
/// Every read of the local object database and every local ref write goes
/// through here. Remote state is never touched by this type.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening
    // =========================================================================

    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover`, so `path` can be any directory
    /// within the repository. Bare repositories are fine: only the object
    /// database and refs are used.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        Ok(Self { repo })
    }

    /// Open the repository containing `path`, or create a bare one there.
    ///
    /// Lets the tool run on a runner that skipped the checkout step; all
    /// objects it needs are fetched into the scratch repository.
    pub fn open_or_init(path: &Path) -> Result<Self, GitError> {
        match Self::open(path) {
            Ok(git) => Ok(git),
            Err(GitError::NotARepo { .. }) => {
                debug!(path = %path.display(), "initializing scratch repository");
                let repo = git2::Repository::init_bare(path).map_err(|e| {
                    GitError::AccessError {
                        message: format!("cannot initialize {}: {}", path.display(), e.message()),
                    }
                })?;
                Ok(Self { repo })
            }
            Err(e) => Err(e),
        }
    }

    /// Path of the git directory (`.git` or the bare repository itself).
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    // =========================================================================
    // Ref Resolution
    // =========================================================================

    /// Resolve a ref to the commit it points at.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if the ref doesn't exist
    pub fn resolve_ref(&self, refname: &str) -> Result<Oid, GitError> {
        let reference = self
            .repo
            .find_reference(refname)
            .map_err(|e| GitError::from_git2(e, refname))?;

        let oid = reference
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, refname))?
            .id();

        Oid::new(oid.to_string()).map_err(|e| e.into())
    }

    /// Resolve a ref, returning None if it doesn't exist.
    pub fn try_resolve_ref(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.resolve_ref(refname) {
            Ok(oid) => Ok(Some(oid)),
            Err(GitError::RefNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether the object database holds `oid` as a commit.
    pub fn has_commit(&self, oid: &Oid) -> Result<bool, GitError> {
        let git_oid = to_git2(oid)?;
        match self.repo.find_commit(git_oid) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(GitError::from_git2(e, oid.as_str())),
        }
    }

    /// Update a local ref with compare-and-swap semantics.
    ///
    /// `expected_old` of `None` means the ref must not exist yet.
    ///
    /// # Errors
    ///
    /// - [`GitError::CasFailed`] if the current value doesn't match expected
    pub fn update_ref_cas(
        &self,
        refname: &str,
        new_oid: &Oid,
        expected_old: Option<&Oid>,
        message: &str,
    ) -> Result<(), GitError> {
        let current = self.try_resolve_ref(refname)?;

        if current.as_ref() != expected_old {
            return Err(GitError::CasFailed {
                refname: refname.to_string(),
                expected: describe(expected_old),
                actual: describe(current.as_ref()),
            });
        }

        let oid = to_git2(new_oid)?;
        let result = match expected_old {
            Some(old) => {
                self.repo
                    .reference_matching(refname, oid, true, to_git2(old)?, message)
            }
            None => self.repo.reference(refname, oid, false, message),
        };
        result.map_err(|e| GitError::from_git2(e, refname))?;
        Ok(())
    }

    // =========================================================================
    // Ancestry Queries
    // =========================================================================

    /// Find the merge base (common ancestor) of two commits.
    ///
    /// Returns `None` if the histories share no commit.
    pub fn merge_base(&self, oid1: &Oid, oid2: &Oid) -> Result<Option<Oid>, GitError> {
        match self.repo.merge_base(to_git2(oid1)?, to_git2(oid2)?) {
            Ok(oid) => Ok(Some(Oid::new(oid.to_string())?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::internal(e)),
        }
    }

    /// Check if `ancestor` is an ancestor of `descendant`.
    ///
    /// Returns true if ancestor == descendant (a commit is its own ancestor).
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        if ancestor == descendant {
            return Ok(true);
        }

        self.repo
            .graph_descendant_of(to_git2(descendant)?, to_git2(ancestor)?)
            .map_err(GitError::internal)
    }

    /// Commits reachable from `tip` but not from `hide`, newest first.
    ///
    /// Hiding a commit hides its whole ancestry, so hiding a root commit
    /// needs no parent lookup. At most `limit` commits are materialized;
    /// the rest are only counted.
    pub fn commits_between(
        &self,
        tip: &Oid,
        hide: Option<&Oid>,
        limit: usize,
    ) -> Result<CommitRange, GitError> {
        let mut revwalk = self.repo.revwalk().map_err(GitError::internal)?;
        revwalk
            .set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)
            .map_err(GitError::internal)?;
        revwalk.push(to_git2(tip)?).map_err(GitError::internal)?;
        if let Some(hide) = hide {
            revwalk.hide(to_git2(hide)?).map_err(GitError::internal)?;
        }

        let mut range = CommitRange::default();
        for step in revwalk {
            let id = step.map_err(GitError::internal)?;
            range.total += 1;
            if range.commits.len() < limit {
                range.commits.push(self.commit_info(&Oid::new(id.to_string())?)?);
            }
        }
        Ok(range)
    }

    // =========================================================================
    // Commit Information
    // =========================================================================

    /// Get information about a commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the commit doesn't exist
    pub fn commit_info(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        let commit = self
            .repo
            .find_commit(to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let author = commit.author();
        let author_time = chrono::DateTime::from_timestamp(author.when().seconds(), 0)
            .unwrap_or(chrono::DateTime::UNIX_EPOCH);

        Ok(CommitInfo {
            oid: oid.clone(),
            summary: commit.summary().unwrap_or("").to_string(),
            author_name: author.name().unwrap_or("").to_string(),
            author_time,
        })
    }

    // =========================================================================
    // Commit Creation
    // =========================================================================

    /// Write a merge commit with `head`'s tree and parents `[base, head]`.
    ///
    /// Only the object is written; no ref moves. Author and committer are
    /// both `signature`, timestamped now.
    pub fn create_merge_commit(
        &self,
        base: &Oid,
        head: &Oid,
        signature: &Signature,
        message: &str,
    ) -> Result<Oid, GitError> {
        let base_commit = self
            .repo
            .find_commit(to_git2(base)?)
            .map_err(|e| GitError::from_git2(e, base.as_str()))?;
        let head_commit = self
            .repo
            .find_commit(to_git2(head)?)
            .map_err(|e| GitError::from_git2(e, head.as_str()))?;
        let tree = head_commit.tree().map_err(GitError::internal)?;

        let sig = git2::Signature::now(&signature.name, &signature.email)
            .map_err(GitError::internal)?;

        let oid = self
            .repo
            .commit(None, &sig, &sig, message, &tree, &[&base_commit, &head_commit])
            .map_err(GitError::internal)?;

        debug!(sha = %oid, "wrote merge commit");
        Ok(Oid::new(oid.to_string())?)
    }
}

fn to_git2(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

fn describe(oid: Option<&Oid>) -> String {
    oid.map(|o| o.to_string())
        .unwrap_or_else(|| "<none>".to_string())
}
