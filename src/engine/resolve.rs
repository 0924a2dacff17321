//! engine::resolve
//!
//! Reference Resolver: turns a repository endpoint into a [`CommitRef`].
//!
//! # Algorithm
//!
//! Resolution is at most two attempts around one fetch:
//!
//! 1. Look locally. A pinned endpoint is satisfied if its commit is in the
//!    object database. An unpinned endpoint is only satisfied by a tracking
//!    ref fetched during this run, so a value left over from an earlier run
//!    is never trusted.
//! 2. If that fails, fetch the branch into
//!    `refs/fast-forward/<role>/<branch>` and look again.
//! 3. A second miss is a [`ResolutionError`]; there is no third attempt.
//!
//! Only local state changes here. Remote state is never touched.

use thiserror::Error;
use tracing::{debug, info};

use crate::core::types::{CommitRef, Oid, RefName, RepositoryEndpoint, Role};
use crate::git::{Git, GitError, Transport, TransportError};

/// Errors from reference resolution.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The fetch needed to find the commit failed.
    #[error("could not fetch {role} branch '{label}': {source}")]
    Fetch {
        role: Role,
        label: String,
        #[source]
        source: TransportError,
    },

    /// The commit is still missing after fetching.
    #[error("{role} {what} not found in {full_name} even after fetching")]
    Missing {
        role: Role,
        /// The ref or commit that could not be found
        what: String,
        full_name: String,
    },

    #[error(transparent)]
    Git(#[from] GitError),
}

/// Resolves endpoints against the local repository, fetching as needed.
pub struct Resolver<'a> {
    git: &'a Git,
    transport: &'a dyn Transport,
}

impl<'a> Resolver<'a> {
    pub fn new(git: &'a Git, transport: &'a dyn Transport) -> Self {
        Self { git, transport }
    }

    /// Resolve `endpoint` playing `role` to a concrete commit.
    pub async fn resolve(
        &self,
        role: Role,
        endpoint: &RepositoryEndpoint,
    ) -> Result<CommitRef, ResolutionError> {
        let tracking = RefName::for_tracking(role, &endpoint.branch);
        let mut fetched = false;

        loop {
            if let Some(oid) = self.lookup(endpoint, &tracking, fetched)? {
                debug!(%role, sha = %oid, fetched, "resolved");
                return Ok(CommitRef {
                    name: endpoint.branch.clone(),
                    oid,
                });
            }

            if fetched {
                let what = match &endpoint.pinned {
                    Some(oid) => format!("commit {}", oid),
                    None => format!("branch '{}'", endpoint.branch),
                };
                return Err(ResolutionError::Missing {
                    role,
                    what,
                    full_name: endpoint.full_name.clone(),
                });
            }

            info!(%role, branch = %endpoint.branch, "fetching");
            self.transport
                .fetch(&endpoint.clone_url, &endpoint.branch, &tracking)
                .await
                .map_err(|source| ResolutionError::Fetch {
                    role,
                    label: endpoint.label(),
                    source,
                })?;
            fetched = true;
        }
    }

    /// One local resolution attempt.
    fn lookup(
        &self,
        endpoint: &RepositoryEndpoint,
        tracking: &RefName,
        fetched: bool,
    ) -> Result<Option<Oid>, GitError> {
        match &endpoint.pinned {
            Some(oid) => Ok(self.git.has_commit(oid)?.then(|| oid.clone())),
            None if fetched => self.git.try_resolve_ref(tracking.as_str()),
            None => Ok(None),
        }
    }
}
