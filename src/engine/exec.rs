//! engine::exec
//!
//! Mutation Executor: the only code that changes remote state.
//!
//! # Invariants
//!
//! - Exactly one push per run, lease-protected by the base commit observed
//!   at resolution
//! - A rejected lease is reported verbatim and never retried
//! - A no-op mutation pushes nothing

use thiserror::Error;
use tracing::{info, warn};

use super::strategy::Mutation;
use crate::core::types::{Oid, RefName, RepositoryEndpoint, Role};
use crate::git::{Git, GitError, PushOutcome, Transport, TransportError};

/// Errors from applying (or preparing) the mutation.
#[derive(Debug, Error)]
pub enum MutationError {
    /// The lease was lost; `reason` is git's text, unchanged.
    #[error("the remote rejected the update of {refname}: {reason}")]
    Conflict { refname: String, reason: String },

    /// The remote declined the update (hook, branch protection); `reason`
    /// is git's text, unchanged.
    #[error("the remote refused the update of {refname}: {reason}")]
    Refused { refname: String, reason: String },

    /// The push could not be carried out.
    #[error(transparent)]
    Transport(TransportError),

    /// Preparing the update locally failed.
    #[error(transparent)]
    Git(#[from] GitError),
}

impl From<TransportError> for MutationError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Rejected { refname, reason } => {
                MutationError::Conflict { refname, reason }
            }
            TransportError::Refused { refname, reason } => {
                MutationError::Refused { refname, reason }
            }
            other => MutationError::Transport(other),
        }
    }
}

/// What the executor did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Base branch value after the run
    pub new_base: Oid,
    /// Whether the remote ref actually moved
    pub moved: bool,
}

/// Apply `mutation` to `base`'s repository.
pub async fn execute(
    git: &Git,
    transport: &dyn Transport,
    base: &RepositoryEndpoint,
    mutation: &Mutation,
) -> Result<Applied, MutationError> {
    if mutation.is_noop() {
        info!(refname = %mutation.refname, "already up to date");
        return Ok(Applied {
            new_base: mutation.target.clone(),
            moved: false,
        });
    }

    let outcome = transport
        .push_cas(
            &base.clone_url,
            &mutation.refname,
            &mutation.target,
            &mutation.expected,
        )
        .await?;

    // Keep the local copy in step so a rerun sees the same picture.
    let tracking = RefName::for_tracking(Role::Base, &base.branch);
    if let Err(e) = git.update_ref_cas(
        tracking.as_str(),
        &mutation.target,
        Some(&mutation.expected),
        "fast-forward: push",
    ) {
        warn!(error = %e, "could not update local tracking ref");
    }

    Ok(Applied {
        new_base: mutation.target.clone(),
        moved: outcome == PushOutcome::Updated,
    })
}
