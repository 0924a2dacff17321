//! engine::outcome
//!
//! The single value every run ends in. The report and the exit code are both
//! derived from it.

use super::ancestry::AncestryResult;
use super::exec::Applied;
use super::gate::AuthorizationDecision;
use super::strategy::Mutation;
use crate::core::types::CommitRef;

/// Where a run stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading the triggering event
    Event,
    /// Looking up the pull request
    PullRequest,
    /// Resolving base and head
    Resolving,
    /// Comparing histories
    Evaluating,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Event => "reading the event",
            Stage::PullRequest => "looking up the pull request",
            Stage::Resolving => "resolving branches",
            Stage::Evaluating => "comparing histories",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an attempted update failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The lease was lost: base moved after it was resolved
    Conflict,
    /// The remote declined the update (hook, branch protection)
    Refused,
    /// Anything else: preparing the update, transport trouble
    Error,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Merging was not requested; only the relationship is reported.
    CheckOnly {
        base: CommitRef,
        head: CommitRef,
        ancestry: AncestryResult,
    },
    /// Merging was requested but base is not an ancestor of head.
    MergeBlocked {
        base: CommitRef,
        head: CommitRef,
        ancestry: AncestryResult,
    },
    /// The requester may not push; nothing was changed.
    ForbiddenMerge {
        base: CommitRef,
        head: CommitRef,
        decision: AuthorizationDecision,
    },
    /// The base branch now points at `applied.new_base`.
    MergeSucceeded {
        base: CommitRef,
        head: CommitRef,
        mutation: Mutation,
        applied: Applied,
    },
    /// The update was attempted (or prepared) and failed.
    MergeFailed {
        base: CommitRef,
        head: CommitRef,
        reason: String,
        kind: FailureKind,
    },
    /// The run could not get far enough to decide anything.
    Aborted { stage: Stage, reason: String },
}

impl Outcome {
    /// Success means: fast-forward possible (check only) or merge applied.
    pub fn is_success(&self) -> bool {
        match self {
            Outcome::CheckOnly { ancestry, .. } => ancestry.can_fast_forward(),
            Outcome::MergeSucceeded { .. } => true,
            Outcome::MergeBlocked { .. }
            | Outcome::ForbiddenMerge { .. }
            | Outcome::MergeFailed { .. }
            | Outcome::Aborted { .. } => false,
        }
    }

    /// Process exit code: 0 on success, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Base and head, when the run got as far as resolving them.
    pub fn refs(&self) -> Option<(&CommitRef, &CommitRef)> {
        match self {
            Outcome::CheckOnly { base, head, .. }
            | Outcome::MergeBlocked { base, head, .. }
            | Outcome::ForbiddenMerge { base, head, .. }
            | Outcome::MergeSucceeded { base, head, .. }
            | Outcome::MergeFailed { base, head, .. } => Some((base, head)),
            Outcome::Aborted { .. } => None,
        }
    }
}
