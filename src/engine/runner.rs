//! engine::runner
//!
//! One invocation, start to finish.
//!
//! ```text
//! PullRequest -> Resolve(base, head) -> Evaluate
//!     -> [check only] CheckOnly
//!     -> [not a fast-forward] MergeBlocked
//!     -> Authorize -> [denied] ForbiddenMerge
//!     -> Select -> Execute -> MergeSucceeded | MergeFailed
//! ```
//!
//! # Invariants
//!
//! - Every path ends in an [`Outcome`]; the runner itself never fails
//! - The permission check happens only when a mutation would follow, and
//!   always before it
//! - Base is resolved unpinned (its current value); head is pinned to the
//!   sha recorded on the pull request

use std::collections::HashMap;

use tracing::{debug, info, instrument, warn};

use super::ancestry::{evaluate, AncestryResult};
use super::exec::{execute, MutationError};
use super::gate::authorize;
use super::outcome::{FailureKind, Outcome, Stage};
use super::resolve::Resolver;
use super::strategy::{merge_author, select};
use crate::core::config::{Config, MergeStrategy};
use crate::core::types::{CommitRef, Oid, RepositoryEndpoint, Role};
use crate::event::{Actor, EventContext};
use crate::forge::{Forge, PullRequest};
use crate::git::{Git, Signature, Transport};
use crate::ui::report::{PrSummary, ReportContext};

/// The finished run: what happened plus what the report needs to say it.
#[derive(Debug)]
pub struct Run {
    pub outcome: Outcome,
    pub context: ReportContext,
}

/// Wires the engine stages to their collaborators.
pub struct Runner<'a> {
    git: &'a Git,
    transport: &'a dyn Transport,
    forge: &'a dyn Forge,
    config: &'a Config,
}

impl<'a> Runner<'a> {
    pub fn new(
        git: &'a Git,
        transport: &'a dyn Transport,
        forge: &'a dyn Forge,
        config: &'a Config,
    ) -> Self {
        Self {
            git,
            transport,
            forge,
            config,
        }
    }

    /// Run the whole decision for `event`.
    #[instrument(skip_all, fields(forge = self.forge.name(), pr = event.pr_number, actor = %event.actor.login))]
    pub async fn run(&self, event: &EventContext) -> Run {
        let mut context = ReportContext {
            actor: Some(event.actor.login.clone()),
            trigger_url: event.trigger_url.clone(),
            pr: None,
            repository: Some(event.repository.clone()),
            summaries: HashMap::new(),
        };

        let outcome = self.decide(event, &mut context).await;
        info!(success = outcome.is_success(), "run finished");
        context.summaries = self.summaries(&outcome);

        Run { outcome, context }
    }

    async fn decide(&self, event: &EventContext, context: &mut ReportContext) -> Outcome {
        let pr = match event.pull_request(self.forge).await {
            Ok(pr) => pr,
            Err(e) => return aborted(Stage::PullRequest, e),
        };
        context.pr = Some(PrSummary {
            number: pr.number,
            title: pr.title.clone(),
            url: pr.url.clone(),
        });

        let base_endpoint = pr.base.endpoint(false);
        let head_endpoint = pr.head.endpoint(true);

        let resolver = Resolver::new(self.git, self.transport);
        let base = match resolver.resolve(Role::Base, &base_endpoint).await {
            Ok(base) => base,
            Err(e) => return aborted(Stage::Resolving, e),
        };
        let head = match resolver.resolve(Role::Head, &head_endpoint).await {
            Ok(head) => head,
            Err(e) => return aborted(Stage::Resolving, e),
        };

        let ancestry = match evaluate(
            self.git,
            &base.oid,
            &head.oid,
            self.config.max_listed_commits,
        ) {
            Ok(ancestry) => ancestry,
            Err(e) => return aborted(Stage::Evaluating, e),
        };

        if !self.config.merge {
            return Outcome::CheckOnly {
                base,
                head,
                ancestry,
            };
        }
        if !ancestry.can_fast_forward() {
            return Outcome::MergeBlocked {
                base,
                head,
                ancestry,
            };
        }

        let decision = authorize(self.forge, &event.actor.login).await;
        if !decision.can_push {
            return Outcome::ForbiddenMerge {
                base,
                head,
                decision,
            };
        }

        self.merge(&event.actor, &pr, &base_endpoint, base, head)
            .await
    }

    async fn merge(
        &self,
        actor: &Actor,
        pr: &PullRequest,
        base_endpoint: &RepositoryEndpoint,
        base: CommitRef,
        head: CommitRef,
    ) -> Outcome {
        let author = self.author(actor).await;
        let mutation = match select(
            self.git,
            self.config.merge_strategy,
            self.config.merge_commit_message_style,
            &base,
            &head,
            pr,
            &author,
        ) {
            Ok(mutation) => mutation,
            Err(e) => {
                return Outcome::MergeFailed {
                    base,
                    head,
                    reason: e.to_string(),
                    kind: FailureKind::Error,
                }
            }
        };

        match execute(self.git, self.transport, base_endpoint, &mutation).await {
            Ok(applied) => Outcome::MergeSucceeded {
                base,
                head,
                mutation,
                applied,
            },
            Err(MutationError::Conflict { reason, .. }) => {
                warn!(%reason, "update rejected");
                Outcome::MergeFailed {
                    base,
                    head,
                    reason,
                    kind: FailureKind::Conflict,
                }
            }
            Err(MutationError::Refused { reason, .. }) => {
                warn!(%reason, "update refused");
                Outcome::MergeFailed {
                    base,
                    head,
                    reason,
                    kind: FailureKind::Refused,
                }
            }
            Err(e) => Outcome::MergeFailed {
                base,
                head,
                reason: e.to_string(),
                kind: FailureKind::Error,
            },
        }
    }

    /// Merge commit author. The display name and id are looked up only for
    /// merge commits, and a failed lookup falls back to the login.
    async fn author(&self, actor: &Actor) -> Signature {
        let domain = &self.config.noreply_domain;
        if self.config.merge_strategy != MergeStrategy::MergeCommit {
            return merge_author(&actor.login, actor.id, None, domain);
        }

        match self.forge.get_user(&actor.login).await {
            Ok(user) => merge_author(&user.login, Some(user.id), user.name.as_deref(), domain),
            Err(e) => {
                debug!(error = %e, "user lookup failed; using login only");
                merge_author(&actor.login, actor.id, None, domain)
            }
        }
    }

    /// Summaries for every commit the report may mention. Unreadable
    /// commits are skipped.
    fn summaries(&self, outcome: &Outcome) -> HashMap<Oid, String> {
        let mut oids: Vec<&Oid> = Vec::new();
        if let Some((base, head)) = outcome.refs() {
            oids.push(&base.oid);
            oids.push(&head.oid);
        }
        match outcome {
            Outcome::CheckOnly {
                ancestry: AncestryResult::Diverged(divergence),
                ..
            }
            | Outcome::MergeBlocked {
                ancestry: AncestryResult::Diverged(divergence),
                ..
            } => oids.push(&divergence.merge_base),
            Outcome::MergeSucceeded { applied, .. } => oids.push(&applied.new_base),
            _ => {}
        }

        let mut summaries = HashMap::new();
        for oid in oids {
            match self.git.commit_info(oid) {
                Ok(info) => {
                    summaries.insert(oid.clone(), info.summary);
                }
                Err(e) => debug!(sha = %oid, error = %e, "no summary"),
            }
        }
        summaries
    }
}

fn aborted(stage: Stage, error: impl std::fmt::Display) -> Outcome {
    warn!(%stage, error = %error, "aborted");
    Outcome::Aborted {
        stage,
        reason: error.to_string(),
    }
}
