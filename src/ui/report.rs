//! ui::report
//!
//! Pure rendering of an [`Outcome`] into a Markdown report.
//!
//! # Design
//!
//! [`render`] takes immutable inputs and has no side effects. Everything it
//! needs beyond the outcome (who triggered the run, commit summaries) comes
//! in a [`ReportContext`] that the runner gathers beforehand. Anything
//! missing from the context only drops the corresponding detail.
//!
//! # Example Output
//!
//! ```markdown
//! <!-- fast-forward:report -->
//! Triggered by @alice ([link](https://github.com/o/r/pull/7#issuecomment-1)) on #7 *Add greeting*.
//!
//! **Before**
//! - base `main`: `1a2b3c4` Initial commit
//! - head `feature`: `5d6e7f8` Add greeting
//!
//! `main` can be fast-forwarded to `5d6e7f8`.
//! ```

use std::collections::HashMap;

use serde::Serialize;

use crate::core::types::{CommitRef, Oid};
use crate::engine::ancestry::{AncestryResult, Divergence};
use crate::engine::outcome::{FailureKind, Outcome};
use crate::git::CommitRange;

/// Marker identifying comments written by this tool.
pub const REPORT_MARKER: &str = "<!-- fast-forward:report -->";

/// Abbreviation length for commit ids in reports.
const SHORT: usize = 7;

/// The pull request, as far as the report cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrSummary {
    pub number: u64,
    pub title: String,
    pub url: String,
}

/// Everything the report shows besides the outcome itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportContext {
    /// Login of whoever triggered the run
    pub actor: Option<String>,
    /// Comment or pull request link
    pub trigger_url: Option<String>,
    pub pr: Option<PrSummary>,
    /// `owner/name` of the base repository
    pub repository: Option<String>,
    /// One-line commit summaries that could be read
    pub summaries: HashMap<Oid, String>,
}

/// One block of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub text: String,
}

/// What a section is about, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Trigger,
    Before,
    Decision,
    Divergence,
    Remediation,
    After,
}

/// A rendered report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub sections: Vec<Section>,
    /// Machine-readable success flag
    pub success: bool,
}

/// The `{"body": ...}` envelope written to the output value.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub body: &'a str,
}

impl Report {
    /// The full Markdown text.
    pub fn to_markdown(&self) -> String {
        let body: Vec<&str> = self.sections.iter().map(|s| s.text.as_str()).collect();
        format!("{}\n{}", REPORT_MARKER, body.join("\n\n"))
    }

    /// The markdown wrapped in the one-field envelope, as JSON.
    pub fn envelope_json(&self) -> String {
        let body = self.to_markdown();
        serde_json::to_string(&Envelope { body: &body })
            .unwrap_or_else(|_| String::from("{\"body\":\"\"}"))
    }

    fn push(&mut self, kind: SectionKind, text: String) {
        self.sections.push(Section { kind, text });
    }
}

/// Render `outcome` into a report.
pub fn render(outcome: &Outcome, ctx: &ReportContext) -> Report {
    let mut report = Report {
        sections: Vec::new(),
        success: outcome.is_success(),
    };

    if let Some(trigger) = trigger_line(ctx) {
        report.push(SectionKind::Trigger, trigger);
    }

    if let Some((base, head)) = outcome.refs() {
        report.push(
            SectionKind::Before,
            [
                "**Before**".to_string(),
                format!("- base {}", describe(base, ctx)),
                format!("- head {}", describe(head, ctx)),
            ]
            .join("\n"),
        );
    }

    match outcome {
        Outcome::CheckOnly {
            base,
            head,
            ancestry,
        } => {
            if ancestry.can_fast_forward() {
                report.push(SectionKind::Decision, fast_forward_possible(base, head));
            } else {
                push_not_possible(&mut report, base, head, ancestry, ctx);
            }
        }
        Outcome::MergeBlocked {
            base,
            head,
            ancestry,
        } => {
            push_not_possible(&mut report, base, head, ancestry, ctx);
        }
        Outcome::ForbiddenMerge { base, decision, .. } => {
            let repo = ctx
                .repository
                .as_deref()
                .map(|r| format!(" `{}`", r))
                .unwrap_or_default();
            let mut text = format!(
                "Sorry @{}, you don't have permission to push to{}, so `{}` was not changed.",
                decision.login, repo, base.name
            );
            if let Some(error) = &decision.error {
                text.push_str(&format!(
                    "\n\nThe permission check failed ({}), which counts as no permission.",
                    error
                ));
            }
            report.push(SectionKind::Decision, text);
        }
        Outcome::MergeSucceeded {
            base,
            mutation,
            applied,
            ..
        } => {
            let text = if !applied.moved && mutation.is_noop() {
                format!(
                    "`{}` already points at `{}`; nothing to do.",
                    base.name,
                    applied.new_base.short(SHORT)
                )
            } else if let Some(merge) = &mutation.merge_commit {
                format!(
                    "`{}` was advanced to merge commit `{}`.",
                    base.name,
                    merge.short(SHORT)
                )
            } else {
                format!(
                    "`{}` was fast-forwarded to `{}`.",
                    base.name,
                    applied.new_base.short(SHORT)
                )
            };
            report.push(SectionKind::Decision, text);
            report.push(
                SectionKind::After,
                [
                    "**After**".to_string(),
                    format!(
                        "- base {}",
                        describe(
                            &CommitRef {
                                name: base.name.clone(),
                                oid: applied.new_base.clone(),
                            },
                            ctx
                        )
                    ),
                ]
                .join("\n"),
            );
        }
        Outcome::MergeFailed { base, reason, kind, .. } => {
            let (lead, remediation) = match kind {
                FailureKind::Conflict => (
                    format!(
                        "Updating `{}` failed: the remote rejected the update because `{}` moved after it was checked.",
                        base.name, base.name
                    ),
                    "Nothing was overwritten. Trigger the fast-forward again to retry.".to_string(),
                ),
                FailureKind::Refused => (
                    format!(
                        "Updating `{}` failed: the remote refused the update.",
                        base.name
                    ),
                    format!(
                        "Nothing was changed. Check the hooks and branch protection rules for `{}`; retrying will not help until they allow the push.",
                        base.name
                    ),
                ),
                FailureKind::Error => (
                    format!("Updating `{}` failed.", base.name),
                    "Nothing was overwritten. Trigger the fast-forward again to retry.".to_string(),
                ),
            };
            report.push(
                SectionKind::Decision,
                format!("{}\n\n```\n{}\n```", lead, reason.trim_end()),
            );
            report.push(SectionKind::Remediation, remediation);
        }
        Outcome::Aborted { stage, reason } => {
            report.push(
                SectionKind::Decision,
                format!("Failed while {}:\n\n```\n{}\n```", stage, reason.trim_end()),
            );
        }
    }

    report
}

fn trigger_line(ctx: &ReportContext) -> Option<String> {
    let actor = ctx.actor.as_deref()?;
    let mut line = format!("Triggered by @{}", actor);
    let url = ctx
        .trigger_url
        .as_deref()
        .or_else(|| ctx.pr.as_ref().map(|pr| pr.url.as_str()));
    if let Some(url) = url {
        line.push_str(&format!(" ([link]({}))", url));
    }
    if let Some(pr) = &ctx.pr {
        line.push_str(&format!(" on #{}", pr.number));
        if !pr.title.trim().is_empty() {
            line.push_str(&format!(" *{}*", pr.title.trim()));
        }
    }
    line.push('.');
    Some(line)
}

/// `` `name`: `abc1234` summary``, the summary omitted when unknown.
fn describe(commit: &CommitRef, ctx: &ReportContext) -> String {
    let mut line = format!("`{}`: `{}`", commit.name, commit.oid.short(SHORT));
    if let Some(summary) = ctx.summaries.get(&commit.oid) {
        line.push(' ');
        line.push_str(summary);
    }
    line
}

fn fast_forward_possible(base: &CommitRef, head: &CommitRef) -> String {
    if base.oid == head.oid {
        format!(
            "`{}` already points at `{}`; a fast-forward is trivially possible.",
            base.name,
            head.oid.short(SHORT)
        )
    } else {
        format!(
            "`{}` can be fast-forwarded to `{}`.",
            base.name,
            head.oid.short(SHORT)
        )
    }
}

fn push_not_possible(
    report: &mut Report,
    base: &CommitRef,
    head: &CommitRef,
    ancestry: &AncestryResult,
    ctx: &ReportContext,
) {
    match ancestry {
        AncestryResult::IsAncestor => {
            // Not reachable for blocked merges; keep the report coherent anyway.
            report.push(SectionKind::Decision, fast_forward_possible(base, head));
            return;
        }
        AncestryResult::Unrelated => {
            report.push(
                SectionKind::Decision,
                format!(
                    "Can't fast-forward: `{}` and `{}` share no history.",
                    base.name, head.name
                ),
            );
        }
        AncestryResult::Diverged(divergence) => {
            let mut text = format!(
                "Can't fast-forward: `{}` is not an ancestor of `{}`. The branches diverged at `{}`",
                base.name,
                head.name,
                divergence.merge_base.short(SHORT)
            );
            if let Some(summary) = ctx.summaries.get(&divergence.merge_base) {
                text.push_str(&format!(" ({})", summary));
            }
            text.push('.');
            report.push(SectionKind::Decision, text);
            report.push(SectionKind::Divergence, divergence_listing(base, head, divergence));
        }
    }

    report.push(
        SectionKind::Remediation,
        [
            format!(
                "To fix this, rebase `{}` onto `{}` and force-push:",
                head.name, base.name
            ),
            String::new(),
            "```".to_string(),
            format!("git fetch origin {}", base.name),
            format!("git rebase origin/{} {}", base.name, head.name),
            format!("git push --force-with-lease origin {}", head.name),
            "```".to_string(),
        ]
        .join("\n"),
    );
}

fn divergence_listing(base: &CommitRef, head: &CommitRef, divergence: &Divergence) -> String {
    let mut lines = Vec::new();
    list_side(&mut lines, &base.name.to_string(), &head.name.to_string(), &divergence.base_only);
    lines.push(String::new());
    list_side(&mut lines, &head.name.to_string(), &base.name.to_string(), &divergence.head_only);
    lines.join("\n")
}

fn list_side(lines: &mut Vec<String>, owner: &str, other: &str, range: &CommitRange) {
    lines.push(format!(
        "`{}` has {} that `{}` lacks:",
        owner,
        plural(range.total, "commit"),
        other
    ));
    for commit in &range.commits {
        lines.push(format!("- `{}` {}", commit.oid.short(SHORT), commit.summary));
    }
    if range.omitted() > 0 {
        lines.push(format!("- ... and {} more (truncated)", range.omitted()));
    }
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", n, noun)
    }
}
