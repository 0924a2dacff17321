//! End-to-end scenarios for the engine: real repositories, real `git`
//! transport, and a MockForge standing in for the hosting service.

mod common;

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::json;

use common::{run_git, World, REPOSITORY};
use fast_forward::core::config::{Config, MergeStrategy, MessageStyle};
use fast_forward::core::types::{BranchName, Oid, RefName};
use fast_forward::engine::{AncestryResult, FailureKind, Outcome, Run, Runner, Stage};
use fast_forward::event::EventContext;
use fast_forward::forge::mock::{FailOn, MockForge, MockOperation};
use fast_forward::forge::{ForgeError, ForgeUser};
use fast_forward::git::{GitCli, PushOutcome, Transport, TransportError};
use fast_forward::ui::report::render;

/// An issue comment by `login` on pull request #1.
fn comment_event(login: &str) -> EventContext {
    let payload = json!({
        "issue": {
            "number": 1,
            "html_url": format!("https://github.com/{}/pull/1", REPOSITORY),
            "pull_request": { "url": "https://api.github.com/repos/octocat/hello/pulls/1" }
        },
        "comment": {
            "html_url": format!("https://github.com/{}/pull/1#issuecomment-42", REPOSITORY),
            "user": { "login": login, "id": 1001 }
        },
        "sender": { "login": login, "id": 1001 },
        "repository": { "full_name": REPOSITORY }
    });
    EventContext::from_payload("issue_comment", &payload, None).unwrap()
}

/// main <- feature, one commit ahead.
fn linear_world() -> World {
    let world = World::new();
    world.branch("feature");
    world.commit("feature.txt", "Add feature");
    world.push("feature");
    world
}

/// main and feature each have a commit the other lacks.
fn diverged_world() -> World {
    let world = linear_world();
    world.checkout("main");
    world.commit("hotfix.txt", "Hotfix on main");
    world.push("main");
    world
}

fn merging() -> Config {
    Config {
        merge: true,
        ..Config::default()
    }
}

async fn run_with(
    world: &World,
    transport: &dyn Transport,
    forge: &MockForge,
    config: &Config,
    login: &str,
) -> Run {
    let git = world.git();
    Runner::new(&git, transport, forge, config)
        .run(&comment_event(login))
        .await
}

async fn run(world: &World, forge: &MockForge, config: &Config, login: &str) -> Run {
    run_with(world, &world.transport(), forge, config, login).await
}

fn permission_asked(forge: &MockForge) -> bool {
    forge
        .operations()
        .iter()
        .any(|op| matches!(op, MockOperation::Permission { .. }))
}

// =============================================================================
// Check only
// =============================================================================

#[tokio::test]
async fn check_only_reports_fast_forward_possible() {
    let world = linear_world();
    let before = world.remote_sha("main");
    let forge = MockForge::new().with_pr(world.pull_request(1, "main", "feature"));

    let run = run(&world, &forge, &Config::default(), "alice").await;

    match &run.outcome {
        Outcome::CheckOnly { ancestry, head, .. } => {
            assert_eq!(*ancestry, AncestryResult::IsAncestor);
            assert_eq!(head.oid, world.remote_sha("feature"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(run.outcome.exit_code(), 0);
    assert_eq!(world.remote_sha("main"), before);
    // No permission query without a mutation.
    assert!(!permission_asked(&forge));

    let markdown = render(&run.outcome, &run.context).to_markdown();
    assert!(markdown.contains("Triggered by @alice"));
    assert!(markdown.contains("Add feature"));
}

#[tokio::test]
async fn check_only_diverged_fails_with_listing() {
    let world = diverged_world();
    let forge = MockForge::new().with_pr(world.pull_request(1, "main", "feature"));

    let run = run(&world, &forge, &Config::default(), "alice").await;

    assert_eq!(run.outcome.exit_code(), 1);
    let markdown = render(&run.outcome, &run.context).to_markdown();
    assert!(markdown.contains("Hotfix on main"));
    assert!(markdown.contains("Add feature"));
    assert!(markdown.contains("git push --force-with-lease"));
}

// =============================================================================
// Merging
// =============================================================================

#[tokio::test]
async fn check_only_rerun_gives_the_same_report() {
    for world in [linear_world(), diverged_world()] {
        let forge = MockForge::new().with_pr(world.pull_request(1, "main", "feature"));

        let first = run(&world, &forge, &Config::default(), "alice").await;
        let second = run(&world, &forge, &Config::default(), "alice").await;

        assert_eq!(first.outcome, second.outcome);
        assert_eq!(
            render(&first.outcome, &first.context).to_markdown(),
            render(&second.outcome, &second.context).to_markdown()
        );
        assert_eq!(first.outcome.exit_code(), second.outcome.exit_code());
    }
}

#[tokio::test]
async fn writer_fast_forwards_base() {
    let world = linear_world();
    let head = world.remote_sha("feature");
    let forge = MockForge::new()
        .with_pr(world.pull_request(1, "main", "feature"))
        .with_permission("alice", "write");

    let run = run(&world, &forge, &merging(), "alice").await;

    match &run.outcome {
        Outcome::MergeSucceeded { applied, mutation, .. } => {
            assert!(applied.moved);
            assert_eq!(applied.new_base, head);
            assert_eq!(mutation.merge_commit, None);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(world.remote_sha("main"), head);
    assert_eq!(run.outcome.exit_code(), 0);

    let markdown = render(&run.outcome, &run.context).to_markdown();
    assert!(markdown.contains("**After**"));
}

#[tokio::test]
async fn diverged_merge_is_blocked_without_asking() {
    let world = diverged_world();
    let before = world.remote_sha("main");
    let forge = MockForge::new()
        .with_pr(world.pull_request(1, "main", "feature"))
        .with_permission("alice", "admin");

    let run = run(&world, &forge, &merging(), "alice").await;

    assert!(matches!(run.outcome, Outcome::MergeBlocked { .. }));
    assert_eq!(world.remote_sha("main"), before);
    assert!(!permission_asked(&forge));
}

#[tokio::test]
async fn reader_is_forbidden() {
    let world = linear_world();
    let before = world.remote_sha("main");
    let forge = MockForge::new()
        .with_pr(world.pull_request(1, "main", "feature"))
        .with_permission("mallory", "read");

    let run = run(&world, &forge, &merging(), "mallory").await;

    match &run.outcome {
        Outcome::ForbiddenMerge { decision, .. } => assert_eq!(decision.login, "mallory"),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(world.remote_sha("main"), before);
    let markdown = render(&run.outcome, &run.context).to_markdown();
    assert!(markdown.contains("@mallory"));
}

#[tokio::test]
async fn permission_error_fails_closed() {
    let world = linear_world();
    let before = world.remote_sha("main");
    let forge = MockForge::new()
        .with_pr(world.pull_request(1, "main", "feature"))
        .with_permission("alice", "admin")
        .fail_on(FailOn::Permission(ForgeError::Timeout));

    let run = run(&world, &forge, &merging(), "alice").await;

    assert!(matches!(run.outcome, Outcome::ForbiddenMerge { .. }));
    assert_eq!(world.remote_sha("main"), before);
}

#[tokio::test]
async fn rerun_after_success_is_a_noop() {
    let world = linear_world();
    let forge = MockForge::new()
        .with_pr(world.pull_request(1, "main", "feature"))
        .with_permission("alice", "write");

    let first = run(&world, &forge, &merging(), "alice").await;
    assert!(first.outcome.is_success());
    let after_first = world.remote_sha("main");

    let second = run(&world, &forge, &merging(), "alice").await;
    match &second.outcome {
        Outcome::MergeSucceeded { applied, .. } => assert!(!applied.moved),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(world.remote_sha("main"), after_first);
}

#[tokio::test]
async fn head_is_pinned_to_recorded_sha() {
    let world = linear_world();
    let recorded = world.pull_request(1, "main", "feature");
    let pinned = recorded.head.sha.clone();

    // The author pushes again after the comment was made.
    world.commit("late.txt", "Late change");
    world.push("feature");

    let forge = MockForge::new()
        .with_pr(recorded)
        .with_permission("alice", "write");
    let run = run(&world, &forge, &merging(), "alice").await;

    assert!(run.outcome.is_success());
    assert_eq!(world.remote_sha("main"), pinned);
}

#[tokio::test]
async fn merge_commit_strategy() {
    let world = linear_world();
    let base = world.remote_sha("main");
    let head = world.remote_sha("feature");
    let forge = MockForge::new()
        .with_pr(world.pull_request(1, "main", "feature"))
        .with_permission("alice", "write")
        .with_user(ForgeUser {
            login: "alice".into(),
            id: 1001,
            name: Some("Alice Liddell".into()),
        });
    let config = Config {
        merge: true,
        merge_strategy: MergeStrategy::MergeCommit,
        merge_commit_message_style: MessageStyle::PrTitle,
        ..Config::default()
    };

    let run = run(&world, &forge, &config, "alice").await;

    let merge = match &run.outcome {
        Outcome::MergeSucceeded { mutation, .. } => mutation.merge_commit.clone().unwrap(),
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(world.remote_sha("main"), merge);
    assert_eq!(
        world.remote_parents(&merge),
        vec![base.to_string(), head.to_string()]
    );

    let author = run_git(&world.remote, &["log", "-1", "--format=%an <%ae>", merge.as_str()]);
    assert_eq!(author, "Alice Liddell <1001+alice@users.noreply.github.com>");
    let message = run_git(&world.remote, &["log", "-1", "--format=%B", merge.as_str()]);
    assert!(message.starts_with("Merge feature\n\nMerge pull request #1 from octocat/feature"));
}

// =============================================================================
// Failures
// =============================================================================

/// Moves the remote base branch right before delegating the push.
struct RacingTransport {
    inner: GitCli,
    work: PathBuf,
}

#[async_trait]
impl Transport for RacingTransport {
    async fn fetch(
        &self,
        url: &str,
        branch: &BranchName,
        into: &RefName,
    ) -> Result<(), TransportError> {
        self.inner.fetch(url, branch, into).await
    }

    async fn push_cas(
        &self,
        url: &str,
        refname: &RefName,
        new: &Oid,
        expected: &Oid,
    ) -> Result<PushOutcome, TransportError> {
        run_git(&self.work, &["checkout", "-q", "main"]);
        std::fs::write(self.work.join("race.txt"), "race").unwrap();
        run_git(&self.work, &["add", "race.txt"]);
        run_git(&self.work, &["commit", "-q", "-m", "Concurrent push"]);
        run_git(&self.work, &["push", "-q", "origin", "main"]);
        self.inner.push_cas(url, refname, new, expected).await
    }
}

#[tokio::test]
async fn lost_race_is_a_conflict_and_not_retried() {
    let world = linear_world();
    let forge = MockForge::new()
        .with_pr(world.pull_request(1, "main", "feature"))
        .with_permission("alice", "write");
    world.git();
    let transport = RacingTransport {
        inner: world.transport(),
        work: world.work.clone(),
    };

    let run = run_with(&world, &transport, &forge, &merging(), "alice").await;

    match &run.outcome {
        Outcome::MergeFailed { kind, reason, .. } => {
            assert_eq!(*kind, FailureKind::Conflict);
            assert!(reason.contains("stale info"), "reason: {}", reason);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    let summary = run_git(&world.remote, &["log", "-1", "--format=%s", "refs/heads/main"]);
    assert_eq!(summary, "Concurrent push");
    assert_eq!(run.outcome.exit_code(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn hook_refusal_is_not_reported_as_a_race() {
    let world = linear_world();
    let before = world.remote_sha("main");
    world.decline_pushes("protected branch hook declined");
    let forge = MockForge::new()
        .with_pr(world.pull_request(1, "main", "feature"))
        .with_permission("alice", "write");

    let run = run(&world, &forge, &merging(), "alice").await;

    match &run.outcome {
        Outcome::MergeFailed { kind, reason, .. } => {
            assert_eq!(*kind, FailureKind::Refused);
            assert!(reason.contains("pre-receive hook declined"), "reason: {}", reason);
            assert!(reason.contains("protected branch hook declined"), "reason: {}", reason);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(world.remote_sha("main"), before);
    assert_eq!(run.outcome.exit_code(), 1);

    let markdown = render(&run.outcome, &run.context).to_markdown();
    assert!(markdown.contains("the remote refused the update"));
    assert!(!markdown.contains("moved after it was checked"));
}

#[tokio::test]
async fn unknown_pull_request_aborts() {
    let world = linear_world();
    let forge = MockForge::new();

    let run = run(&world, &forge, &merging(), "alice").await;

    match &run.outcome {
        Outcome::Aborted { stage, .. } => assert_eq!(*stage, Stage::PullRequest),
        other => panic!("unexpected outcome {:?}", other),
    }
    let markdown = render(&run.outcome, &run.context).to_markdown();
    assert!(markdown.contains("Triggered by @alice"));
}

#[tokio::test]
async fn deleted_head_branch_aborts_resolution() {
    let world = linear_world();
    let mut pr = world.pull_request(1, "main", "feature");
    pr.head.branch = BranchName::new("gone").unwrap();
    pr.head.sha = Oid::new("0123456789abcdef0123456789abcdef01234567").unwrap();
    let forge = MockForge::new().with_pr(pr);

    let run = run(&world, &forge, &Config::default(), "alice").await;

    match &run.outcome {
        Outcome::Aborted { stage, .. } => assert_eq!(*stage, Stage::Resolving),
        other => panic!("unexpected outcome {:?}", other),
    }
}
