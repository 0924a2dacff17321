//! event
//!
//! Extraction of the triggering event's context.
//!
//! # Supported Events
//!
//! - `issue_comment` on a pull request (the PR itself is fetched later)
//! - `pull_request` and `pull_request_target` (the PR is embedded)
//!
//! # Field Lookup
//!
//! The same fact lives in different places depending on the event, e.g. the
//! acting login is `comment.user.login` for comments but `sender.login` for
//! pull request events. Each field is described by an ordered list of JSON
//! pointers; the first one that yields a non-null value wins.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::forge::github::pull_request_from_json;
use crate::forge::{Forge, ForgeError, PullRequest};

/// Errors from reading the event context.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("failed to read event file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("event payload is not valid JSON: {0}")]
    Parse(String),

    #[error("unsupported event '{0}' (expected issue_comment, pull_request, or pull_request_target)")]
    UnsupportedEvent(String),

    #[error("the comment was made on an issue, not a pull request")]
    NotAPullRequest,

    #[error("event payload has no {0}")]
    MissingField(&'static str),

    #[error("embedded pull request is unusable: {0}")]
    Malformed(#[from] ForgeError),
}

/// The kind of event that started the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    IssueComment,
    PullRequest,
    PullRequestTarget,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::IssueComment => "issue_comment",
            EventKind::PullRequest => "pull_request",
            EventKind::PullRequestTarget => "pull_request_target",
        }
    }
}

impl FromStr for EventKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "issue_comment" => Ok(EventKind::IssueComment),
            "pull_request" => Ok(EventKind::PullRequest),
            "pull_request_target" => Ok(EventKind::PullRequestTarget),
            other => Err(EventError::UnsupportedEvent(other.to_string())),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who triggered the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub login: String,
    /// Numeric account id, when the payload carries it
    pub id: Option<u64>,
}

/// Everything the run needs to know about the event.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub kind: EventKind,
    pub actor: Actor,
    /// Link to the comment or pull request that triggered the run
    pub trigger_url: Option<String>,
    pub pr_number: u64,
    /// `owner/name` of the repository the workflow runs in
    pub repository: String,
    /// Pull request as embedded in the payload, if it was
    pub embedded_pr: Option<PullRequest>,
}

/// Candidate JSON pointers for one field, in priority order.
type Lookup = &'static [&'static str];

/// User objects; login and id are both read from the first one with a login.
const ACTOR: Lookup = &["/comment/user", "/sender", "/pull_request/user"];
const TRIGGER_URL: Lookup = &["/comment/html_url", "/pull_request/html_url", "/issue/html_url"];
const PR_NUMBER: Lookup = &["/issue/number", "/pull_request/number", "/number"];
const REPOSITORY: Lookup = &["/repository/full_name"];

/// The first candidate that is present and not null.
fn first_present<'a>(payload: &'a Value, lookup: Lookup) -> Option<&'a Value> {
    lookup
        .iter()
        .find_map(|pointer| payload.pointer(pointer).filter(|v| !v.is_null()))
}

fn first_str(payload: &Value, lookup: Lookup) -> Option<String> {
    first_present(payload, lookup)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_u64(payload: &Value, lookup: Lookup) -> Option<u64> {
    first_present(payload, lookup).and_then(Value::as_u64)
}

fn actor(payload: &Value) -> Option<Actor> {
    ACTOR.iter().find_map(|pointer| {
        let user = payload.pointer(pointer)?;
        let login = user.get("login")?.as_str().filter(|s| !s.is_empty())?;
        Some(Actor {
            login: login.to_string(),
            id: user.get("id").and_then(Value::as_u64),
        })
    })
}

impl EventContext {
    /// Read and interpret the event file the runner provides.
    pub fn from_path(
        event_name: &str,
        path: &Path,
        fallback_repository: Option<&str>,
    ) -> Result<Self, EventError> {
        let contents = std::fs::read_to_string(path).map_err(|e| EventError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let payload: Value =
            serde_json::from_str(&contents).map_err(|e| EventError::Parse(e.to_string()))?;
        Self::from_payload(event_name, &payload, fallback_repository)
    }

    /// Interpret an already-parsed payload.
    ///
    /// `fallback_repository` (usually `$GITHUB_REPOSITORY`) is used when the
    /// payload does not name its repository.
    pub fn from_payload(
        event_name: &str,
        payload: &Value,
        fallback_repository: Option<&str>,
    ) -> Result<Self, EventError> {
        let kind: EventKind = event_name.parse()?;

        if kind == EventKind::IssueComment && payload.pointer("/issue/pull_request").is_none() {
            return Err(EventError::NotAPullRequest);
        }

        let actor = actor(payload).ok_or(EventError::MissingField("sender login"))?;
        let pr_number =
            first_u64(payload, PR_NUMBER).ok_or(EventError::MissingField("pull request number"))?;
        let repository = first_str(payload, REPOSITORY)
            .or_else(|| {
                fallback_repository
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
            })
            .ok_or(EventError::MissingField("repository"))?;

        let embedded_pr = match (kind, payload.get("pull_request")) {
            (EventKind::IssueComment, _) => None,
            (_, Some(pr)) => Some(pull_request_from_json(pr)?),
            (_, None) => return Err(EventError::MissingField("pull_request")),
        };

        let context = Self {
            kind,
            actor,
            trigger_url: first_str(payload, TRIGGER_URL),
            pr_number,
            repository,
            embedded_pr,
        };
        debug!(
            event = %context.kind,
            actor = %context.actor.login,
            pr = context.pr_number,
            "event context"
        );
        Ok(context)
    }

    /// The pull request: embedded if the payload had it, otherwise fetched.
    pub async fn pull_request(&self, forge: &dyn Forge) -> Result<PullRequest, ForgeError> {
        match &self.embedded_pr {
            Some(pr) => Ok(pr.clone()),
            None => forge.get_pr(self.pr_number).await,
        }
    }
}
