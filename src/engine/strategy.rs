//! engine::strategy
//!
//! Merge Strategy Selector: turns a granted merge into exactly one ref update.
//!
//! - `fast-forward`: move base to head's commit
//! - `merge-commit`: write a commit with head's tree and parents
//!   `[base, head]`, then move base to it
//!
//! Either way the result is a [`Mutation`] whose `expected` value is the base
//! commit observed at resolution; the executor uses it as the lease.

use tracing::info;

use crate::core::config::{MergeStrategy, MessageStyle};
use crate::core::types::{CommitRef, Oid, RefName};
use crate::forge::PullRequest;
use crate::git::{Git, GitError, Signature};

/// The single ref update a run may apply to the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    /// Remote ref to move (`refs/heads/<base>`)
    pub refname: RefName,
    /// Value the remote ref must still have
    pub expected: Oid,
    /// Value to move it to
    pub target: Oid,
    pub strategy: MergeStrategy,
    /// The synthesized commit, for `merge-commit`
    pub merge_commit: Option<Oid>,
}

impl Mutation {
    /// True when the remote already has the target.
    pub fn is_noop(&self) -> bool {
        self.target == self.expected
    }
}

/// Author identity for a synthesized merge commit.
///
/// The address follows the hosting service's private-email convention,
/// `{id}+{login}@{domain}`, or `{login}@{domain}` when the id is unknown.
pub fn merge_author(login: &str, id: Option<u64>, display_name: Option<&str>, domain: &str) -> Signature {
    let email = match id {
        Some(id) => format!("{}+{}@{}", id, login, domain),
        None => format!("{}@{}", login, domain),
    };
    Signature {
        name: display_name.unwrap_or(login).to_string(),
        email,
    }
}

/// Build the merge commit message for `pr`.
///
/// # Example
///
/// ```ignore
/// // default:
/// // Merge pull request #7 from alice/feature
/// //
/// // https://github.com/octocat/hello/pull/7
/// ```
pub fn merge_message(style: MessageStyle, pr: &PullRequest) -> String {
    let owner = pr
        .head
        .repo_full_name
        .split_once('/')
        .map(|(owner, _)| owner)
        .unwrap_or(&pr.head.repo_full_name);
    let references = format!(
        "Merge pull request #{} from {}/{}\n\n{}",
        pr.number, owner, pr.head.branch, pr.url
    );
    let title = pr.title.trim();

    match style {
        MessageStyle::Default => format!("{}\n", references),
        MessageStyle::PrTitle => format!("{}\n\n{}\n", title, references),
        MessageStyle::PrTitleAndBody => match pr.body.as_deref().filter(|b| !b.trim().is_empty()) {
            Some(body) => format!("{}\n\n{}\n\n{}\n", title, references, body.trim_end()),
            None => format!("{}\n\n{}\n", title, references),
        },
    }
}

/// Choose and prepare the mutation for `strategy`.
///
/// Writes the merge commit object locally when one is needed; never touches
/// any ref.
pub fn select(
    git: &Git,
    strategy: MergeStrategy,
    style: MessageStyle,
    base: &CommitRef,
    head: &CommitRef,
    pr: &PullRequest,
    author: &Signature,
) -> Result<Mutation, GitError> {
    let refname = RefName::for_branch(&base.name);

    let (target, merge_commit) = match strategy {
        // A merge of a commit with itself would be an empty merge
        MergeStrategy::MergeCommit if base.oid != head.oid => {
            let message = merge_message(style, pr);
            let merge = git.create_merge_commit(&base.oid, &head.oid, author, &message)?;
            info!(sha = %merge, "created merge commit");
            (merge.clone(), Some(merge))
        }
        _ => (head.oid.clone(), None),
    };

    Ok(Mutation {
        refname,
        expected: base.oid.clone(),
        target,
        strategy,
        merge_commit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BranchName;
    use crate::forge::PrSide;

    fn pr(body: Option<&str>) -> PullRequest {
        let side = |branch: &str, repo: &str, sha: char| PrSide {
            branch: BranchName::new(branch).unwrap(),
            sha: Oid::new(sha.to_string().repeat(40)).unwrap(),
            repo_full_name: repo.into(),
            clone_url: format!("https://github.com/{}.git", repo),
        };
        PullRequest {
            number: 7,
            title: "Add greeting ".into(),
            body: body.map(str::to_string),
            url: "https://github.com/octocat/hello/pull/7".into(),
            author: "alice".into(),
            base: side("main", "octocat/hello", 'a'),
            head: side("feature", "alice/hello", 'b'),
        }
    }

    mod message {
        use super::*;

        #[test]
        fn default_style() {
            assert_eq!(
                merge_message(MessageStyle::Default, &pr(Some("ignored"))),
                "Merge pull request #7 from alice/feature\n\nhttps://github.com/octocat/hello/pull/7\n"
            );
        }

        #[test]
        fn title_style() {
            let message = merge_message(MessageStyle::PrTitle, &pr(Some("ignored")));
            assert!(message.starts_with("Add greeting\n\nMerge pull request #7"));
            assert!(!message.contains("ignored"));
        }

        #[test]
        fn title_and_body_keeps_body_verbatim() {
            let body = "Line one\n\n- bullet `code`\r\n";
            let message = merge_message(MessageStyle::PrTitleAndBody, &pr(Some(body)));
            assert!(message.starts_with("Add greeting\n\n"));
            assert!(message.contains("Merge pull request #7 from alice/feature"));
            assert!(message.contains("Line one\n\n- bullet `code`"));
        }

        #[test]
        fn title_and_body_without_body() {
            assert_eq!(
                merge_message(MessageStyle::PrTitleAndBody, &pr(None)),
                merge_message(MessageStyle::PrTitle, &pr(None))
            );
        }
    }

    mod author {
        use super::*;

        #[test]
        fn noreply_address_with_id() {
            let sig = merge_author("octocat", Some(583231), Some("The Octocat"), "users.noreply.github.com");
            assert_eq!(sig.name, "The Octocat");
            assert_eq!(sig.email, "583231+octocat@users.noreply.github.com");
        }

        #[test]
        fn login_only_without_id() {
            let sig = merge_author("octocat", None, None, "users.noreply.example.com");
            assert_eq!(sig.name, "octocat");
            assert_eq!(sig.email, "octocat@users.noreply.example.com");
        }
    }

    #[test]
    fn noop_when_target_equals_expected() {
        let oid = Oid::new("a".repeat(40)).unwrap();
        let mutation = Mutation {
            refname: RefName::new("refs/heads/main").unwrap(),
            expected: oid.clone(),
            target: oid,
            strategy: MergeStrategy::FastForward,
            merge_commit: None,
        };
        assert!(mutation.is_noop());
    }
}
