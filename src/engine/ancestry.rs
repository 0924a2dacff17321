//! engine::ancestry
//!
//! Ancestry Evaluator: decides whether base can be fast-forwarded to head.
//!
//! # Decision
//!
//! - `base == head`, or `base` reachable from `head`: [`AncestryResult::IsAncestor`]
//! - otherwise, with a merge base: [`AncestryResult::Diverged`], listing what
//!   each side has that the other lacks since that merge base
//! - otherwise: [`AncestryResult::Unrelated`]; no listing is attempted
//!
//! Listings are newest first and bounded; [`CommitRange::omitted`] says how
//! many entries were dropped.

use tracing::debug;

use crate::core::types::Oid;
use crate::git::{CommitRange, Git, GitError};

/// Outcome of comparing base and head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AncestryResult {
    /// Base is head or one of its ancestors; a fast-forward is possible.
    IsAncestor,
    /// Both sides advanced from a common ancestor.
    Diverged(Divergence),
    /// The histories share no commit.
    Unrelated,
}

impl AncestryResult {
    pub fn can_fast_forward(&self) -> bool {
        matches!(self, AncestryResult::IsAncestor)
    }
}

/// Where and how two histories split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    /// Lowest common ancestor of base and head
    pub merge_base: Oid,
    /// Commits on base that head lacks
    pub base_only: CommitRange,
    /// Commits on head that base lacks
    pub head_only: CommitRange,
}

/// Compare `base` and `head`, listing at most `limit` commits per side.
pub fn evaluate(git: &Git, base: &Oid, head: &Oid, limit: usize) -> Result<AncestryResult, GitError> {
    if git.is_ancestor(base, head)? {
        debug!(%base, %head, "base is an ancestor of head");
        return Ok(AncestryResult::IsAncestor);
    }

    let Some(merge_base) = git.merge_base(base, head)? else {
        debug!(%base, %head, "no common ancestor");
        return Ok(AncestryResult::Unrelated);
    };

    let base_only = git.commits_between(base, Some(&merge_base), limit)?;
    let head_only = git.commits_between(head, Some(&merge_base), limit)?;
    debug!(
        %merge_base,
        base_only = base_only.total,
        head_only = head_only.total,
        "histories diverged"
    );

    Ok(AncestryResult::Diverged(Divergence {
        merge_base,
        base_only,
        head_only,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    /// Non-bare repository driven through the git CLI.
    struct Repo {
        dir: tempfile::TempDir,
    }

    impl Repo {
        fn new() -> Self {
            let dir = tempfile::TempDir::new().unwrap();
            let repo = Self { dir };
            repo.run(&["init", "-q", "-b", "main"]);
            repo.run(&["config", "user.email", "test@example.com"]);
            repo.run(&["config", "user.name", "Test"]);
            repo
        }

        fn run(&self, args: &[&str]) -> String {
            let out = Command::new("git")
                .args(args)
                .current_dir(self.dir.path())
                .output()
                .unwrap();
            assert!(out.status.success(), "git {:?}: {}", args, String::from_utf8_lossy(&out.stderr));
            String::from_utf8_lossy(&out.stdout).trim().to_string()
        }

        fn commit(&self, name: &str) -> Oid {
            std::fs::write(self.dir.path().join(name), name).unwrap();
            self.run(&["add", name]);
            self.run(&["commit", "-q", "-m", name]);
            Oid::new(self.run(&["rev-parse", "HEAD"])).unwrap()
        }

        fn git(&self) -> Git {
            Git::open(self.dir.path()).unwrap()
        }
    }

    #[test]
    fn same_commit_is_ancestor() {
        let repo = Repo::new();
        let a = repo.commit("a");
        assert_eq!(
            evaluate(&repo.git(), &a, &a, 10).unwrap(),
            AncestryResult::IsAncestor
        );
    }

    #[test]
    fn linear_descendant_is_ancestor() {
        let repo = Repo::new();
        let b1 = repo.commit("b1");
        let h1 = repo.commit("h1");
        let result = evaluate(&repo.git(), &b1, &h1, 10).unwrap();
        assert!(result.can_fast_forward());
        // Reverse direction is a divergence with nothing on the head side.
        match evaluate(&repo.git(), &h1, &b1, 10).unwrap() {
            AncestryResult::Diverged(d) => {
                assert_eq!(d.merge_base, b1);
                assert_eq!(d.base_only.total, 1);
                assert_eq!(d.head_only.total, 0);
            }
            other => panic!("expected divergence, got {:?}", other),
        }
    }

    #[test]
    fn diverged_lists_each_side() {
        let repo = Repo::new();
        let m = repo.commit("m");
        repo.run(&["checkout", "-q", "-b", "feature"]);
        let h1 = repo.commit("h1");
        let h2 = repo.commit("h2");
        repo.run(&["checkout", "-q", "main"]);
        let b1 = repo.commit("b1");

        match evaluate(&repo.git(), &b1, &h2, 10).unwrap() {
            AncestryResult::Diverged(d) => {
                assert_eq!(d.merge_base, m);
                let base: Vec<_> = d.base_only.commits.iter().map(|c| c.oid.clone()).collect();
                let head: Vec<_> = d.head_only.commits.iter().map(|c| c.oid.clone()).collect();
                assert_eq!(base, vec![b1]);
                assert_eq!(head, vec![h2, h1]);
            }
            other => panic!("expected divergence, got {:?}", other),
        }
    }

    #[test]
    fn listings_are_bounded() {
        let repo = Repo::new();
        repo.commit("m");
        repo.run(&["checkout", "-q", "-b", "feature"]);
        let mut head = repo.commit("h0");
        for i in 1..5 {
            head = repo.commit(&format!("h{}", i));
        }
        repo.run(&["checkout", "-q", "main"]);
        let base = repo.commit("b1");

        match evaluate(&repo.git(), &base, &head, 2).unwrap() {
            AncestryResult::Diverged(d) => {
                assert_eq!(d.head_only.commits.len(), 2);
                assert_eq!(d.head_only.omitted(), 3);
                assert_eq!(d.head_only.commits[0].oid, head);
            }
            other => panic!("expected divergence, got {:?}", other),
        }
    }

    #[test]
    fn unrelated_histories() {
        let repo = Repo::new();
        let a = repo.commit("a");
        repo.run(&["checkout", "-q", "--orphan", "other"]);
        repo.run(&["rm", "-q", "-rf", "."]);
        let z = repo.commit("z");
        assert_eq!(
            evaluate(&repo.git(), &a, &z, 10).unwrap(),
            AncestryResult::Unrelated
        );
    }
}
