//! Property-based tests for ancestry and the core domain types.
//!
//! Histories are built directly with git2 in a bare repository, which keeps
//! each case fast enough to run a few dozen of them.

use proptest::prelude::*;

use fast_forward::core::types::{BranchName, Oid, RefName};
use fast_forward::engine::ancestry::{evaluate, AncestryResult};
use fast_forward::git::Git;

/// A bare repository holding one linear chain of `len` commits.
struct Chain {
    _dir: tempfile::TempDir,
    git: Git,
    /// Oldest first
    commits: Vec<Oid>,
}

fn chain(len: usize) -> Chain {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = git2::Repository::init_bare(dir.path()).unwrap();
    let sig = git2::Signature::new("T", "t@example.com", &git2::Time::new(1_700_000_000, 0)).unwrap();

    let mut commits = Vec::new();
    let mut parent: Option<git2::Oid> = None;
    for i in 0..len {
        let blob = repo.blob(format!("{}", i).as_bytes()).unwrap();
        let mut builder = repo.treebuilder(None).unwrap();
        builder.insert("file", blob, 0o100644).unwrap();
        let tree = repo.find_tree(builder.write().unwrap()).unwrap();
        let parents: Vec<git2::Commit> = parent
            .iter()
            .map(|id| repo.find_commit(*id).unwrap())
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        let id = repo
            .commit(None, &sig, &sig, &format!("commit {}", i), &tree, &parent_refs)
            .unwrap();
        commits.push(Oid::new(id.to_string()).unwrap());
        parent = Some(id);
    }

    let git = Git::open(dir.path()).unwrap();
    Chain {
        _dir: dir,
        git,
        commits,
    }
}

/// `(len, i, j)` with `i, j < len`.
fn positions() -> impl Strategy<Value = (usize, usize, usize)> {
    (1usize..12).prop_flat_map(|len| (Just(len), 0..len, 0..len))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Every commit can be fast-forwarded to itself.
    #[test]
    fn commit_is_its_own_ancestor((len, i, _) in positions()) {
        let chain = chain(len);
        let oid = &chain.commits[i];
        prop_assert_eq!(evaluate(&chain.git, oid, oid, 5).unwrap(), AncestryResult::IsAncestor);
    }

    /// On a linear history, older can always be fast-forwarded to newer.
    #[test]
    fn older_is_ancestor_of_newer((len, i, j) in positions()) {
        let (older, newer) = (i.min(j), i.max(j));
        let chain = chain(len);
        let result = evaluate(&chain.git, &chain.commits[older], &chain.commits[newer], 5).unwrap();
        prop_assert!(result.can_fast_forward());
    }

    /// Newer to older is never a fast-forward, and the listing counts
    /// exactly the commits that would be lost, bounded by the limit.
    #[test]
    fn newer_is_not_ancestor_of_older((len, i, j) in positions(), limit in 1usize..6) {
        prop_assume!(i != j);
        let (older, newer) = (i.min(j), i.max(j));
        let chain = chain(len);

        let result = evaluate(&chain.git, &chain.commits[newer], &chain.commits[older], limit).unwrap();
        match result {
            AncestryResult::Diverged(divergence) => {
                prop_assert_eq!(&divergence.merge_base, &chain.commits[older]);
                prop_assert_eq!(divergence.base_only.total, newer - older);
                prop_assert_eq!(divergence.base_only.commits.len(), (newer - older).min(limit));
                prop_assert_eq!(&divergence.base_only.commits[0].oid, &chain.commits[newer]);
                prop_assert_eq!(divergence.head_only.total, 0);
            }
            other => prop_assert!(false, "expected divergence, got {:?}", other),
        }
    }

    /// Short ids are prefixes of the full id.
    #[test]
    fn short_oid_is_prefix(hex in "[0-9a-f]{40}", len in 0usize..50) {
        let oid = Oid::new(hex.clone()).unwrap();
        prop_assert!(hex.starts_with(oid.short(len)));
        prop_assert_eq!(oid.short(len).len(), len.min(40));
    }

    /// Qualified and short branch names name the same branch.
    #[test]
    fn qualified_branch_names_are_stripped(name in "[a-z][a-z0-9]{0,10}(/[a-z0-9]{1,8}){0,2}") {
        let short = BranchName::new(name.clone()).unwrap();
        let qualified = BranchName::new(format!("refs/heads/{}", name)).unwrap();
        prop_assert_eq!(&short, &qualified);
        let branch_ref = RefName::for_branch(&short);
        prop_assert_eq!(branch_ref.as_str(), format!("refs/heads/{}", name));
    }
}
