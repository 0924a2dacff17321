//! Shared fixture: a bare "remote", a working clone to make commits in,
//! and an empty scratch repository for the tool itself.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tempfile::TempDir;

use fast_forward::core::types::{BranchName, Oid};
use fast_forward::forge::{PrSide, PullRequest};
use fast_forward::git::{Git, GitCli};

pub const REPOSITORY: &str = "octocat/hello";

pub struct World {
    _dir: TempDir,
    pub remote: PathBuf,
    pub work: PathBuf,
    pub scratch: PathBuf,
}

impl World {
    /// Remote with `main` at "Initial commit".
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let remote = dir.path().join("remote.git");
        let work = dir.path().join("work");
        let scratch = dir.path().join("scratch.git");

        run_git(dir.path(), &["init", "-q", "--bare", "-b", "main", "remote.git"]);
        run_git(dir.path(), &["init", "-q", "-b", "main", "work"]);
        run_git(&work, &["config", "user.email", "test@example.com"]);
        run_git(&work, &["config", "user.name", "Test User"]);
        run_git(&work, &["config", "commit.gpgsign", "false"]);
        run_git(&work, &["remote", "add", "origin", remote.to_str().unwrap()]);

        let world = Self {
            _dir: dir,
            remote,
            work,
            scratch,
        };
        world.commit("README.md", "Initial commit");
        world.push("main");
        world
    }

    /// Commit a new file on the current branch; returns the new sha.
    pub fn commit(&self, file: &str, message: &str) -> Oid {
        std::fs::write(self.work.join(file), message).unwrap();
        run_git(&self.work, &["add", file]);
        run_git(&self.work, &["commit", "-q", "-m", message]);
        Oid::new(run_git(&self.work, &["rev-parse", "HEAD"])).unwrap()
    }

    /// Create `name` at the current commit and switch to it.
    pub fn branch(&self, name: &str) {
        run_git(&self.work, &["checkout", "-q", "-b", name]);
    }

    pub fn checkout(&self, name: &str) {
        run_git(&self.work, &["checkout", "-q", name]);
    }

    /// Force-push `branch` to the remote.
    pub fn push(&self, branch: &str) {
        run_git(&self.work, &["push", "-q", "-f", "origin", branch]);
    }

    /// Current value of `branch` on the remote.
    pub fn remote_sha(&self, branch: &str) -> Oid {
        Oid::new(run_git(
            &self.remote,
            &["rev-parse", &format!("refs/heads/{}", branch)],
        ))
        .unwrap()
    }

    /// Parents of a commit on the remote, in order.
    pub fn remote_parents(&self, oid: &Oid) -> Vec<String> {
        run_git(
            &self.remote,
            &["rev-list", "--parents", "-n", "1", oid.as_str()],
        )
        .split_whitespace()
        .skip(1)
        .map(str::to_string)
        .collect()
    }

    /// Install a server-side hook on the remote that prints `message` and
    /// declines every push.
    #[cfg(unix)]
    pub fn decline_pushes(&self, message: &str) {
        use std::os::unix::fs::PermissionsExt;

        let hook = self.remote.join("hooks").join("pre-receive");
        std::fs::create_dir_all(hook.parent().unwrap()).unwrap();
        std::fs::write(&hook, format!("#!/bin/sh\necho '{}' >&2\nexit 1\n", message)).unwrap();
        std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn url(&self) -> String {
        self.remote.to_str().unwrap().to_string()
    }

    /// The tool's object store, created on first use.
    pub fn git(&self) -> Git {
        Git::open_or_init(&self.scratch).expect("failed to open scratch repository")
    }

    pub fn transport(&self) -> GitCli {
        GitCli::new(&self.scratch, None, Duration::from_secs(30))
    }

    /// A pull request from `head` into `base` as the remote has them now.
    pub fn pull_request(&self, number: u64, base: &str, head: &str) -> PullRequest {
        let side = |branch: &str| PrSide {
            branch: BranchName::new(branch).unwrap(),
            sha: self.remote_sha(branch),
            repo_full_name: REPOSITORY.to_string(),
            clone_url: self.url(),
        };
        PullRequest {
            number,
            title: format!("Merge {}", head),
            body: Some("Please merge.".to_string()),
            url: format!("https://github.com/{}/pull/{}", REPOSITORY, number),
            author: "alice".to_string(),
            base: side(base),
            head: side(head),
        }
    }
}

/// Run git in `dir`, panicking on failure; returns trimmed stdout.
pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
