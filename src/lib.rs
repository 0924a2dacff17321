//! fast-forward - Fast-forward merges for pull requests, driven by comments
//!
//! Given a pull request, fast-forward decides whether its base branch can be
//! moved to its head without creating a merge (as `git merge --ff-only`
//! would) and, when asked and allowed, moves it. Every run ends in a
//! Markdown report explaining what happened.
//!
//! # Architecture
//!
//! - [`cli`] - Argument parsing, logging, wiring, exit codes
//! - [`engine`] - Resolve -> Evaluate -> Gate -> Select -> Execute
//! - [`core`] - Domain types and configuration
//! - [`git`] - Local object database (`git2`) and remote transport (`git`)
//! - [`forge`] - Pull requests, permissions, users, comments (GitHub v1)
//! - [`event`] - The triggering event's context
//! - [`ui`] - Report rendering and publishing
//!
//! # Correctness Invariants
//!
//! 1. The base branch only moves forward: to a descendant of its current
//!    value (or a merge commit whose first parent is that value)
//! 2. The remote update is a compare-and-swap against the value observed
//!    at resolution; a lost race fails and is never retried
//! 3. No update without a positive permission answer for the requester
//! 4. Every run that gets past configuration produces a report

pub mod cli;
pub mod core;
pub mod engine;
pub mod event;
pub mod forge;
pub mod git;
pub mod ui;
