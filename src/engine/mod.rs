//! engine
//!
//! The fast-forward decision and its execution.
//!
//! # Architecture
//!
//! ```text
//! Resolve -> Evaluate -> [Gate] -> [Select -> Execute] -> Outcome
//! ```
//!
//! 1. **Resolve**: Turn base and head endpoints into commits, fetching as needed
//! 2. **Evaluate**: Decide whether base is an ancestor of head
//! 3. **Gate**: Ask the forge whether the requester may push
//! 4. **Select**: Prepare the single ref update (fast-forward or merge commit)
//! 5. **Execute**: Push it, guarded by a lease on the observed base
//!
//! [`runner::Runner`] drives these stages and always ends in an
//! [`outcome::Outcome`].
//!
//! # Invariants
//!
//! - Remote state changes only in [`exec`], at most once per run
//! - No mutation without a successful, positive permission check
//! - No mutation unless base is an ancestor of head

pub mod ancestry;
pub mod exec;
pub mod gate;
pub mod outcome;
pub mod resolve;
pub mod runner;
pub mod strategy;

pub use ancestry::{AncestryResult, Divergence};
pub use exec::{Applied, MutationError};
pub use gate::AuthorizationDecision;
pub use outcome::{FailureKind, Outcome, Stage};
pub use resolve::{ResolutionError, Resolver};
pub use runner::{Run, Runner};
pub use strategy::Mutation;
