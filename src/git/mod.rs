//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. Local reads and writes of the
//! object database go through [`Git`] (`git2`); anything that talks to a
//! remote goes through a [`Transport`], normally [`GitCli`].
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - Ref resolution and local CAS updates
//! - Ancestry queries (merge-base, is-ancestor, bounded commit ranges)
//! - Merge commit creation
//! - Fetch and lease-protected push
//!
//! # Invariants
//!
//! - The only remote mutation is [`Transport::push_cas`]
//! - No other module calls git2 directly
//! - All operations return strong types (Oid, BranchName, RefName)

mod interface;
pub mod transport;

pub use interface::{CommitInfo, CommitRange, Git, GitError, Signature};
pub use transport::{GitCli, PushOutcome, Transport, TransportError};
