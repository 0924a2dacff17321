//! core
//!
//! Domain types and configuration shared by every layer.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, RefName, CommitRef, etc.
//! - [`config`] - Configuration schema, loading, and precedence
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod types;
