//! forge
//!
//! Abstraction over the hosting service that owns the pull request.
//!
//! # Architecture
//!
//! The `Forge` trait defines the four calls the engine and the reporting
//! sinks make: pull request lookup, permission query, user lookup, and
//! comment posting. The engine only ever sees `&dyn Forge`.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`github`]: GitHub implementation using the REST API
//! - [`mock`]: Mock implementation for deterministic testing

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
