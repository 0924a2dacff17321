//! ui
//!
//! Everything a person sees after a run.
//!
//! # Modules
//!
//! - [`report`] - Pure rendering of an outcome into Markdown
//! - [`sinks`] - Step summary, output value, and pull request comment
//!
//! # Design
//!
//! Rendering never fails and never performs I/O. Publishing is best-effort:
//! a sink that can't be written is logged and the remaining sinks are still
//! written.

pub mod report;
pub mod sinks;
