//! Charter: Agent Configuration Resolution
//!
//! Turns raw, user-authored character documents from a content store into
//! validated, runtime-ready agent specifications: identity repair, message
//! example normalization, knowledge merging, concurrent plugin resolution,
//! and secret requirement auditing.

pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod identity;
pub mod knowledge;
pub mod logging;
pub mod message;
pub mod orchestrator;
pub mod plugin;
pub mod store;
pub mod types;
