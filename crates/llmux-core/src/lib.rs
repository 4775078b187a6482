//! Core crate for llmux.
//!
//! - [`types`] — normalized chat model shared by every backend
//! - [`config`] — configuration schema, loader, env overrides
//! - [`utils`] — path helpers

pub mod config;
pub mod types;
pub mod utils;
