// src/progress/mod.rs

//! In-memory progress reporting.
//!
//! - [`store`] holds the shared key → (percentage, message) map that running
//!   tasks write and status endpoints poll.
//! - [`parse`] extracts `NN%` tokens from tool output and remaps them into a
//!   sub-range of the overall task progress.

pub mod parse;
pub mod store;

pub use parse::{parse_percent, remap_percent};
pub use store::{ProgressRecord, ProgressStore};
