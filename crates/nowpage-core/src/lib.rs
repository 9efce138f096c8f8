//! Core types and trait definitions for the now-page document model.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod credential;
pub mod document;
pub mod error;
pub mod handle;
pub mod revision;
pub mod state;
pub mod store;

pub use error::{Error, Result};

/// Filename of the document body within a handle's file set.
pub const BODY_FILENAME: &str = "now.json";
