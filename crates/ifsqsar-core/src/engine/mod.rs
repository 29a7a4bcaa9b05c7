//! # Engine Module
//!
//! Resolves requested models into a dependency-respecting order and evaluates that order
//! against one prepared record at a time.
//!
//! - [`resolver`] - depth-first topological ordering with cycle detection
//! - [`evaluator`] - demand propagation over record slots and memoized evaluation
//! - [`cache`] - the per-record `(model, slot)` result cache
//! - [`config`] - prediction and output configuration with its builder
//! - [`progress`] - callback-based progress reporting

pub mod cache;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod progress;
pub mod resolver;
