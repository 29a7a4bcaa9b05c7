//! # Workflows Module
//!
//! High-level entry points that front-ends call to apply models to chemicals.
//!
//! - **Prediction** ([`predict`]) - expands the requested model list, resolves it once and
//!   evaluates every record of a batch, optionally in parallel with the `parallel` feature.
//! - **Reporting** ([`report`]) - assembles evaluations into a [`report::BatchTable`] and
//!   renders it as rows, columns or JSON, optionally merged with the original input file.

pub mod predict;
pub mod report;
