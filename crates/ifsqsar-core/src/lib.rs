//! # IFSQSAR Core Library
//!
//! A dependency-resolving evaluation engine for QSAR/QSPR models that predict
//! physicochemical and environmental-fate properties of chemicals and chemical
//! mixtures from SMILES.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models: molecules and the structure
//!   normalization contract, mixture role assignments, model descriptors and their
//!   evaluation results, uncertainty aggregation rules, the model registry, the built-in
//!   model library and delimited batch I/O.
//!
//! - **[`engine`]: The Logic Core.** Resolves the dependency closure of the requested
//!   models into a topological order and evaluates it against one prepared record,
//!   memoizing every `(model, occupant)` result in a per-record cache.
//!
//! - **[`workflows`]: The Public API.** Applies a model list to single records or whole
//!   batches and assembles the results into structured, row-major or column-major tables.

pub mod core;
pub mod engine;
pub mod workflows;
