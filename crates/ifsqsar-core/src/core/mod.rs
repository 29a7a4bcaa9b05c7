//! # Core Module
//!
//! Stateless building blocks shared by the engine and the workflows.
//!
//! - **Structures** ([`molecule`]) - Molecular graphs and the [`molecule::StructureNormalizer`] contract
//! - **Mixtures** ([`mixture`]) - Role-tagged mixture records and their canonical form
//! - **Models** ([`models`]) - Model descriptors, evaluation results, uncertainty rules and the registry
//! - **File I/O** ([`io`]) - Delimited batch input files and text output helpers

pub mod io;
pub mod mixture;
pub mod models;
pub mod molecule;
