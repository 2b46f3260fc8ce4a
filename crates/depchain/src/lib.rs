//! depchain - dependency path analysis for SBOM scans.
//!
//! Stores the components a scanner found in a project together with the
//! textual `(name, version)` references to their direct parents, and answers
//! two questions about them:
//!
//! - *How did this package get here?* The [`resolver`] walks ancestor
//!   references upward and returns every literal chain from a root down to
//!   the occurrence, with cycles and depth cuts flagged.
//! - *Is B downstream of A, and how far?* The [`closure`] index records the
//!   minimum hop count for every reachable pair within the depth bound.
//!
//! [`engine::Engine`] ties ingestion, closure maintenance and resolution to a
//! [`storage::DependencyStorage`] backend.

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod closure;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod id_generation;
pub mod resolver;
pub mod storage;

// CLI support (needed by the binary)
pub mod app;
pub mod cli;
pub mod commands;
pub mod output;
