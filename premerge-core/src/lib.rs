// premerge-core/src/lib.rs

#![allow(missing_docs)]
// Memory safety
#![deny(unsafe_code)]
// Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports: what the application needs from storage (TableSource, TableSink)
pub mod ports;

// 2. Domain: tables, coercion, quality checks, the canonical report.
// Depends on nothing else in the crate.
pub mod domain;

// 3. Infrastructure: CSV reader, Parquet writer, config files, discovery,
// report renderers.
pub mod infrastructure;

// 4. Application: load -> profile -> emit, and the merge stage
pub mod application;

// --- GLOBAL ERROR ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use error::PremergeError;
