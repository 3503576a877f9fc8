// premerge-core/src/application/mod.rs

pub mod load;
pub mod merge;
pub mod ports;
pub mod profiler;
pub mod report;

pub mod pipeline;

// --- RE-EXPORTS (FACADE PATTERN) ---
// `use premerge_core::application::{run_profile, ProfileOptions};`

pub use load::load_tables;
pub use merge::{MergeSummary, merge_tables};
pub use pipeline::{MergeOptions, MergeRun, ProfileOptions, ProfileRun, run_merge, run_profile};
pub use profiler::profile;
pub use report::{ReportBundle, emit_report};
