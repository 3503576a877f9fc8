// premerge-core/src/infrastructure/mod.rs

pub mod adapters;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fs;
pub mod report;

pub use config::load_project_config;
pub use discovery::{LocatedSource, find_dataset_root, find_file, locate_sources, resolve_data_root};
