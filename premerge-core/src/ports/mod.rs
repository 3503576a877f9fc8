// premerge-core/src/ports/mod.rs

pub mod sink;
pub mod source;

pub use sink::TableSink;
pub use source::{SourceRequest, TableSource};
