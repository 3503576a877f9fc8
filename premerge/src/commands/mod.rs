// premerge/src/commands/mod.rs

pub mod merge;
pub mod profile;
