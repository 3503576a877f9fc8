// premerge-core/src/infrastructure/report/mod.rs

pub mod columns;
pub mod json;
pub mod markdown;

pub use columns::ColumnProfilesRenderer;
pub use json::{JsonRenderer, parse_report};
pub use markdown::MarkdownRenderer;

use crate::application::ports::renderer::ReportRenderer;

/// The three views written on every profiling run.
pub fn default_renderers() -> Vec<Box<dyn ReportRenderer>> {
    vec![
        Box::new(MarkdownRenderer),
        Box::new(JsonRenderer),
        Box::new(ColumnProfilesRenderer),
    ]
}
