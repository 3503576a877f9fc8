pub mod error;
pub mod project;
pub mod quality;
pub mod report;
pub mod table;

// Re-exports to keep imports short elsewhere
pub use error::DomainError;
