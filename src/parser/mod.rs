// ABOUTME: Parser module for YAML task-graph files
// ABOUTME: Exports task-graph parsing, validation, and data structures

pub mod error;
pub mod graph;
pub mod task;

pub use error::{ParserError, ValidationError};
pub use graph::{GraphFile, GraphFileParser};
pub use task::TaskDefinition;
