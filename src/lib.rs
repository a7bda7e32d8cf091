// ABOUTME: Main library module for the taskgraph build-task engine
// ABOUTME: Exports all core modules and provides the public API

pub mod cli;
pub mod engine;
pub mod parser;
pub mod tasks;

// Re-export commonly used types
pub use cli::{App, Args, Config};
pub use engine::{
    BuildResult, BuildStatus, GraphError, Task, TaskGraphExecuter, TaskState, TaskStatus,
};
pub use parser::{GraphFile, GraphFileParser, TaskDefinition};
pub use tasks::{CommandTask, TaskRegistry};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
