//! Utero Tools - Functions the voice assistant may invoke
//!
//! Each tool is a self-contained file in src/tools/.
//! To add a tool: create the file, implement Tool trait, register below.

pub mod registry;
pub mod tools;

pub use registry::{Tool, ToolRegistry, ToolResult};
pub use tools::log_cycle::{LogSymptomsAndMoodTool, Today, LOG_SYMPTOMS_AND_MOOD};

use std::sync::Arc;
use utero_core::CycleJournal;

/// Create the default tool registry with all builtin tools, writing to `journal`
/// and dating entries with the local calendar date.
pub fn create_default_registry(journal: Arc<dyn CycleJournal>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(LogSymptomsAndMoodTool::new(journal));
    registry
}
