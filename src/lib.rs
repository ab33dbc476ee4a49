pub mod cli;
pub mod config;
pub mod context;
pub mod i18n;
pub mod llm;
pub mod outlet;
pub mod providers;
pub mod research;
pub mod workflow;

// Re-export commonly used types
pub use config::Config;
pub use research::tool::{DeepResearchInput, ToolResponse, run_tool, run_tool_json};
pub use research::{Oracle, ResearchOrchestrator};
pub use workflow::launch;
