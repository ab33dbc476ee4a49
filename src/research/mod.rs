//! 迭代式深度研究：规划 → 检索 → 累积证据 → 综合

pub mod error;
pub mod json;
pub mod oracle;
pub mod orchestrator;
pub mod planner;
pub mod progress;
pub mod synthesis;
pub mod tool;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ResearchError;
pub use oracle::Oracle;
pub use orchestrator::{OrchestratorSettings, ResearchOrchestrator};
pub use progress::{ChannelProgressSink, ConsoleProgressSink, NoopProgressSink, ProgressEvent, ProgressSink};
pub use tool::{DeepResearchInput, ResearchReport, ToolResponse};
pub use types::{
    AnalysisResult, Finding, OriginKind, Phase, ResearchOutcome, ResearchRequest, ResearchStats,
    Strategy, SynthesisResult,
};
