//! 研究进度事件与进度接收端

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::research::types::{AnalysisResult, Phase};

pub const TOOL_NAME: &str = "deep_research";

/// 一条进度事件，序列化为 `{ tool, content: { phase, ... } }`
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub tool: &'static str,
    pub content: ProgressContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressContent {
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,
    /// 剩余时间（分钟）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(phase: Phase) -> Self {
        Self {
            tool: TOOL_NAME,
            content: ProgressContent {
                phase,
                iteration: None,
                time_remaining: None,
                analysis: None,
                message: None,
                error: None,
                timestamp: Utc::now(),
            },
        }
    }

    pub fn iteration(mut self, iteration: u32) -> Self {
        self.content.iteration = Some(iteration);
        self
    }

    pub fn time_remaining(mut self, remaining: Duration) -> Self {
        self.content.time_remaining = Some(remaining.as_secs_f64() / 60.0);
        self
    }

    pub fn analysis(mut self, analysis: AnalysisResult) -> Self {
        self.content.analysis = Some(analysis);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.content.message = Some(message.into());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.content.error = Some(error.into());
        self
    }
}

/// 进度接收端
///
/// `emit` 不得阻塞：编排器在研究循环内同步调用它，写入失败只能被丢弃。
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// 默认接收端，丢弃所有事件
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// 在终端打印进度
#[derive(Debug, Default, Clone)]
pub struct ConsoleProgressSink {
    verbose: bool,
}

impl ConsoleProgressSink {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressSink for ConsoleProgressSink {
    fn emit(&self, event: ProgressEvent) {
        let content = &event.content;
        let round = content
            .iteration
            .map(|i| format!(" [第{}轮]", i))
            .unwrap_or_default();

        if let Some(error) = &content.error {
            eprintln!("⚠️ {}{} {}", content.phase, round, error);
        } else if let Some(analysis) = &content.analysis {
            println!("🧠 {}{} {}", content.phase, round, analysis.summary);
            if !analysis.gaps.is_empty() {
                println!("   ❓ 待补充: {}", analysis.gaps.join("; "));
            }
        } else if let Some(message) = &content.message {
            println!("🔎 {}{} {}", content.phase, round, message);
        }

        if let Some(remaining) = content.time_remaining
            && self.verbose
        {
            println!("   ⏱️ 剩余 {:.1} 分钟", remaining);
        }

        if self.verbose
            && let Ok(line) = serde_json::to_string(&event)
        {
            println!("{}", line);
        }
    }
}

/// 将事件转发到 tokio 无界通道，接收端关闭后静默丢弃
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgressSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("progress receiver dropped, event discarded");
        }
    }
}
