use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;
use tokio::time::Instant;

/// 证据来源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginKind {
    Vector,
    Web,
}

impl Display for OriginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OriginKind::Vector => write!(f, "vector"),
            OriginKind::Web => write!(f, "web"),
        }
    }
}

/// 一条检索到的证据，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    source: String,
    payload: String,
    origin_kind: OriginKind,
    captured_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    similarity_score: Option<f32>,
}

impl Finding {
    /// 来自网页检索/内容提取的证据
    pub fn web(source: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            payload: payload.into(),
            origin_kind: OriginKind::Web,
            captured_at: Utc::now(),
            similarity_score: None,
        }
    }

    /// 来自向量库的证据，总是带有相似度
    pub fn vector(source: impl Into<String>, payload: impl Into<String>, score: f32) -> Self {
        Self {
            source: source.into(),
            payload: payload.into(),
            origin_kind: OriginKind::Vector,
            captured_at: Utc::now(),
            similarity_score: Some(score),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn origin_kind(&self) -> OriginKind {
        self.origin_kind
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn similarity_score(&self) -> Option<f32> {
        self.similarity_score
    }
}

/// 编排器所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initialization,
    VectorSearch,
    WebSearch,
    Analysis,
    Synthesis,
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Initialization => write!(f, "initialization"),
            Phase::VectorSearch => write!(f, "vector_search"),
            Phase::WebSearch => write!(f, "web_search"),
            Phase::Analysis => write!(f, "analysis"),
            Phase::Synthesis => write!(f, "synthesis"),
        }
    }
}

/// 本轮要执行的动作，每轮最多一个
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Strategy {
    /// 先网页检索，再对前几个结果做内容提取
    #[serde(rename_all = "camelCase")]
    SearchTopic { topic: String },
    /// 直接对指定URL做内容提取
    #[serde(rename_all = "camelCase")]
    UrlToSearch {
        url: String,
        extraction_prompt: Option<String>,
    },
    /// 查询向量库
    #[serde(rename_all = "camelCase")]
    VectorQuery { query: String },
    /// 空轮
    None,
}

impl Strategy {
    /// 从三个可选字段中按 search → url → vector 的顺序取第一个非空值
    pub fn from_fields(
        next_search_topic: Option<String>,
        url_to_search: Option<String>,
        vector_query: Option<String>,
        extraction_prompt: Option<String>,
    ) -> Self {
        let non_blank = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(topic) = non_blank(next_search_topic) {
            return Strategy::SearchTopic { topic };
        }
        if let Some(url) = non_blank(url_to_search) {
            return Strategy::UrlToSearch {
                url,
                extraction_prompt: non_blank(extraction_prompt),
            };
        }
        if let Some(query) = non_blank(vector_query) {
            return Strategy::VectorQuery { query };
        }
        Strategy::None
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Strategy::None)
    }
}

/// 每轮由oracle给出的分析与决策
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    pub gaps: Vec<String>,
    pub next_steps: Vec<String>,
    pub should_continue: bool,
    pub strategy: Strategy,
}

/// 最终的综合报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisResult {
    /// 对全部研究结果的总体总结
    pub summary: String,
    /// 最重要的发现
    #[serde(default)]
    pub key_findings: Vec<String>,
    /// 贯穿研究结果的主题
    #[serde(default)]
    pub main_themes: Vec<String>,
    /// 尚不确定或互相矛盾之处
    #[serde(default)]
    pub uncertainties: Vec<String>,
    /// 建议的后续研究方向
    #[serde(default)]
    pub future_directions: Vec<String>,
}

impl SynthesisResult {
    pub const FAILURE_SUMMARY: &'static str = "Failed to synthesize the research findings.";

    /// 解析失败时使用的降级结果
    pub fn degraded() -> Self {
        Self {
            summary: Self::FAILURE_SUMMARY.to_string(),
            key_findings: vec![],
            main_themes: vec![],
            uncertainties: vec![],
            future_directions: vec![],
        }
    }
}

/// 一次研究运行的统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchStats {
    pub total_iterations: u32,
    pub time_spent_minutes: f64,
    pub vector_sources: usize,
    pub web_sources: usize,
}

/// 研究请求
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchRequest {
    pub topic: String,
    pub use_vector_db: bool,
    pub workspace: Option<String>,
    pub max_iterations: u32,
    pub time_limit_minutes: u64,
}

impl ResearchRequest {
    pub const DEFAULT_MAX_ITERATIONS: u32 = 15;
    pub const DEFAULT_TIME_LIMIT_MINUTES: u64 = 10;

    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            use_vector_db: false,
            workspace: None,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            time_limit_minutes: Self::DEFAULT_TIME_LIMIT_MINUTES,
        }
    }

    pub fn with_vector_db(mut self, workspace: impl Into<String>) -> Self {
        self.use_vector_db = true;
        self.workspace = Some(workspace.into());
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_time_limit_minutes(mut self, minutes: u64) -> Self {
        self.time_limit_minutes = minutes;
        self
    }
}

/// 一次研究运行的完整产出
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchOutcome {
    pub synthesis: SynthesisResult,
    pub findings: Vec<Finding>,
    pub stats: ResearchStats,
}

/// 编排器的工作记忆，只由编排器修改
#[derive(Debug)]
pub struct ResearchState {
    topic: String,
    workspace: Option<String>,
    vector_available: bool,
    max_iterations: u32,
    time_limit: Duration,
    findings: Vec<Finding>,
    iteration: u32,
    started_at: Instant,
    remaining_budget: Duration,
    phase: Phase,
    last_analysis: Option<AnalysisResult>,
}

impl ResearchState {
    pub(crate) fn new(request: &ResearchRequest, vector_available: bool) -> Self {
        let time_limit = Duration::from_secs(request.time_limit_minutes.saturating_mul(60));
        Self {
            topic: request.topic.trim().to_string(),
            workspace: request.workspace.clone(),
            vector_available,
            max_iterations: request.max_iterations,
            time_limit,
            findings: Vec::new(),
            iteration: 0,
            started_at: Instant::now(),
            remaining_budget: time_limit,
            phase: Phase::Initialization,
            last_analysis: None,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn workspace(&self) -> Option<&str> {
        self.workspace.as_deref()
    }

    pub fn vector_available(&self) -> bool {
        self.vector_available
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn last_analysis(&self) -> Option<&AnalysisResult> {
        self.last_analysis.as_ref()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// 上一次重新计算时的剩余时间
    pub fn remaining_budget(&self) -> Duration {
        self.remaining_budget
    }

    pub fn count_by_origin(&self, origin: OriginKind) -> usize {
        self.findings
            .iter()
            .filter(|f| f.origin_kind() == origin)
            .count()
    }

    pub(crate) fn refresh_budget(&mut self) -> Duration {
        self.remaining_budget = self.time_limit.saturating_sub(self.elapsed());
        self.remaining_budget
    }

    pub(crate) fn begin_round(&mut self) {
        self.iteration += 1;
        self.refresh_budget();
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn push_finding(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub(crate) fn record_analysis(&mut self, analysis: AnalysisResult) {
        self.last_analysis = Some(analysis);
    }

    pub(crate) fn stats(&self) -> ResearchStats {
        ResearchStats {
            total_iterations: self.iteration,
            time_spent_minutes: self.elapsed().as_secs_f64() / 60.0,
            vector_sources: self.count_by_origin(OriginKind::Vector),
            web_sources: self.count_by_origin(OriginKind::Web),
        }
    }

    pub(crate) fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}
