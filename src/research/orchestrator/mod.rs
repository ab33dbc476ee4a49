use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::i18n::TargetLanguage;
use crate::providers::{ContentExtractionProvider, VectorSearchProvider, WebSearchProvider};
use crate::research::error::ResearchError;
use crate::research::oracle::Oracle;
use crate::research::planner::{Analysis, PlanningAdapter};
use crate::research::progress::{NoopProgressSink, ProgressEvent, ProgressSink};
use crate::research::synthesis::SynthesisStage;
use crate::research::types::{Phase, ResearchOutcome, ResearchRequest, ResearchState, Strategy};

/// 研究循环的可调参数
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// 剩余时间不超过该值时不再开始新一轮
    pub min_remaining: Duration,
    /// 每轮最多提取的检索结果数
    pub max_urls_per_round: usize,
    /// 向量检索返回条数
    pub vector_top_k: usize,
    /// 检索后提取内容时使用的指令模板，`{topic}` 会被替换为检索主题
    pub extraction_prompt_template: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            min_remaining: Duration::from_secs(2 * 60),
            max_urls_per_round: 2,
            vector_top_k: 5,
            extraction_prompt_template: String::from(
                "Extract the key facts, figures, claims and dates relevant to: {topic}",
            ),
        }
    }
}

/// 迭代式研究编排器
///
/// 每一轮：规划（oracle）→ 按策略调用一个数据源 → 追加证据；
/// 轮次用尽、时间预算不足或oracle主动停止后进入综合阶段。
pub struct ResearchOrchestrator {
    planner: PlanningAdapter,
    synthesis: SynthesisStage,
    web_search: Arc<dyn WebSearchProvider>,
    extractor: Arc<dyn ContentExtractionProvider>,
    vector_search: Option<Arc<dyn VectorSearchProvider>>,
    progress: Arc<dyn ProgressSink>,
    settings: OrchestratorSettings,
}

impl ResearchOrchestrator {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        web_search: Arc<dyn WebSearchProvider>,
        extractor: Arc<dyn ContentExtractionProvider>,
    ) -> Self {
        Self {
            planner: PlanningAdapter::new(oracle.clone()),
            synthesis: SynthesisStage::new(oracle, &TargetLanguage::default()),
            web_search,
            extractor,
            vector_search: None,
            progress: Arc::new(NoopProgressSink),
            settings: OrchestratorSettings::default(),
        }
    }

    pub fn with_vector_search(mut self, vector_search: Arc<dyn VectorSearchProvider>) -> Self {
        self.vector_search = Some(vector_search);
        self
    }

    pub fn with_progress_sink(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 替换综合阶段，例如指定报告语言
    pub fn with_synthesis(mut self, synthesis: SynthesisStage) -> Self {
        self.synthesis = synthesis;
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// 执行一次完整的研究
    pub async fn run(&self, request: &ResearchRequest) -> Result<ResearchOutcome, ResearchError> {
        validate(request)?;

        let vector_available = request.use_vector_db
            && self.vector_search.is_some()
            && request
                .workspace
                .as_deref()
                .is_some_and(|w| !w.trim().is_empty());
        let mut state = ResearchState::new(request, vector_available);

        info!(
            topic = state.topic(),
            max_iterations = request.max_iterations,
            time_limit_minutes = request.time_limit_minutes,
            vector_available,
            "research started"
        );
        self.progress.emit(
            ProgressEvent::new(Phase::Initialization)
                .time_remaining(state.remaining_budget())
                .message(format!("开始研究: {}", state.topic())),
        );

        if request.use_vector_db && !vector_available {
            self.progress.emit(
                ProgressEvent::new(Phase::Initialization)
                    .message("向量库不可用，跳过向量检索"),
            );
        }

        if vector_available {
            state.set_phase(Phase::VectorSearch);
            let topic = state.topic().to_string();
            self.vector_round(&mut state, &topic).await;
        }

        while state.iteration() < request.max_iterations
            && state.refresh_budget() > self.settings.min_remaining
        {
            state.begin_round();
            state.set_phase(Phase::Analysis);

            let analysis = match self.planner.analyze(&state).await? {
                Analysis::Parsed(analysis) => analysis,
                Analysis::ParseFailure { reason } => {
                    warn!(iteration = state.iteration(), %reason, "skipping round");
                    self.progress.emit(
                        ProgressEvent::new(Phase::Analysis)
                            .iteration(state.iteration())
                            .time_remaining(state.remaining_budget())
                            .error(format!("无法解析分析结果: {}", reason)),
                    );
                    continue;
                }
            };

            self.progress.emit(
                ProgressEvent::new(Phase::Analysis)
                    .iteration(state.iteration())
                    .time_remaining(state.remaining_budget())
                    .analysis(analysis.clone()),
            );
            let should_continue = analysis.should_continue;
            let strategy = analysis.strategy.clone();
            state.record_analysis(analysis);

            if !should_continue {
                info!(iteration = state.iteration(), "oracle ended research");
                break;
            }

            state.set_phase(Phase::WebSearch);
            self.dispatch(&mut state, &strategy).await;
        }

        state.set_phase(Phase::Synthesis);
        self.progress.emit(
            ProgressEvent::new(Phase::Synthesis)
                .iteration(state.iteration())
                .message(format!("综合 {} 条证据", state.findings().len())),
        );

        let mut stats = state.stats();
        let synthesis = self
            .synthesis
            .synthesize(state.topic(), state.findings(), &stats)
            .await?;
        stats.time_spent_minutes = state.elapsed().as_secs_f64() / 60.0;

        info!(
            iterations = stats.total_iterations,
            vector_sources = stats.vector_sources,
            web_sources = stats.web_sources,
            "research finished"
        );
        Ok(ResearchOutcome {
            synthesis,
            findings: state.into_findings(),
            stats,
        })
    }

    /// 按策略执行本轮唯一的动作
    async fn dispatch(&self, state: &mut ResearchState, strategy: &Strategy) {
        match strategy {
            Strategy::SearchTopic { topic } => self.search_and_extract(state, topic).await,
            Strategy::UrlToSearch {
                url,
                extraction_prompt,
            } => {
                let prompt = extraction_prompt
                    .clone()
                    .unwrap_or_else(|| self.extraction_prompt(state.topic()));
                self.extract(state, std::slice::from_ref(url), &prompt).await;
            }
            Strategy::VectorQuery { query } => {
                if state.vector_available() {
                    state.set_phase(Phase::VectorSearch);
                    self.vector_round(state, query).await;
                } else {
                    self.progress.emit(
                        ProgressEvent::new(Phase::WebSearch)
                            .iteration(state.iteration())
                            .message(format!("向量库不可用，忽略查询: {}", query)),
                    );
                }
            }
            Strategy::None => {
                debug!(iteration = state.iteration(), "no action this round");
            }
        }
    }

    async fn search_and_extract(&self, state: &mut ResearchState, topic: &str) {
        self.progress.emit(
            ProgressEvent::new(Phase::WebSearch)
                .iteration(state.iteration())
                .message(format!("网页检索: {}", topic)),
        );

        let hits = match self.web_search.search(topic).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(topic, error = %e, "web search failed");
                self.progress.emit(
                    ProgressEvent::new(Phase::WebSearch)
                        .iteration(state.iteration())
                        .error(e.to_string()),
                );
                return;
            }
        };

        let urls: Vec<String> = hits
            .into_iter()
            .take(self.settings.max_urls_per_round)
            .map(|hit| hit.url)
            .collect();
        if urls.is_empty() {
            self.progress.emit(
                ProgressEvent::new(Phase::WebSearch)
                    .iteration(state.iteration())
                    .message(format!("未检索到结果: {}", topic)),
            );
            return;
        }

        let prompt = self.extraction_prompt(topic);
        self.extract(state, &urls, &prompt).await;
    }

    async fn extract(&self, state: &mut ResearchState, urls: &[String], prompt: &str) {
        match self.extractor.extract(urls, prompt).await {
            Ok(finding) => {
                debug!(source = finding.source(), "web finding captured");
                state.push_finding(finding);
            }
            Err(e) => {
                warn!(urls = ?urls, error = %e, "extraction failed");
                self.progress.emit(
                    ProgressEvent::new(Phase::WebSearch)
                        .iteration(state.iteration())
                        .message(format!("内容提取失败: {}", urls.join(", ")))
                        .error(e.to_string()),
                );
            }
        }
    }

    async fn vector_round(&self, state: &mut ResearchState, query: &str) {
        let (Some(provider), Some(workspace)) = (
            &self.vector_search,
            state.workspace().map(str::to_string),
        ) else {
            return;
        };

        match provider
            .query(query, &workspace, self.settings.vector_top_k)
            .await
        {
            Ok(findings) => {
                let count = findings.len();
                for finding in findings {
                    state.push_finding(finding);
                }
                self.progress.emit(
                    ProgressEvent::new(Phase::VectorSearch)
                        .iteration(state.iteration())
                        .message(format!("向量检索命中 {} 条: {}", count, query)),
                );
            }
            Err(e) => {
                warn!(query, error = %e, "vector search failed");
                self.progress.emit(
                    ProgressEvent::new(Phase::VectorSearch)
                        .iteration(state.iteration())
                        .error(e.to_string()),
                );
            }
        }
    }

    fn extraction_prompt(&self, topic: &str) -> String {
        self.settings
            .extraction_prompt_template
            .replace("{topic}", topic)
    }
}

fn validate(request: &ResearchRequest) -> Result<(), ResearchError> {
    if request.topic.trim().is_empty() {
        return Err(ResearchError::InvalidInput(
            "topic must not be empty".to_string(),
        ));
    }
    if request.time_limit_minutes == 0 {
        return Err(ResearchError::InvalidInput(
            "time limit must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
