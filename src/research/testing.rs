//! 单元测试共用的确定性桩实现

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::providers::{
    ContentExtractionProvider, ProviderError, SearchHit, VectorSearchProvider, WebSearchProvider,
};
use crate::research::oracle::Oracle;
use crate::research::orchestrator::ResearchOrchestrator;
use crate::research::progress::{ProgressEvent, ProgressSink};
use crate::research::types::Finding;

pub const STOP: &str = r#"{"summary": "done", "shouldContinue": false}"#;
pub const NOOP: &str = r#"{"summary": "thinking", "shouldContinue": true}"#;
pub const SYNTHESIS: &str = r#"{"summary": "final report", "keyFindings": ["k"], "mainThemes": [], "uncertainties": [], "futureDirections": []}"#;

pub fn search_reply(topic: &str) -> String {
    format!(
        r#"{{"summary": "need more", "shouldContinue": true, "strategy": {{"nextSearchTopic": "{}"}}}}"#,
        topic
    )
}

/// 按顺序返回预设回复，耗尽后返回 `fallback`
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<String, String>>>,
    fallback: String,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            fallback: NOOP.to_string(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_at(self, call_index: usize, message: &str) -> Self {
        {
            let mut replies = self.replies.lock().unwrap();
            while replies.len() <= call_index {
                replies.push_back(Ok(self.fallback.clone()));
            }
            replies[call_index] = Err(message.to_string());
        }
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn user_prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(user_prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(self.fallback.clone()),
        }
    }
}

#[derive(Default)]
pub struct StubWebSearch {
    pub hits: Vec<SearchHit>,
    pub fail: bool,
    pub queries: Mutex<Vec<String>>,
}

impl StubWebSearch {
    pub fn with_urls(urls: &[&str]) -> Self {
        Self {
            hits: urls
                .iter()
                .map(|url| SearchHit {
                    url: url.to_string(),
                    title: String::new(),
                    snippet: String::new(),
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl WebSearchProvider for StubWebSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ProviderError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(ProviderError::NotConfigured("web search"));
        }
        Ok(self.hits.clone())
    }
}

#[derive(Default)]
pub struct StubExtractor {
    pub fail: bool,
    pub requests: Mutex<Vec<(Vec<String>, String)>>,
}

impl StubExtractor {
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ContentExtractionProvider for StubExtractor {
    async fn extract(
        &self,
        urls: &[String],
        extraction_prompt: &str,
    ) -> Result<Finding, ProviderError> {
        self.requests
            .lock()
            .unwrap()
            .push((urls.to_vec(), extraction_prompt.to_string()));
        if self.fail {
            return Err(ProviderError::EmptyContent(urls.join(", ")));
        }
        Ok(Finding::web(urls.join(", "), format!("extracted: {}", extraction_prompt)))
    }
}

#[derive(Default)]
pub struct StubVectorSearch {
    pub hits_per_query: usize,
    pub queries: Mutex<Vec<(String, String, usize)>>,
}

impl StubVectorSearch {
    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl VectorSearchProvider for StubVectorSearch {
    async fn query(
        &self,
        text: &str,
        workspace: &str,
        top_k: usize,
    ) -> Result<Vec<Finding>, ProviderError> {
        self.queries
            .lock()
            .unwrap()
            .push((text.to_string(), workspace.to_string(), top_k));
        Ok((0..self.hits_per_query.min(top_k))
            .map(|i| Finding::vector(format!("{}#{}", workspace, i), text, 0.9 - i as f32 * 0.1))
            .collect())
    }
}

/// 收集所有进度事件
#[derive(Default)]
pub struct CollectingSink {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// 编排器及其全部桩依赖
pub struct Harness {
    pub oracle: Arc<ScriptedOracle>,
    pub web: Arc<StubWebSearch>,
    pub extractor: Arc<StubExtractor>,
    pub vector: Arc<StubVectorSearch>,
    pub sink: Arc<CollectingSink>,
    pub orchestrator: ResearchOrchestrator,
}

impl Harness {
    pub fn new(oracle: ScriptedOracle, web: StubWebSearch) -> Self {
        Self::build(oracle, web, StubExtractor::default(), None)
    }

    pub fn with_vector(oracle: ScriptedOracle, web: StubWebSearch, hits_per_query: usize) -> Self {
        let vector = StubVectorSearch {
            hits_per_query,
            ..Default::default()
        };
        Self::build(oracle, web, StubExtractor::default(), Some(vector))
    }

    pub fn build(
        oracle: ScriptedOracle,
        web: StubWebSearch,
        extractor: StubExtractor,
        vector: Option<StubVectorSearch>,
    ) -> Self {
        let oracle = Arc::new(oracle);
        let web = Arc::new(web);
        let extractor = Arc::new(extractor);
        let sink = Arc::new(CollectingSink::default());
        let has_vector = vector.is_some();
        let vector = Arc::new(vector.unwrap_or_default());

        let mut orchestrator =
            ResearchOrchestrator::new(oracle.clone(), web.clone(), extractor.clone())
                .with_progress_sink(sink.clone());
        if has_vector {
            orchestrator = orchestrator.with_vector_search(vector.clone());
        }

        Self {
            oracle,
            web,
            extractor,
            vector,
            sink,
            orchestrator,
        }
    }
}
