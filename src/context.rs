use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::llm::client::LLMClient;
use crate::providers::extraction::FetchExtractionProvider;
use crate::providers::vector::HttpVectorSearchProvider;
use crate::providers::web_search::HttpWebSearchProvider;
use crate::providers::{UnconfiguredWebSearch, WebSearchProvider};
use crate::research::oracle::Oracle;
use crate::research::orchestrator::ResearchOrchestrator;
use crate::research::progress::{ConsoleProgressSink, ProgressSink};
use crate::research::synthesis::SynthesisStage;

pub struct ResearchContext {
    /// LLM调用器，同时作为规划、综合与内容提取的oracle
    pub llm_client: Arc<LLMClient>,
    /// 配置
    pub config: Config,
    /// 按配置装配好的研究编排器
    pub orchestrator: ResearchOrchestrator,
}

impl ResearchContext {
    /// 创建新的研究上下文
    pub fn new(config: Config) -> Result<Self> {
        let llm_client = Arc::new(LLMClient::new(&config.llm).context("Failed to create LLM client")?);
        let progress = Arc::new(ConsoleProgressSink::new(config.verbose));
        let orchestrator = build_orchestrator(&config, llm_client.clone(), progress)?;

        Ok(Self {
            llm_client,
            config,
            orchestrator,
        })
    }
}

/// 根据数据源配置装配编排器
///
/// 未配置检索服务时网页检索每轮都会以错误事件结束；未配置向量库时向量检索被跳过。
pub fn build_orchestrator(
    config: &Config,
    oracle: Arc<dyn Oracle>,
    progress: Arc<dyn ProgressSink>,
) -> Result<ResearchOrchestrator> {
    let sources = &config.sources;

    let web_search: Arc<dyn WebSearchProvider> = match &sources.search_api_url {
        Some(endpoint) => Arc::new(
            HttpWebSearchProvider::new(sources, endpoint.as_str())
                .context("Failed to create web search client")?,
        ),
        None => {
            eprintln!("⚠️ 警告: 未配置网页检索服务 (sources.search_api_url)，网页检索将不可用");
            Arc::new(UnconfiguredWebSearch)
        }
    };

    let extractor = Arc::new(
        FetchExtractionProvider::new(sources, oracle.clone())
            .context("Failed to create page fetch client")?,
    );

    let mut orchestrator = ResearchOrchestrator::new(oracle.clone(), web_search, extractor)
        .with_synthesis(SynthesisStage::new(oracle, &config.target_language))
        .with_settings(config.research.orchestrator_settings())
        .with_progress_sink(progress);

    if let Some(endpoint) = &sources.vector_api_url {
        let vector = HttpVectorSearchProvider::new(sources, endpoint.as_str())
            .context("Failed to create vector store client")?;
        orchestrator = orchestrator.with_vector_search(Arc::new(vector));
    }

    Ok(orchestrator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::progress::NoopProgressSink;
    use crate::research::testing::{STOP, SYNTHESIS, ScriptedOracle};
    use crate::research::types::ResearchRequest;

    #[tokio::test]
    async fn test_orchestrator_without_sources_still_runs() {
        let mut config = Config::default();
        config.research.max_urls_per_round = 4;

        let orchestrator = build_orchestrator(
            &config,
            Arc::new(ScriptedOracle::new(&[STOP, SYNTHESIS])),
            Arc::new(NoopProgressSink),
        )
        .unwrap();
        assert_eq!(orchestrator.settings().max_urls_per_round, 4);

        let outcome = orchestrator
            .run(&ResearchRequest::new("Acme Corp pricing strategy").with_vector_db("sales"))
            .await
            .unwrap();
        assert_eq!(outcome.stats.total_iterations, 1);
        assert_eq!(outcome.stats.vector_sources, 0);
    }

    #[test]
    fn test_orchestrator_with_configured_sources() {
        let mut config = Config::default();
        config.sources.search_api_url = Some("https://search.example/v1/search".to_string());
        config.sources.vector_api_url = Some("http://localhost:6333".to_string());

        let orchestrator = build_orchestrator(
            &config,
            Arc::new(ScriptedOracle::new(&[])),
            Arc::new(NoopProgressSink),
        );
        assert!(orchestrator.is_ok());
    }
}
