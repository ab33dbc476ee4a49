use crate::config::{Config, LLMProvider};
use crate::i18n::TargetLanguage;
use crate::research::tool::DeepResearchInput;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// deep-research - 预算受限的迭代式深度研究引擎
#[derive(Parser, Debug)]
#[command(name = "deep-research")]
#[command(
    about = "Budget-bounded iterative research engine: plans each round with an LLM, queries web search, page extraction and an optional vector store, then synthesizes a structured report."
)]
#[command(version)]
pub struct Args {
    /// 研究主题
    pub topic: String,

    /// 是否使用向量库
    #[arg(long)]
    pub use_vector_db: bool,

    /// 向量库工作区
    #[arg(short, long)]
    pub workspace: Option<String>,

    /// 最大研究轮次
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// 时间预算（分钟）
    #[arg(long)]
    pub time_limit: Option<u64>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 输出路径
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// 高能效模型，用于每轮规划与内容提取
    #[arg(long)]
    pub model_efficient: Option<String>,

    /// 高质量模型，提示词过长或efficient失效时兜底
    #[arg(long)]
    pub model_powerful: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// LLM Provider (openai, moonshot, deepseek, mistral, openrouter, anthropic, gemini, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// 报告语言 (zh, en, ja, ko, de, fr, ru)
    #[arg(long)]
    pub target_language: Option<String>,

    /// 网页检索服务地址
    #[arg(long)]
    pub search_endpoint: Option<String>,

    /// 向量库服务地址
    #[arg(long)]
    pub vector_endpoint: Option<String>,
}

impl Args {
    /// 将CLI参数转换为配置与工具输入
    pub fn into_parts(self) -> Result<(Config, DeepResearchInput)> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(output_path) = self.output_path {
            config.output_path = output_path;
        }

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model_efficient) = self.model_efficient {
            config.llm.model_efficient = model_efficient;
        }
        if let Some(model_powerful) = self.model_powerful {
            config.llm.model_powerful = model_powerful;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }

        // 目标语言配置
        if let Some(target_language_str) = self.target_language {
            if let Ok(target_language) = target_language_str.parse::<TargetLanguage>() {
                config.target_language = target_language;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的目标语言: {}，使用 {}",
                    target_language_str,
                    config.target_language.display_name()
                );
            }
        }

        // 数据源配置
        if let Some(search_endpoint) = self.search_endpoint {
            config.sources.search_api_url = Some(search_endpoint);
        }
        if let Some(vector_endpoint) = self.vector_endpoint {
            config.sources.vector_api_url = Some(vector_endpoint);
        }

        if self.verbose {
            config.verbose = true;
        }

        let input = DeepResearchInput {
            topic: self.topic,
            use_vector_db: self.use_vector_db,
            workspace: self.workspace,
            max_iterations: self.max_iterations,
            time_limit: self.time_limit,
        };

        Ok((config, input))
    }
}
