use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::i18n::TargetLanguage;
use crate::research::orchestrator::OrchestratorSettings;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "deep-research.toml";

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "moonshot")]
    Moonshot,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Moonshot => write!(f, "moonshot"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Mistral => write!(f, "mistral"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "moonshot" => Ok(LLMProvider::Moonshot),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "mistral" => Ok(LLMProvider::Mistral),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "gemini" => Ok(LLMProvider::Gemini),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 研究报告输出目录
    pub output_path: PathBuf,

    /// 报告语言
    pub target_language: TargetLanguage,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 研究循环配置
    pub research: ResearchConfig,

    /// 外部数据源配置
    pub sources: SourcesConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 高能效模型，用于每轮规划与内容提取
    pub model_efficient: String,

    /// 高质量模型，提示词过长或efficient失效时兜底
    pub model_powerful: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 连接检查的重试次数，研究过程中的调用不重试
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 单次模型调用的超时时间（秒）
    pub timeout_seconds: u64,
}

/// 研究循环配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ResearchConfig {
    /// 默认最大轮次
    pub max_iterations: u32,

    /// 默认时间预算（分钟）
    pub time_limit_minutes: u64,

    /// 剩余时间不超过该值（分钟）时不再开始新一轮
    pub min_remaining_minutes: u64,

    /// 每轮最多提取的检索结果数
    pub max_urls_per_round: usize,

    /// 向量检索返回条数
    pub vector_top_k: usize,

    /// 网页检索后的默认提取指令，`{topic}` 会被替换为检索主题
    pub default_extraction_prompt: String,
}

/// 外部数据源配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SourcesConfig {
    /// 网页检索服务地址，未配置时网页检索每轮都会报错并跳过
    pub search_api_url: Option<String>,

    pub search_api_key: String,

    /// 每次检索请求的结果数
    pub search_max_results: usize,

    /// 向量库服务地址，未配置时跳过向量检索
    pub vector_api_url: Option<String>,

    pub vector_api_key: String,

    /// 单次HTTP请求超时（秒）
    pub request_timeout_seconds: u64,

    pub user_agent: String,

    /// 每个网页交给模型的最大字符数
    pub max_page_chars: usize,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 指定了路径则必须能读取；否则尝试当前目录下的默认配置文件
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

impl ResearchConfig {
    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            min_remaining: Duration::from_secs(self.min_remaining_minutes.saturating_mul(60)),
            max_urls_per_round: self.max_urls_per_round,
            vector_top_k: self.vector_top_k,
            extraction_prompt_template: self.default_extraction_prompt.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./research.out"),
            target_language: TargetLanguage::default(),
            llm: LLMConfig::default(),
            research: ResearchConfig::default(),
            sources: SourcesConfig::default(),
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("DEEP_RESEARCH_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api-inference.modelscope.cn/v1"),
            model_efficient: String::from("Qwen/Qwen3-Next-80B-A3B-Instruct"),
            model_powerful: String::from("Qwen/Qwen3-235B-A22B-Instruct-2507"),
            max_tokens: 131072,
            temperature: 0.1,
            retry_attempts: 5,
            retry_delay_ms: 5000,
            timeout_seconds: 300,
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        let settings = OrchestratorSettings::default();
        Self {
            max_iterations: 15,
            time_limit_minutes: 10,
            min_remaining_minutes: settings.min_remaining.as_secs() / 60,
            max_urls_per_round: settings.max_urls_per_round,
            vector_top_k: settings.vector_top_k,
            default_extraction_prompt: settings.extraction_prompt_template,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            search_api_url: None,
            search_api_key: std::env::var("DEEP_RESEARCH_SEARCH_API_KEY").unwrap_or_default(),
            search_max_results: 5,
            vector_api_url: None,
            vector_api_key: std::env::var("DEEP_RESEARCH_VECTOR_API_KEY").unwrap_or_default(),
            request_timeout_seconds: 30,
            user_agent: format!("deep-research/{}", env!("CARGO_PKG_VERSION")),
            max_page_chars: 12_000,
        }
    }
}
