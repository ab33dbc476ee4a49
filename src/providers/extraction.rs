//! 抓取网页并由模型按指令提炼内容

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SourcesConfig;
use crate::providers::{ContentExtractionProvider, ProviderError, read_success_body, truncate_chars};
use crate::research::oracle::Oracle;
use crate::research::types::Finding;

const SERVICE: &str = "page fetch";

const EXTRACTION_SYSTEM_PROMPT: &str = r#"你是一名信息提取助手。你会收到一个或多个网页的正文文本以及一条提取指令。
请严格依据网页内容完成提取，保留具体的数字、名称、日期和原始表述，不要编造网页中不存在的信息。
如果网页内容与指令无关，请直接说明未找到相关信息。"#;

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid regex"));
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// 去掉脚本、样式与标签，返回压缩空白后的正文
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(html, " ");
    let text = STYLE_BLOCK.replace_all(&text, " ");
    let text = TAG.replace_all(&text, " ");
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

/// 内容提取：reqwest 抓取页面，再交给模型按提取指令整理
pub struct FetchExtractionProvider {
    http: reqwest::Client,
    oracle: Arc<dyn Oracle>,
    max_page_chars: usize,
}

impl FetchExtractionProvider {
    pub fn new(config: &SourcesConfig, oracle: Arc<dyn Oracle>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            oracle,
            max_page_chars: config.max_page_chars,
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<String, ProviderError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ProviderError::UnsupportedUrl(url.to_string()));
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ProviderError::Http {
                service: SERVICE,
                source,
            })?;
        let html = read_success_body(SERVICE, response).await?;
        let text = html_to_text(&html);
        if text.is_empty() {
            return Err(ProviderError::EmptyContent(url.to_string()));
        }
        Ok(truncate_chars(&text, self.max_page_chars))
    }
}

#[async_trait]
impl ContentExtractionProvider for FetchExtractionProvider {
    async fn extract(
        &self,
        urls: &[String],
        extraction_prompt: &str,
    ) -> Result<Finding, ProviderError> {
        let mut pages = Vec::new();
        let mut last_error = None;

        for url in urls {
            match self.fetch_page(url).await {
                Ok(text) => pages.push((url.as_str(), text)),
                Err(e) => {
                    warn!(url = url.as_str(), error = %e, "page fetch failed");
                    last_error = Some(e);
                }
            }
        }

        if pages.is_empty() {
            return Err(last_error.unwrap_or_else(|| ProviderError::EmptyContent(urls.join(", "))));
        }

        let mut user_prompt = format!("## 提取指令\n{}\n\n## 网页内容\n", extraction_prompt);
        for (url, text) in &pages {
            user_prompt.push_str(&format!("### {}\n{}\n\n", url, text));
        }

        let extracted = self
            .oracle
            .complete(EXTRACTION_SYSTEM_PROMPT, &user_prompt)
            .await
            .map_err(|e| ProviderError::Oracle(e.to_string()))?;
        debug!(pages = pages.len(), chars = extracted.len(), "extraction finished");

        let source = pages
            .iter()
            .map(|(url, _)| *url)
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Finding::web(source, extracted))
    }
}
