//! 研究编排器使用的三类数据源

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::research::types::Finding;

pub mod extraction;
pub mod vector;
pub mod web_search;

pub use extraction::FetchExtractionProvider;
pub use vector::HttpVectorSearchProvider;
pub use web_search::HttpWebSearchProvider;

/// 数据源调用错误，对研究运行来说都是可恢复的
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("request to {service} failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} responded with status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to decode {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("{service} endpoint cannot carry a path: {endpoint}")]
    InvalidEndpoint {
        service: &'static str,
        endpoint: String,
    },

    #[error("unsupported url (only http and https can be fetched): {0}")]
    UnsupportedUrl(String),

    #[error("no readable content at {0}")]
    EmptyContent(String),

    #[error("extraction model call failed: {0}")]
    Oracle(String),
}

/// 一条网页检索结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "content", alias = "description")]
    pub snippet: String,
}

/// 语义近邻检索
#[async_trait]
pub trait VectorSearchProvider: Send + Sync {
    /// 返回的每条 Finding 都是 `OriginKind::Vector` 且带有相似度
    async fn query(
        &self,
        text: &str,
        workspace: &str,
        top_k: usize,
    ) -> Result<Vec<Finding>, ProviderError>;
}

/// 关键词/主题检索，结果按相关度排序
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ProviderError>;
}

/// 按自然语言指令抓取并提炼页面内容
#[async_trait]
pub trait ContentExtractionProvider: Send + Sync {
    /// 返回的 Finding 为 `OriginKind::Web`
    async fn extract(
        &self,
        urls: &[String],
        extraction_prompt: &str,
    ) -> Result<Finding, ProviderError>;
}

/// 未配置检索服务时的占位实现，每次调用都报告 [`ProviderError::NotConfigured`]
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredWebSearch;

#[async_trait]
impl WebSearchProvider for UnconfiguredWebSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, ProviderError> {
        Err(ProviderError::NotConfigured("web search"))
    }
}

/// 读取响应体；非 2xx 状态转换为 [`ProviderError::Status`]
pub(crate) async fn read_success_body(
    service: &'static str,
    response: reqwest::Response,
) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| ProviderError::Http { service, source })?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            service,
            status: status.as_u16(),
            body: truncate_chars(&body, 512),
        });
    }
    Ok(body)
}

/// 按字符数截断，保证不会切断 UTF-8 字符
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
