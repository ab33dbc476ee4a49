//! 基于 HTTP JSON 接口的网页检索

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::SourcesConfig;
use crate::providers::{ProviderError, SearchHit, WebSearchProvider, read_success_body};

const SERVICE: &str = "web search";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// 兼容 `POST {endpoint}` / `{"query", "max_results"}` → `{"results": [{url, title, content}]}` 形式的检索服务
#[derive(Debug, Clone)]
pub struct HttpWebSearchProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_results: usize,
}

impl HttpWebSearchProvider {
    pub fn new(config: &SourcesConfig, endpoint: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: config.search_api_key.clone(),
            max_results: config.search_max_results,
        })
    }

    fn decode(body: &str) -> Result<Vec<SearchHit>, ProviderError> {
        let response: SearchResponse =
            serde_json::from_str(body).map_err(|e| ProviderError::Decode {
                service: SERVICE,
                message: e.to_string(),
            })?;
        Ok(response
            .results
            .into_iter()
            .filter(|hit| !hit.url.trim().is_empty())
            .collect())
    }
}

#[async_trait]
impl WebSearchProvider for HttpWebSearchProvider {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ProviderError> {
        let mut request = self.http.post(&self.endpoint).json(&SearchRequest {
            query,
            max_results: self.max_results,
        });
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|source| ProviderError::Http {
            service: SERVICE,
            source,
        })?;
        let body = read_success_body(SERVICE, response).await?;
        let hits = Self::decode(&body)?;
        debug!(query, hits = hits.len(), "web search finished");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_drops_hits_without_url() {
        let body = r#"{"results": [
            {"url": "https://acme.example/pricing", "title": "Pricing", "content": "Plans"},
            {"url": "  ", "title": "Broken"}
        ]}"#;
        let hits = HttpWebSearchProvider::decode(body).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Pricing");
    }

    #[test]
    fn test_decode_empty_and_invalid() {
        assert!(HttpWebSearchProvider::decode("{}").unwrap().is_empty());
        assert!(matches!(
            HttpWebSearchProvider::decode("<html>"),
            Err(ProviderError::Decode { .. })
        ));
    }
}
