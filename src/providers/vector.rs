//! 工作区级别的向量库检索

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::SourcesConfig;
use crate::providers::{ProviderError, VectorSearchProvider, read_success_body};
use crate::research::types::Finding;

const SERVICE: &str = "vector store";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VectorQueryRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct VectorQueryResponse {
    #[serde(default)]
    results: Vec<VectorHit>,
}

#[derive(Debug, Deserialize)]
struct VectorHit {
    #[serde(alias = "id", alias = "title")]
    source: String,
    #[serde(alias = "content", alias = "text")]
    payload: String,
    score: f32,
}

/// `POST {endpoint}/workspaces/{workspace}/search`
#[derive(Debug, Clone)]
pub struct HttpVectorSearchProvider {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl HttpVectorSearchProvider {
    pub fn new(config: &SourcesConfig, endpoint: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;
        let endpoint = endpoint.into();
        let endpoint = Url::parse(&endpoint)
            .context(format!("Invalid vector store endpoint: {}", endpoint))?;
        Ok(Self {
            http,
            endpoint,
            api_key: config.vector_api_key.clone(),
        })
    }

    /// 工作区名称作为单个路径段编码，不能改变请求的路径或查询串
    fn search_url(&self, workspace: &str) -> Result<Url, ProviderError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidEndpoint {
                service: SERVICE,
                endpoint: self.endpoint.to_string(),
            })?
            .pop_if_empty()
            .extend(["workspaces", workspace, "search"]);
        Ok(url)
    }

    fn decode(body: &str, top_k: usize) -> Result<Vec<Finding>, ProviderError> {
        let response: VectorQueryResponse =
            serde_json::from_str(body).map_err(|e| ProviderError::Decode {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let mut hits = response.results;
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(hits
            .into_iter()
            .take(top_k)
            .map(|hit| Finding::vector(hit.source, hit.payload, hit.score))
            .collect())
    }
}

#[async_trait]
impl VectorSearchProvider for HttpVectorSearchProvider {
    async fn query(
        &self,
        text: &str,
        workspace: &str,
        top_k: usize,
    ) -> Result<Vec<Finding>, ProviderError> {
        let mut request = self
            .http
            .post(self.search_url(workspace)?)
            .json(&VectorQueryRequest { query: text, top_k });
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|source| ProviderError::Http {
            service: SERVICE,
            source,
        })?;
        let body = read_success_body(SERVICE, response).await?;
        Self::decode(&body, top_k)
    }
}
