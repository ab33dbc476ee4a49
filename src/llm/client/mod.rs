//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::LLMConfig;
use crate::research::oracle::Oracle;

mod providers;
pub mod utils;

use providers::ProviderClient;
use utils::evaluate_befitting_model;

/// 两次重试之间的最长等待
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    client: ProviderClient,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let client = ProviderClient::new(config)?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self) -> Result<()> {
        println!("🔄 正在检查模型连接...");
        match self
            .prompt_with_model(
                "You are a helpful assistant.",
                "Hello",
                &self.config.model_efficient,
            )
            .await
        {
            Ok(_) => {
                println!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ 模型连接失败: {}", e);
                Err(e)
            }
        }
    }

    /// 通用重试逻辑，每次失败后等待时间翻倍
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_retries = self.config.retry_attempts.max(1);
        let mut delay = Duration::from_millis(self.config.retry_delay_ms);
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    if retries >= max_retries {
                        return Err(err);
                    }
                    eprintln!(
                        "❌ 调用模型服务出错，重试中 (第 {} / {}次尝试): {}",
                        retries, max_retries, err
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY);
                }
            }
        }
    }

    /// 单轮对话，按提示词长度选择模型，只尝试一次
    ///
    /// 研究循环的每次oracle调用都走这里：失败或超时直接返回错误，不重试也不切换模型。
    pub async fn prompt_once(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let model = evaluate_befitting_model(&self.config, system_prompt, user_prompt);
        let agent = self
            .client
            .create_agent(&model, system_prompt, &self.config);
        let timeout = Duration::from_secs(self.config.timeout_seconds);
        attempt_with_timeout(&model, timeout, agent.prompt(user_prompt)).await
    }

    /// 带重试的单轮对话，仅用于连接检查
    async fn prompt_with_model(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
    ) -> Result<String> {
        let agent = self
            .client
            .create_agent(model, system_prompt, &self.config);
        let timeout = Duration::from_secs(self.config.timeout_seconds);

        self.retry_with_backoff(|| attempt_with_timeout(model, timeout, agent.prompt(user_prompt)))
            .await
    }
}

/// 执行一次模型调用，超过 `timeout` 即视为失败
async fn attempt_with_timeout<F>(model: &str, timeout: Duration, call: F) -> Result<String>
where
    F: Future<Output = Result<String>>,
{
    debug!(model, "calling model");
    match tokio::time::timeout(timeout, call).await {
        Ok(reply) => reply,
        Err(_) => {
            warn!(model, timeout_seconds = timeout.as_secs(), "model call timed out");
            Err(anyhow!("model {} timed out after {:?}", model, timeout))
        }
    }
}

#[async_trait]
impl Oracle for LLMClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.prompt_once(system_prompt, user_prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_fails_at_timeout() {
        let started = Instant::now();
        let result = attempt_with_timeout("small", Duration::from_secs(300), async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("late reply".to_string())
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(300));
        assert!(elapsed < Duration::from_secs(301));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_call_is_not_retried() {
        let attempts = AtomicUsize::new(0);
        let started = Instant::now();
        let result = attempt_with_timeout("small", Duration::from_secs(300), async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("connection refused"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_call_passes_through() {
        let reply = attempt_with_timeout("small", Duration::from_secs(300), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok("ok".to_string())
        })
        .await
        .unwrap();
        assert_eq!(reply, "ok");
    }
}
