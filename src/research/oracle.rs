use anyhow::Result;
use async_trait::async_trait;

/// 文本生成服务：输入提示词，返回自由文本
///
/// 返回 `Err` 仅表示传输层面的失败（网络、鉴权、超时等），
/// 对于无法解析的回复，调用方自行处理。
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}
