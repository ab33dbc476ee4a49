use anyhow::Result;
use std::time::Instant;

use crate::config::Config;
use crate::context::ResearchContext;
use crate::outlet::{DiskOutlet, Outlet};
use crate::research::tool::{DeepResearchInput, ToolResponse, run_tool};

/// 启动深度研究工作流：检查模型连接 → 执行研究 → 保存结果
///
/// 研究本身的失败体现在返回的 [`ToolResponse`] 中；只有装配、连接检查和存储失败才返回错误。
pub async fn launch(config: &Config, input: &DeepResearchInput) -> Result<ToolResponse> {
    let context = ResearchContext::new(config.clone())?;

    // 启动时检查模型连接
    context.llm_client.check_connection().await?;

    let started_at = Instant::now();
    let response = run_tool(&context.orchestrator, input, &config.research).await;

    let outlet = DiskOutlet::new(&config.output_path, &config.target_language);
    outlet.save(&input.topic, &response).await?;

    match &response.error {
        None => println!(
            "🎉 研究完成，总耗时 {:.1} 秒",
            started_at.elapsed().as_secs_f64()
        ),
        Some(error) => eprintln!("❌ 研究失败: {}", error),
    }

    Ok(response)
}
