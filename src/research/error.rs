use thiserror::Error;

/// 研究运行的致命错误
///
/// 数据源调用失败和oracle输出解析失败都不会出现在这里，它们在调用点就地恢复。
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("invalid research request: {0}")]
    InvalidInput(String),

    #[error("oracle call failed: {0}")]
    Oracle(#[source] anyhow::Error),
}
