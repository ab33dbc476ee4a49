use schemars::JsonSchema;
use serde::Deserialize;
use std::fmt::Write;
use std::sync::Arc;
use tracing::debug;

use crate::research::error::ResearchError;
use crate::research::json::parse_object;
use crate::research::oracle::Oracle;
use crate::research::types::{AnalysisResult, Finding, OriginKind, ResearchState, Strategy};

const PLANNER_PREAMBLE: &str = r#"你是一名严谨的研究规划员，负责推进一项有时间和轮次预算的迭代式研究。

每一轮你会看到研究主题、预算使用情况以及目前为止收集到的全部证据。你的任务是：
1. 总结目前已经掌握的信息
2. 找出仍然存在的知识缺口
3. 决定是否需要继续研究；如果已有证据足以回答主题，或剩余预算已不值得再检索，请停止
4. 如果继续，从下面三种动作中只选择一种：
   - nextSearchTopic：用于网页检索的查询，会对排名靠前的结果做内容提取
   - urlToSearch：直接提取某个已知URL的内容，可配合 extractionPrompt 说明需要提取什么
   - vectorQuery：在私有知识库中做语义检索（仅当向量检索可用时）
检索查询请使用研究主题本身的语言。

只返回一个JSON对象，不要输出任何其他内容。JSON需符合以下Schema："#;

/// oracle回复的原始结构
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct AnalysisReply {
    /// 对目前已有信息的总结
    #[serde(default)]
    summary: String,
    /// 尚未覆盖的知识缺口
    #[serde(default)]
    gaps: Vec<String>,
    /// 计划中的后续步骤
    #[serde(default)]
    next_steps: Vec<String>,
    /// 是否继续研究
    should_continue: bool,
    /// 下一步动作，三个字段中只填写一个
    #[serde(default)]
    strategy: Option<StrategyReply>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct StrategyReply {
    #[serde(default)]
    next_search_topic: Option<String>,
    #[serde(default)]
    url_to_search: Option<String>,
    #[serde(default)]
    vector_query: Option<String>,
    /// 仅在选择 urlToSearch 时使用
    #[serde(default)]
    extraction_prompt: Option<String>,
}

impl From<AnalysisReply> for AnalysisResult {
    fn from(reply: AnalysisReply) -> Self {
        let strategy = reply.strategy.unwrap_or_default();
        AnalysisResult {
            summary: reply.summary,
            gaps: reply.gaps,
            next_steps: reply.next_steps,
            should_continue: reply.should_continue,
            strategy: Strategy::from_fields(
                strategy.next_search_topic,
                strategy.url_to_search,
                strategy.vector_query,
                strategy.extraction_prompt,
            ),
        }
    }
}

/// 一次规划的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    Parsed(AnalysisResult),
    ParseFailure { reason: String },
}

/// 规划适配器：把研究状态翻译成一次oracle请求，并容错地解析回复
pub struct PlanningAdapter {
    oracle: Arc<dyn Oracle>,
    system_prompt: String,
}

impl PlanningAdapter {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        let schema = schemars::schema_for!(AnalysisReply);
        let schema = serde_json::to_string_pretty(&schema).unwrap_or_default();
        Self {
            oracle,
            system_prompt: format!("{}\n{}", PLANNER_PREAMBLE, schema),
        }
    }

    /// 请求oracle给出本轮的分析与决策
    ///
    /// 只有oracle调用本身失败时才返回 `Err`；回复无法解析时返回 [`Analysis::ParseFailure`]。
    pub async fn analyze(&self, state: &ResearchState) -> Result<Analysis, ResearchError> {
        let user_prompt = build_user_prompt(state);
        let reply = self
            .oracle
            .complete(&self.system_prompt, &user_prompt)
            .await
            .map_err(ResearchError::Oracle)?;

        match parse_object::<AnalysisReply>(&reply) {
            Ok(parsed) => Ok(Analysis::Parsed(parsed.into())),
            Err(reason) => {
                debug!(iteration = state.iteration(), %reason, "planning reply rejected");
                Ok(Analysis::ParseFailure { reason })
            }
        }
    }
}

fn build_user_prompt(state: &ResearchState) -> String {
    let mut prompt = String::new();
    let minutes = |d: std::time::Duration| d.as_secs_f64() / 60.0;

    let _ = writeln!(prompt, "## 研究主题\n{}\n", state.topic());
    let _ = writeln!(prompt, "## 研究进度");
    let _ = writeln!(
        prompt,
        "- 已用时间: {:.1} 分钟，剩余时间: {:.1} 分钟",
        minutes(state.elapsed()),
        minutes(state.remaining_budget())
    );
    let _ = writeln!(
        prompt,
        "- 当前轮次: {}/{}",
        state.iteration(),
        state.max_iterations()
    );
    let _ = writeln!(prompt, "- 当前阶段: {}", state.phase());
    let _ = writeln!(
        prompt,
        "- 向量检索: {}",
        if state.vector_available() {
            "可用"
        } else {
            "不可用，请勿选择 vectorQuery"
        }
    );
    let _ = writeln!(
        prompt,
        "- 已有证据: 向量库 {} 条，网页 {} 条\n",
        state.count_by_origin(OriginKind::Vector),
        state.count_by_origin(OriginKind::Web)
    );

    if let Some(previous) = state.last_analysis() {
        let _ = writeln!(prompt, "## 上一轮分析\n{}", previous.summary);
        if !previous.gaps.is_empty() {
            let _ = writeln!(prompt, "待补充: {}", previous.gaps.join("; "));
        }
        prompt.push('\n');
    }

    let _ = writeln!(prompt, "## 已有证据");
    if state.findings().is_empty() {
        let _ = writeln!(prompt, "（暂无）");
    } else {
        prompt.push_str(&format_findings(state.findings()));
    }

    prompt
}

/// 按来源标注的证据列表，规划与综合两个阶段共用
pub(crate) fn format_findings(findings: &[Finding]) -> String {
    let mut content = String::new();
    for (i, finding) in findings.iter().enumerate() {
        let _ = write!(
            content,
            "### [{}] ({}) {}",
            i + 1,
            finding.origin_kind(),
            finding.source()
        );
        if let Some(score) = finding.similarity_score() {
            let _ = write!(content, " 相似度: {:.3}", score);
        }
        let _ = writeln!(content, "\n{}\n", finding.payload());
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::types::ResearchRequest;
    use async_trait::async_trait;

    struct FixedOracle(Result<String, String>);

    #[async_trait]
    impl Oracle for FixedOracle {
        async fn complete(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            self.0.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    fn state() -> ResearchState {
        ResearchState::new(&ResearchRequest::new("Acme Corp pricing strategy"), false)
    }

    async fn analyze(reply: Result<&str, &str>) -> Result<Analysis, ResearchError> {
        let oracle = FixedOracle(reply.map(str::to_string).map_err(str::to_string));
        PlanningAdapter::new(Arc::new(oracle)).analyze(&state()).await
    }

    #[tokio::test]
    async fn test_parses_full_reply() {
        let reply = r#"```json
        {
            "summary": "Nothing known yet",
            "gaps": ["list prices"],
            "nextSteps": ["search the pricing page"],
            "shouldContinue": true,
            "strategy": { "nextSearchTopic": "Acme Corp pricing tiers", "vectorQuery": "pricing" }
        }
        ```"#;

        let Analysis::Parsed(result) = analyze(Ok(reply)).await.unwrap() else {
            panic!("expected parsed analysis");
        };
        assert_eq!(result.summary, "Nothing known yet");
        assert_eq!(result.gaps, vec!["list prices".to_string()]);
        assert!(result.should_continue);
        assert_eq!(
            result.strategy,
            Strategy::SearchTopic {
                topic: "Acme Corp pricing tiers".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_strategy_is_noop() {
        let Analysis::Parsed(result) = analyze(Ok(r#"{"shouldContinue": true, "strategy": null}"#))
            .await
            .unwrap()
        else {
            panic!("expected parsed analysis");
        };
        assert!(result.strategy.is_none());
        assert!(result.next_steps.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_reply_is_parse_failure() {
        let outcome = analyze(Ok("I think we should keep going.")).await.unwrap();
        assert!(matches!(outcome, Analysis::ParseFailure { .. }));

        let outcome = analyze(Ok(r#"{"summary": "no decision"}"#)).await.unwrap();
        assert!(matches!(outcome, Analysis::ParseFailure { .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_is_error() {
        let outcome = analyze(Err("connection reset")).await;
        assert!(matches!(outcome, Err(ResearchError::Oracle(_))));
    }

    #[test]
    fn test_prompt_contains_progress_and_findings() {
        let mut state = state();
        state.push_finding(Finding::web("https://acme.example/pricing", "Pro plan costs $49"));
        state.push_finding(Finding::vector("handbook.pdf#2", "Discount policy", 0.91));
        state.begin_round();

        let prompt = build_user_prompt(&state);
        assert!(prompt.contains("Acme Corp pricing strategy"));
        assert!(prompt.contains("1/15"));
        assert!(prompt.contains("向量库 1 条，网页 1 条"));
        assert!(prompt.contains("Pro plan costs $49"));
        assert!(prompt.contains("(vector) handbook.pdf#2"));
        assert!(prompt.contains("请勿选择 vectorQuery"));
    }
}
