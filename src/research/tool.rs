//! `deep_research` 工具的调用契约：宽松的JSON输入 → 统一的成功/失败信封

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::ResearchConfig;
use crate::research::orchestrator::ResearchOrchestrator;
use crate::research::types::{
    Finding, OriginKind, ResearchOutcome, ResearchRequest, ResearchStats, SynthesisResult,
};

/// 工具输入，未给出的字段使用 [`ResearchConfig`] 中的默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepResearchInput {
    pub topic: String,
    #[serde(default, rename = "useVectorDB")]
    pub use_vector_db: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    /// 时间预算（分钟）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u64>,
}

impl DeepResearchInput {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            use_vector_db: false,
            workspace: None,
            max_iterations: None,
            time_limit: None,
        }
    }

    pub fn to_request(&self, defaults: &ResearchConfig) -> ResearchRequest {
        ResearchRequest {
            topic: self.topic.clone(),
            use_vector_db: self.use_vector_db,
            workspace: self.workspace.clone(),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            time_limit_minutes: self.time_limit.unwrap_or(defaults.time_limit_minutes),
        }
    }
}

/// 成功时返回给调用方的研究报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchReport {
    pub summary: String,
    pub findings: Vec<Finding>,
    /// 仅在请求了向量库时出现
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_insights: Option<Vec<Finding>>,
    pub web_insights: Vec<Finding>,
    pub synthesis: SynthesisResult,
    pub research_stats: ResearchStats,
}

impl ResearchReport {
    pub fn from_outcome(outcome: ResearchOutcome, use_vector_db: bool) -> Self {
        let by_origin = |kind: OriginKind| -> Vec<Finding> {
            outcome
                .findings
                .iter()
                .filter(|f| f.origin_kind() == kind)
                .cloned()
                .collect()
        };
        let vector_insights = use_vector_db.then(|| by_origin(OriginKind::Vector));
        let web_insights = by_origin(OriginKind::Web);

        Self {
            summary: outcome.synthesis.summary.clone(),
            findings: outcome.findings,
            vector_insights,
            web_insights,
            synthesis: outcome.synthesis,
            research_stats: outcome.stats,
        }
    }
}

/// `{ success, data? , error? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResearchReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResponse {
    pub fn success(report: ResearchReport) -> Self {
        Self {
            success: true,
            data: Some(report),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// 执行一次工具调用，任何失败都折叠为 `success: false`
pub async fn run_tool(
    orchestrator: &ResearchOrchestrator,
    input: &DeepResearchInput,
    defaults: &ResearchConfig,
) -> ToolResponse {
    let request = input.to_request(defaults);
    match orchestrator.run(&request).await {
        Ok(outcome) => ToolResponse::success(ResearchReport::from_outcome(
            outcome,
            request.use_vector_db,
        )),
        Err(e) => {
            error!(topic = request.topic.as_str(), error = %e, "deep research failed");
            ToolResponse::failure(e.to_string())
        }
    }
}

/// 直接接收未校验的JSON参数
pub async fn run_tool_json(
    orchestrator: &ResearchOrchestrator,
    raw: serde_json::Value,
    defaults: &ResearchConfig,
) -> ToolResponse {
    match serde_json::from_value::<DeepResearchInput>(raw) {
        Ok(input) => run_tool(orchestrator, &input, defaults).await,
        Err(e) => ToolResponse::failure(format!("invalid tool input: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::testing::{Harness, STOP, SYNTHESIS, ScriptedOracle, StubWebSearch};
    use serde_json::json;

    #[test]
    fn test_input_defaults_from_config() {
        let input: DeepResearchInput =
            serde_json::from_value(json!({ "topic": "Acme Corp pricing strategy" })).unwrap();
        let defaults = ResearchConfig {
            max_iterations: 7,
            time_limit_minutes: 20,
            ..Default::default()
        };

        let request = input.to_request(&defaults);
        assert_eq!(request.max_iterations, 7);
        assert_eq!(request.time_limit_minutes, 20);
        assert!(!request.use_vector_db);
    }

    #[test]
    fn test_input_field_names() {
        let input: DeepResearchInput = serde_json::from_value(json!({
            "topic": "t",
            "useVectorDB": true,
            "workspace": "ws-1",
            "maxIterations": 3,
            "timeLimit": 5
        }))
        .unwrap();

        let request = input.to_request(&ResearchConfig::default());
        assert!(request.use_vector_db);
        assert_eq!(request.workspace.as_deref(), Some("ws-1"));
        assert_eq!(request.max_iterations, 3);
        assert_eq!(request.time_limit_minutes, 5);
    }

    #[test]
    fn test_report_splits_findings_by_origin() {
        let outcome = ResearchOutcome {
            synthesis: SynthesisResult::degraded(),
            findings: vec![
                Finding::vector("memo#1", "internal memo", 0.8),
                Finding::web("https://acme.example", "public page"),
            ],
            stats: ResearchStats {
                total_iterations: 1,
                time_spent_minutes: 0.5,
                vector_sources: 1,
                web_sources: 1,
            },
        };

        let report = ResearchReport::from_outcome(outcome.clone(), true);
        assert_eq!(report.vector_insights.as_ref().map(Vec::len), Some(1));
        assert_eq!(report.web_insights.len(), 1);
        assert_eq!(report.summary, SynthesisResult::FAILURE_SUMMARY);

        let without_vector = ResearchReport::from_outcome(outcome, false);
        let value = serde_json::to_value(&without_vector).unwrap();
        assert!(value.get("vectorInsights").is_none());
        assert_eq!(value["researchStats"]["totalIterations"], 1);
        assert_eq!(value["webInsights"][0]["originKind"], "web");
    }

    #[tokio::test]
    async fn test_run_tool_success_envelope() {
        let harness = Harness::new(ScriptedOracle::new(&[STOP, SYNTHESIS]), StubWebSearch::default());
        let raw = json!({ "topic": "Acme Corp pricing strategy", "maxIterations": 1, "timeLimit": 10 });

        let response = run_tool_json(&harness.orchestrator, raw, &ResearchConfig::default()).await;
        assert!(response.success);
        assert!(response.error.is_none());

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"]["summary"], "final report");
        assert_eq!(value["data"]["researchStats"]["totalIterations"], 1);
        assert_eq!(value["data"]["findings"], json!([]));
    }

    #[tokio::test]
    async fn test_huge_time_limit_runs_to_completion() {
        let harness = Harness::new(ScriptedOracle::new(&[STOP, SYNTHESIS]), StubWebSearch::default());
        let raw = json!({
            "topic": "Acme Corp pricing strategy",
            "maxIterations": 1,
            "timeLimit": u64::MAX / 60 + 1
        });

        let response = run_tool_json(&harness.orchestrator, raw, &ResearchConfig::default()).await;
        assert!(response.success, "unexpected failure: {:?}", response.error);
        let report = response.data.unwrap();
        assert_eq!(report.research_stats.total_iterations, 1);
        assert_eq!(report.summary, "final report");
    }

    #[tokio::test]
    async fn test_run_tool_failure_envelopes() {
        let harness = Harness::new(ScriptedOracle::new(&[]), StubWebSearch::default());
        let defaults = ResearchConfig::default();

        let missing_topic = run_tool_json(&harness.orchestrator, json!({ "timeLimit": 5 }), &defaults).await;
        assert!(!missing_topic.success);
        assert!(missing_topic.error.unwrap().starts_with("invalid tool input"));

        let negative = run_tool_json(
            &harness.orchestrator,
            json!({ "topic": "t", "maxIterations": -1 }),
            &defaults,
        )
        .await;
        assert!(!negative.success);

        let empty = run_tool(&harness.orchestrator, &DeepResearchInput::new(""), &defaults).await;
        assert!(!empty.success);
        assert!(empty.data.is_none());
        let value = serde_json::to_value(&empty).unwrap();
        assert!(value.get("data").is_none());
        assert!(value["error"].as_str().unwrap().contains("topic"));
    }
}
