use std::sync::Arc;
use tracing::warn;

use crate::i18n::TargetLanguage;
use crate::research::error::ResearchError;
use crate::research::json::parse_object;
use crate::research::oracle::Oracle;
use crate::research::planner::format_findings;
use crate::research::types::{Finding, ResearchStats, SynthesisResult};

const SYNTHESIS_PREAMBLE: &str = r#"你是一名资深研究分析师。你会收到一项研究的主题、运行统计以及全部带来源标注的证据。
请综合所有证据，给出：
1. 对研究主题的总体结论
2. 最关键的发现（尽量引用具体数字与来源）
3. 贯穿证据的主要主题
4. 证据不足、互相矛盾或存在不确定性的地方
5. 值得继续研究的方向

如果没有任何证据，请如实说明并给出建议的研究方向。
只返回一个JSON对象，不要输出任何其他内容。JSON需符合以下Schema："#;

/// 综合阶段：研究循环结束后对全部证据做一次总结
pub struct SynthesisStage {
    oracle: Arc<dyn Oracle>,
    system_prompt: String,
}

impl SynthesisStage {
    pub fn new(oracle: Arc<dyn Oracle>, target_language: &TargetLanguage) -> Self {
        let schema = schemars::schema_for!(SynthesisResult);
        let schema = serde_json::to_string_pretty(&schema).unwrap_or_default();
        Self {
            oracle,
            system_prompt: format!(
                "{}\n{}\n\n{}",
                SYNTHESIS_PREAMBLE,
                schema,
                target_language.prompt_instruction()
            ),
        }
    }

    /// 回复无法解析时返回 [`SynthesisResult::degraded`]，只有oracle调用失败才返回错误
    pub async fn synthesize(
        &self,
        topic: &str,
        findings: &[Finding],
        stats: &ResearchStats,
    ) -> Result<SynthesisResult, ResearchError> {
        let user_prompt = build_user_prompt(topic, findings, stats);
        let reply = self
            .oracle
            .complete(&self.system_prompt, &user_prompt)
            .await
            .map_err(ResearchError::Oracle)?;

        match parse_object::<SynthesisResult>(&reply) {
            Ok(result) => Ok(result),
            Err(reason) => {
                warn!(%reason, "synthesis reply rejected, using degraded result");
                Ok(SynthesisResult::degraded())
            }
        }
    }
}

fn build_user_prompt(topic: &str, findings: &[Finding], stats: &ResearchStats) -> String {
    let evidence = if findings.is_empty() {
        "（本次研究没有收集到任何证据）\n".to_string()
    } else {
        format_findings(findings)
    };

    format!(
        "## 研究主题\n{}\n\n## 运行统计\n- 研究轮次: {}\n- 耗时: {:.1} 分钟\n- 向量库证据: {} 条\n- 网页证据: {} 条\n\n## 全部证据\n{}",
        topic,
        stats.total_iterations,
        stats.time_spent_minutes,
        stats.vector_sources,
        stats.web_sources,
        evidence
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CapturingOracle {
        reply: String,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl CapturingOracle {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Oracle for CapturingOracle {
        async fn complete(&self, system: &str, user: &str) -> anyhow::Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            Ok(self.reply.clone())
        }
    }

    fn stats() -> ResearchStats {
        ResearchStats {
            total_iterations: 3,
            time_spent_minutes: 4.2,
            vector_sources: 1,
            web_sources: 2,
        }
    }

    #[tokio::test]
    async fn test_parses_reply_and_defaults_missing_lists() {
        let oracle = Arc::new(CapturingOracle::new(
            r#"{"summary": "Acme uses tiered pricing", "keyFindings": ["Three tiers"]}"#,
        ));
        let stage = SynthesisStage::new(oracle.clone(), &TargetLanguage::English);
        let findings = vec![Finding::web("https://acme.example/pricing", "Basic, Pro, Enterprise")];

        let result = stage
            .synthesize("Acme Corp pricing strategy", &findings, &stats())
            .await
            .unwrap();
        assert_eq!(result.summary, "Acme uses tiered pricing");
        assert_eq!(result.key_findings, vec!["Three tiers".to_string()]);
        assert!(result.uncertainties.is_empty());

        let prompts = oracle.prompts.lock().unwrap();
        let (system, user) = &prompts[0];
        assert!(system.contains("English"));
        assert!(user.contains("[1] (web) https://acme.example/pricing"));
        assert!(user.contains("研究轮次: 3"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_degrades() {
        let stage = SynthesisStage::new(
            Arc::new(CapturingOracle::new("Sorry, I cannot help with that.")),
            &TargetLanguage::English,
        );
        let result = stage.synthesize("topic", &[], &stats()).await.unwrap();
        assert_eq!(result, SynthesisResult::degraded());
    }
}
