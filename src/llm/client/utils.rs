use crate::config::LLMConfig;

/// 提示词超过该长度（字节）时直接使用高质量模型
const EFFICIENT_MODEL_PROMPT_LIMIT: usize = 32 * 1024;

/// 按提示词长度选择模型
pub fn evaluate_befitting_model(
    llm_config: &LLMConfig,
    system_prompt: &str,
    user_prompt: &str,
) -> String {
    if system_prompt.len() + user_prompt.len() <= EFFICIENT_MODEL_PROMPT_LIMIT {
        return llm_config.model_efficient.clone();
    }
    llm_config.model_powerful.clone()
}
