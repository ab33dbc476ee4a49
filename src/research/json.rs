//! 从oracle的自由文本回复中取出单个JSON对象

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("fenced block regex is valid")
});

/// 定位回复中的JSON对象文本
///
/// 优先使用 ```json 代码块，否则取第一个 `{` 到最后一个 `}` 之间的内容。
pub fn locate_object(text: &str) -> Option<&str> {
    if let Some(captures) = FENCED_BLOCK.captures(text)
        && let Some(body) = captures.get(1)
    {
        return Some(body.as_str());
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// 将回复解析为目标类型，失败时返回可读的原因
pub fn parse_object<T>(text: &str) -> Result<T, String>
where
    T: DeserializeOwned,
{
    let body = locate_object(text).ok_or_else(|| "reply contains no JSON object".to_string())?;
    serde_json::from_str::<T>(body).map_err(|e| format!("reply is not a valid JSON object: {}", e))
}
