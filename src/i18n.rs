use serde::{Deserialize, Serialize};

/// 目标语言类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum TargetLanguage {
    #[serde(rename = "zh")]
    Chinese,
    #[serde(rename = "en")]
    #[default]
    English,
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "ru")]
    Russian,
}

/// 报告中需要本地化的章节
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSection {
    Title,
    Summary,
    KeyFindings,
    MainThemes,
    Uncertainties,
    FutureDirections,
    Sources,
    Statistics,
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetLanguage::Chinese => write!(f, "zh"),
            TargetLanguage::English => write!(f, "en"),
            TargetLanguage::Japanese => write!(f, "ja"),
            TargetLanguage::Korean => write!(f, "ko"),
            TargetLanguage::German => write!(f, "de"),
            TargetLanguage::French => write!(f, "fr"),
            TargetLanguage::Russian => write!(f, "ru"),
        }
    }
}

impl std::str::FromStr for TargetLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zh" | "chinese" | "中文" => Ok(TargetLanguage::Chinese),
            "en" | "english" | "英文" => Ok(TargetLanguage::English),
            "ja" | "japanese" | "日本語" | "日文" => Ok(TargetLanguage::Japanese),
            "ko" | "korean" | "한국어" | "韩文" => Ok(TargetLanguage::Korean),
            "de" | "german" | "deutsch" | "德文" => Ok(TargetLanguage::German),
            "fr" | "french" | "français" | "法文" => Ok(TargetLanguage::French),
            "ru" | "russian" | "русский" | "俄文" => Ok(TargetLanguage::Russian),
            _ => Err(format!("Unknown target language: {}", s)),
        }
    }
}

impl TargetLanguage {
    /// 获取语言的描述性名称
    pub fn display_name(&self) -> &'static str {
        match self {
            TargetLanguage::Chinese => "中文",
            TargetLanguage::English => "English",
            TargetLanguage::Japanese => "日本語",
            TargetLanguage::Korean => "한국어",
            TargetLanguage::German => "Deutsch",
            TargetLanguage::French => "Français",
            TargetLanguage::Russian => "Русский",
        }
    }

    /// 综合报告使用的语言指令，附加在综合阶段的系统提示词末尾
    pub fn prompt_instruction(&self) -> &'static str {
        match self {
            TargetLanguage::Chinese => {
                "请使用中文撰写所有JSON字段的内容，确保表述准确、专业、易于理解。JSON的键名保持英文不变。"
            }
            TargetLanguage::English => {
                "Write every JSON field value in English, keeping the language accurate, professional, and easy to understand. Keep the JSON keys unchanged."
            }
            TargetLanguage::Japanese => {
                "すべてのJSONフィールドの値を日本語で記述してください。正確で専門的で理解しやすい表現を心がけ、JSONのキー名は変更しないでください。"
            }
            TargetLanguage::Korean => {
                "모든 JSON 필드 값을 한국어로 작성해 주세요. 정확하고 전문적이며 이해하기 쉬운 표현을 사용하고 JSON 키 이름은 바꾸지 마세요."
            }
            TargetLanguage::German => {
                "Bitte formulieren Sie alle Werte der JSON-Felder auf Deutsch, präzise, professionell und leicht verständlich. Die JSON-Schlüssel bleiben unverändert."
            }
            TargetLanguage::French => {
                "Veuillez rédiger toutes les valeurs des champs JSON en français, de manière précise, professionnelle et facile à comprendre. Les clés JSON restent inchangées."
            }
            TargetLanguage::Russian => {
                "Пожалуйста, заполните значения всех полей JSON на русском языке, точно, профессионально и понятно. Ключи JSON не изменяйте."
            }
        }
    }

    /// 获取报告文件名
    pub fn report_filename(&self) -> &'static str {
        match self {
            TargetLanguage::Chinese => "研究报告.md",
            TargetLanguage::English => "Research-Report.md",
            TargetLanguage::Japanese => "調査レポート.md",
            TargetLanguage::Korean => "연구-보고서.md",
            TargetLanguage::German => "Forschungsbericht.md",
            TargetLanguage::French => "Rapport-de-Recherche.md",
            TargetLanguage::Russian => "Исследовательский-Отчет.md",
        }
    }

    /// 获取报告章节标题
    pub fn heading(&self, section: ReportSection) -> &'static str {
        use ReportSection::*;
        match self {
            TargetLanguage::Chinese => match section {
                Title => "研究报告",
                Summary => "总结",
                KeyFindings => "关键发现",
                MainThemes => "主要主题",
                Uncertainties => "不确定性",
                FutureDirections => "后续方向",
                Sources => "证据来源",
                Statistics => "运行统计",
            },
            TargetLanguage::English => match section {
                Title => "Research Report",
                Summary => "Summary",
                KeyFindings => "Key Findings",
                MainThemes => "Main Themes",
                Uncertainties => "Uncertainties",
                FutureDirections => "Future Directions",
                Sources => "Sources",
                Statistics => "Statistics",
            },
            TargetLanguage::Japanese => match section {
                Title => "調査レポート",
                Summary => "概要",
                KeyFindings => "主な発見",
                MainThemes => "主要テーマ",
                Uncertainties => "不確実性",
                FutureDirections => "今後の方向性",
                Sources => "情報源",
                Statistics => "統計",
            },
            TargetLanguage::Korean => match section {
                Title => "연구 보고서",
                Summary => "요약",
                KeyFindings => "핵심 발견",
                MainThemes => "주요 주제",
                Uncertainties => "불확실성",
                FutureDirections => "향후 방향",
                Sources => "출처",
                Statistics => "통계",
            },
            TargetLanguage::German => match section {
                Title => "Forschungsbericht",
                Summary => "Zusammenfassung",
                KeyFindings => "Wichtigste Erkenntnisse",
                MainThemes => "Hauptthemen",
                Uncertainties => "Unsicherheiten",
                FutureDirections => "Weitere Richtungen",
                Sources => "Quellen",
                Statistics => "Statistik",
            },
            TargetLanguage::French => match section {
                Title => "Rapport de recherche",
                Summary => "Résumé",
                KeyFindings => "Constats clés",
                MainThemes => "Thèmes principaux",
                Uncertainties => "Incertitudes",
                FutureDirections => "Pistes futures",
                Sources => "Sources",
                Statistics => "Statistiques",
            },
            TargetLanguage::Russian => match section {
                Title => "Исследовательский отчет",
                Summary => "Резюме",
                KeyFindings => "Ключевые выводы",
                MainThemes => "Основные темы",
                Uncertainties => "Неопределенности",
                FutureDirections => "Дальнейшие направления",
                Sources => "Источники",
                Statistics => "Статистика",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_round_trip_codes() {
        assert_eq!("EN".parse::<TargetLanguage>().unwrap(), TargetLanguage::English);
        assert_eq!("中文".parse::<TargetLanguage>().unwrap(), TargetLanguage::Chinese);
        assert_eq!(TargetLanguage::Japanese.to_string(), "ja");
        assert!("klingon".parse::<TargetLanguage>().is_err());
    }

    #[test]
    fn test_default_is_english() {
        let language = TargetLanguage::default();
        assert_eq!(language, TargetLanguage::English);
        assert!(language.prompt_instruction().contains("English"));
        assert_eq!(language.report_filename(), "Research-Report.md");
    }

    #[test]
    fn test_headings_are_localized() {
        assert_eq!(TargetLanguage::Chinese.heading(ReportSection::KeyFindings), "关键发现");
        assert_eq!(TargetLanguage::German.heading(ReportSection::Sources), "Quellen");
    }
}
