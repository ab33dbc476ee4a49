use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::i18n::{ReportSection, TargetLanguage};
use crate::research::tool::{ResearchReport, ToolResponse};
use crate::research::types::Finding;

/// 工具响应的文件名
pub const RESPONSE_FILENAME: &str = "research.json";

/// 单条证据在报告中展示的最大字符数
const SOURCE_PREVIEW_CHARS: usize = 280;

pub trait Outlet {
    /// 返回写入的文件路径
    async fn save(&self, topic: &str, response: &ToolResponse) -> Result<Vec<PathBuf>>;
}

pub struct DiskOutlet {
    output_dir: PathBuf,
    target_language: TargetLanguage,
}

impl DiskOutlet {
    pub fn new(output_dir: impl Into<PathBuf>, target_language: &TargetLanguage) -> Self {
        Self {
            output_dir: output_dir.into(),
            target_language: target_language.clone(),
        }
    }

    fn write(&self, relative_path: &str, content: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(relative_path);
        fs::write(&path, content).context(format!("Failed to write {}", path.display()))?;
        println!("💾 已保存: {}", path.display());
        Ok(path)
    }
}

impl Outlet for DiskOutlet {
    async fn save(&self, topic: &str, response: &ToolResponse) -> Result<Vec<PathBuf>> {
        println!("\n🖊️ 研究结果存储中...");
        fs::create_dir_all(&self.output_dir).context(format!(
            "Failed to create output directory {}",
            self.output_dir.display()
        ))?;

        let mut written = Vec::new();
        let json = serde_json::to_string_pretty(response)?;
        written.push(self.write(RESPONSE_FILENAME, &json)?);

        // 失败的运行只保留错误信封
        if let Some(report) = &response.data {
            let markdown = render_markdown(topic, report, &self.target_language);
            written.push(self.write(self.target_language.report_filename(), &markdown)?);
        }

        println!("💾 存储完成，输出目录: {}", self.output_dir.display());
        Ok(written)
    }
}

/// 把研究报告渲染为Markdown
pub fn render_markdown(topic: &str, report: &ResearchReport, language: &TargetLanguage) -> String {
    let heading = |section| language.heading(section);
    let synthesis = &report.synthesis;
    let mut out = format!("# {}: {}\n\n", heading(ReportSection::Title), topic);

    out.push_str(&format!("## {}\n\n{}\n\n", heading(ReportSection::Summary), synthesis.summary));
    push_list(&mut out, heading(ReportSection::KeyFindings), &synthesis.key_findings);
    push_list(&mut out, heading(ReportSection::MainThemes), &synthesis.main_themes);
    push_list(&mut out, heading(ReportSection::Uncertainties), &synthesis.uncertainties);
    push_list(&mut out, heading(ReportSection::FutureDirections), &synthesis.future_directions);

    if !report.findings.is_empty() {
        out.push_str(&format!("## {}\n\n", heading(ReportSection::Sources)));
        for (i, finding) in report.findings.iter().enumerate() {
            push_finding(&mut out, i + 1, finding);
        }
        out.push('\n');
    }

    let stats = &report.research_stats;
    out.push_str(&format!(
        "## {}\n\n| iterations | minutes | vector | web |\n|---|---|---|---|\n| {} | {:.1} | {} | {} |\n",
        heading(ReportSection::Statistics),
        stats.total_iterations,
        stats.time_spent_minutes,
        stats.vector_sources,
        stats.web_sources
    ));
    out
}

fn push_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("## {}\n\n", title));
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out.push('\n');
}

fn push_finding(out: &mut String, index: usize, finding: &Finding) {
    let preview: String = finding.payload().chars().take(SOURCE_PREVIEW_CHARS).collect();
    let preview = preview.replace('\n', " ");
    let ellipsis = if finding.payload().chars().count() > SOURCE_PREVIEW_CHARS {
        "…"
    } else {
        ""
    };
    match finding.similarity_score() {
        Some(score) => out.push_str(&format!(
            "{}. `{}` ({}, {:.2}): {}{}\n",
            index,
            finding.source(),
            finding.origin_kind(),
            score,
            preview,
            ellipsis
        )),
        None => out.push_str(&format!(
            "{}. `{}` ({}): {}{}\n",
            index,
            finding.source(),
            finding.origin_kind(),
            preview,
            ellipsis
        )),
    }
}

/// 读取此前保存的工具响应
pub fn load_response(output_dir: &Path) -> Result<ToolResponse> {
    let path = output_dir.join(RESPONSE_FILENAME);
    let content = fs::read_to_string(&path).context(format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).context("Failed to parse research response")
}
