// Report generation from rendered classification results

use crate::presenter::RenderedResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const HEAVY_RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
pub const EMPTY_GROUP: &str = "(no attributes)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

pub fn generate_report(
    rendered: &RenderedResult,
    format: ReportFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(rendered)),
        ReportFormat::Json => generate_json_report(rendered),
        ReportFormat::Markdown => Ok(generate_markdown_report(rendered)),
    }
}

pub fn generate_text_report(rendered: &RenderedResult) -> String {
    let mut report = String::new();

    report.push_str(HEAVY_RULE);
    report.push('\n');
    report.push_str(&rendered.title);
    report.push('\n');
    report.push_str(HEAVY_RULE);
    report.push_str("\n\n");

    for group in &rendered.groups {
        report.push_str(&group.heading);
        report.push('\n');
        report.push_str(&"─".repeat(group.heading.chars().count()));
        report.push('\n');

        if group.is_empty() {
            report.push_str(&format!("  {}\n", EMPTY_GROUP));
        } else {
            let width = group.name_width();
            for row in &group.rows {
                report.push_str(&format!("  {:<width$}  {}\n", row.name, row.value, width = width));
            }
        }
        report.push('\n');
    }

    report
}

pub fn generate_json_report(rendered: &RenderedResult) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "prodclass",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "product": rendered
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn generate_markdown_report(rendered: &RenderedResult) -> String {
    let mut report = String::new();

    report.push_str(&format!("## {}\n\n", escape_markdown_cell(&rendered.title)));

    for group in &rendered.groups {
        report.push_str(&format!("### {}\n\n", group.heading));
        report.push_str("| Attribute | Value |\n");
        report.push_str("| --- | --- |\n");
        for row in &group.rows {
            report.push_str(&format!(
                "| {} | {} |\n",
                escape_markdown_cell(&row.name),
                escape_markdown_cell(&row.value)
            ));
        }
        report.push('\n');
    }

    report
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn escape_markdown_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
