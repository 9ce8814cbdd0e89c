//! Markdown summary generation
//!
//! This module generates a human-readable markdown report of a crawl: run
//! information, section statistics and the list of sections that came back
//! without text.

use crate::output::json_output::write_atomic;
use crate::output::traits::{CrawlDocument, OutputResult};
use crate::store::SectionStatus;
use std::path::Path;

/// How many incomplete sections the report lists before truncating
const MAX_LISTED: usize = 100;

/// Writes the markdown summary of a crawl
///
/// # Arguments
///
/// * `document` - The finished crawl
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(document: &CrawlDocument, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(document);
    write_atomic(output_path, markdown.as_bytes())?;

    tracing::info!("Wrote summary to {}", output_path.display());
    Ok(())
}

/// Formats a crawl as markdown
pub fn format_markdown_summary(document: &CrawlDocument) -> String {
    let meta = &document.metadata;
    let stats = &document.statistics;
    let mut md = String::new();

    md.push_str(&format!("# Statute Crawl Summary: {}\n\n", meta.site));

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Root URL**: {}\n", meta.root_url));
    md.push_str(&format!("- **Started**: {}\n", meta.started_at));
    md.push_str(&format!("- **Finished**: {}\n", meta.finished_at));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds ({:.2} minutes)\n",
        stats.elapsed_seconds,
        stats.elapsed_seconds / 60.0
    ));
    md.push_str(&format!("- **Workers**: {}\n", stats.workers));
    md.push_str(&format!("- **Config Hash**: {}\n\n", meta.config_hash));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Chapters**: {}\n", stats.chapters));
    if stats.chapters_failed > 0 {
        md.push_str(&format!(
            "- **Chapters Not Listed**: {}\n",
            stats.chapters_failed
        ));
    }
    md.push_str(&format!("- **Sections**: {}\n", stats.total_sections));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        stats.success_rate()
    ));

    md.push_str("## Section Status Breakdown\n\n");
    md.push_str("| Status | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Extracted | {} |\n", stats.extracted));
    md.push_str(&format!("| Content Missing | {} |\n", stats.content_missing));
    md.push_str(&format!("| Failed | {} |\n\n", stats.failed));

    let incomplete: Vec<_> = document.incomplete_sections().collect();
    if !incomplete.is_empty() {
        md.push_str("## Incomplete Sections\n\n");
        md.push_str("| Key | Status | URL |\n");
        md.push_str("|-----|--------|-----|\n");

        for (key, record) in incomplete.iter().take(MAX_LISTED) {
            let status = match record.status {
                SectionStatus::Failed => "failed",
                _ => "content missing",
            };
            md.push_str(&format!("| {} | {} | {} |\n", key, status, record.url));
        }
        if incomplete.len() > MAX_LISTED {
            md.push_str(&format!(
                "\n... and {} more\n",
                incomplete.len() - MAX_LISTED
            ));
        }
        md.push('\n');
    }

    md
}
