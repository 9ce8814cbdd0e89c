//! Output module for writing crawl results
//!
//! This module handles:
//! - Writing the crawl document as flat JSON, tree JSON or SQLite
//! - Generating markdown summaries of crawl results
//! - Computing and printing crawl statistics

mod json_output;
mod markdown;
mod sqlite_output;
pub mod stats;
mod traits;

pub use json_output::{JsonOutput, JsonShape};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use sqlite_output::{SqliteOutput, SCHEMA_SQL};
pub use stats::{print_statistics, CrawlStatistics};
pub use traits::{CrawlDocument, OutputError, OutputHandler, OutputResult, RunMetadata};

use crate::config::{OutputConfig, OutputFormat};
use std::path::Path;

/// Builds the handler for the configured output format
pub fn build_handler(config: &OutputConfig) -> Box<dyn OutputHandler> {
    match config.format {
        OutputFormat::Flat => Box::new(JsonOutput::new(&config.path, JsonShape::Flat)),
        OutputFormat::Tree => Box::new(JsonOutput::new(&config.path, JsonShape::Tree)),
        OutputFormat::Sqlite => Box::new(SqliteOutput::new(&config.path)),
    }
}

/// Writes the document in the configured format, plus the markdown summary
/// when a summary path is set
///
/// # Arguments
///
/// * `config` - The output configuration
/// * `document` - The finished crawl
pub fn write_document(config: &OutputConfig, document: &CrawlDocument) -> OutputResult<()> {
    let handler = build_handler(config);
    tracing::info!("Writing {} output to {}", handler.name(), config.path);
    handler.write(document)?;

    if let Some(summary_path) = &config.summary_path {
        generate_markdown_summary(document, Path::new(summary_path))?;
    }

    Ok(())
}
