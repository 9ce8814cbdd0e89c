//! Output handler traits and types
//!
//! This module defines the trait interface for output handlers and the
//! document every handler receives at the end of a crawl.

use crate::hierarchy::{attach_records, HierarchyNode};
use crate::output::stats::CrawlStatistics;
use crate::store::SectionRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document store error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Facts about one crawl run, written alongside the data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    /// Jurisdiction name from the site configuration
    pub site: String,
    pub root_url: String,
    /// RFC 3339
    pub started_at: String,
    /// RFC 3339
    pub finished_at: String,
    /// SHA-256 of the configuration file
    pub config_hash: String,
}

/// Everything a crawl produced
#[derive(Debug, Clone, Serialize)]
pub struct CrawlDocument {
    pub metadata: RunMetadata,
    pub statistics: CrawlStatistics,
    /// Hierarchy as expanded, without section text
    #[serde(skip)]
    pub tree: Vec<HierarchyNode>,
    /// Crawled sections keyed by `chapter{N}_section{M}`
    pub sections: BTreeMap<String, SectionRecord>,
}

impl CrawlDocument {
    /// The hierarchy with every crawled section placed under its chapter
    pub fn hierarchy(&self) -> Vec<HierarchyNode> {
        let mut tree = self.tree.clone();
        attach_records(&mut tree, self.sections.values());
        tree
    }

    /// Sections whose text could not be obtained, in key order
    pub fn incomplete_sections(&self) -> impl Iterator<Item = (&String, &SectionRecord)> {
        self.sections
            .iter()
            .filter(|(_, r)| r.status != crate::store::SectionStatus::Extracted)
    }
}

/// Trait for output handlers
///
/// A handler persists a finished [`CrawlDocument`] in one format. It runs
/// once, after every worker has exited.
pub trait OutputHandler {
    /// Short format name used in logs
    fn name(&self) -> &'static str;

    /// Writes the document
    ///
    /// # Arguments
    ///
    /// * `document` - The finished crawl
    fn write(&self, document: &CrawlDocument) -> OutputResult<()>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_attaches_text() {
        let document = fixtures::document();
        let tree = document.hierarchy();

        let sections = &tree[0].children[0].children;
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].text.as_deref(), Some("(A) Definitions apply."));
        // The stored tree itself is untouched
        assert_eq!(
            document.tree[0].children[0].children[0].text.as_deref(),
            Some("")
        );
    }

    #[test]
    fn test_incomplete_sections() {
        let document = fixtures::document();
        let keys: Vec<&String> = document.incomplete_sections().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["chapter101_section101.02", "chapter101_section101.03"]);
    }
}
