//! JSON output handler
//!
//! Two shapes are supported. `flat` writes the section map keyed by
//! `chapter{N}_section{M}`; `tree` writes the nested hierarchy with section
//! text inline. Both carry run metadata and statistics.

use crate::hierarchy::HierarchyNode;
use crate::output::stats::CrawlStatistics;
use crate::output::traits::{CrawlDocument, OutputHandler, OutputResult, RunMetadata};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Layout of the JSON document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Flat,
    Tree,
}

#[derive(Serialize)]
struct TreeDocument<'a> {
    metadata: &'a RunMetadata,
    statistics: &'a CrawlStatistics,
    hierarchy: Vec<HierarchyNode>,
}

/// Writes the crawl as a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonOutput {
    path: PathBuf,
    shape: JsonShape,
}

impl JsonOutput {
    pub fn new(path: impl Into<PathBuf>, shape: JsonShape) -> Self {
        Self {
            path: path.into(),
            shape,
        }
    }

    fn render(&self, document: &CrawlDocument) -> OutputResult<Vec<u8>> {
        let bytes = match self.shape {
            JsonShape::Flat => serde_json::to_vec_pretty(document)?,
            JsonShape::Tree => serde_json::to_vec_pretty(&TreeDocument {
                metadata: &document.metadata,
                statistics: &document.statistics,
                hierarchy: document.hierarchy(),
            })?,
        };
        Ok(bytes)
    }
}

impl OutputHandler for JsonOutput {
    fn name(&self) -> &'static str {
        match self.shape {
            JsonShape::Flat => "json (flat)",
            JsonShape::Tree => "json (tree)",
        }
    }

    fn write(&self, document: &CrawlDocument) -> OutputResult<()> {
        let bytes = self.render(document)?;
        write_atomic(&self.path, &bytes)?;

        tracing::info!(
            "Wrote {} sections to {}",
            document.sections.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Writes through a temporary sibling file so a crash never leaves a
/// truncated document behind
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}
