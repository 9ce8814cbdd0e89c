//! Crawl statistics
//!
//! Counts are taken from the finished section records, so they always agree
//! with what the output files contain.

use crate::crawler::RunSummary;
use crate::hierarchy::{HierarchyNode, NodeKind};
use crate::store::{SectionRecord, SectionStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrawlStatistics {
    /// Sections with a record in the store
    pub total_sections: usize,

    /// Sections with extracted text
    pub extracted: usize,

    /// Sections whose page held no recognizable text
    pub content_missing: usize,

    /// Sections that could not be fetched
    pub failed: usize,

    /// Chapters in the hierarchy
    pub chapters: usize,

    /// Chapters whose section listing could not be read
    pub chapters_failed: usize,

    /// Workers the scheduler ran
    pub workers: usize,

    /// Wall-clock duration of the run
    pub elapsed_seconds: f64,
}

impl CrawlStatistics {
    /// Computes statistics for a finished run
    ///
    /// # Arguments
    ///
    /// * `records` - Every record in the result store
    /// * `tree` - The expanded hierarchy
    /// * `summary` - Counters reported by the scheduler
    /// * `elapsed` - Duration of the whole run
    pub fn collect(
        records: &BTreeMap<String, SectionRecord>,
        tree: &[HierarchyNode],
        summary: &RunSummary,
        elapsed: Duration,
    ) -> Self {
        let mut stats = Self {
            total_sections: records.len(),
            chapters: count_kind(tree, NodeKind::Chapter),
            chapters_failed: summary.chapters_failed,
            workers: summary.workers,
            elapsed_seconds: elapsed.as_secs_f64(),
            ..Self::default()
        };

        for record in records.values() {
            match record.status {
                SectionStatus::Extracted => stats.extracted += 1,
                SectionStatus::ContentMissing => stats.content_missing += 1,
                SectionStatus::Failed => stats.failed += 1,
            }
        }

        stats
    }

    /// Share of sections with extracted text, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_sections == 0 {
            return 0.0;
        }
        (self.extracted as f64 / self.total_sections as f64) * 100.0
    }
}

fn count_kind(nodes: &[HierarchyNode], kind: NodeKind) -> usize {
    nodes
        .iter()
        .map(|n| usize::from(n.kind == kind) + count_kind(&n.children, kind))
        .sum()
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Chapters: {}", stats.chapters);
    if stats.chapters_failed > 0 {
        println!("  Chapters not listed: {}", stats.chapters_failed);
    }
    println!("  Sections: {}", stats.total_sections);
    println!("  Workers: {}", stats.workers);
    println!("  Elapsed: {:.1}s", stats.elapsed_seconds);
    println!();

    println!("Sections by Status:");
    for (status, count) in [
        (SectionStatus::Extracted, stats.extracted),
        (SectionStatus::ContentMissing, stats.content_missing),
        (SectionStatus::Failed, stats.failed),
    ] {
        let percentage = if stats.total_sections > 0 {
            (count as f64 / stats.total_sections as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status.as_str(), count, percentage);
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} sections extracted)",
        stats.success_rate(),
        stats.extracted,
        stats.total_sections
    );
}
