//! Result store for crawled sections
//!
//! Workers write one [`SectionRecord`] per claimed leaf. Records are keyed by
//! `chapter{N}_section{M}` when read back, in worklist order, so the keys do
//! not depend on which worker finished first. The store is created by the
//! caller of the crawl and shared with the workers behind an `Arc`.

use crate::hierarchy::LeafDescriptor;
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// Recorded when the section page loaded but held no recognizable text
pub const CONTENT_NOT_AVAILABLE: &str = "Content not available";

/// Recorded when the section page could not be fetched or processed
pub const FAILED_TO_FETCH: &str = "Failed to fetch content";

/// How a section's text was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    /// Text extracted from the page
    Extracted,
    /// Page loaded, extraction found nothing
    ContentMissing,
    /// Navigation or processing failed
    Failed,
}

impl SectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extracted => "extracted",
            Self::ContentMissing => "content_missing",
            Self::Failed => "failed",
        }
    }
}

/// What a section page says about itself besides its text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionDetails {
    /// Number from an inline heading such as `Sec. 1.001. SHORT TITLE.`
    pub heading_number: Option<String>,
    /// Name from the same heading
    pub heading_name: Option<String>,
    /// "Last updated" date as printed on the page
    pub last_updated: Option<String>,
}

/// A crawled section: the leaf it came from plus its text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionRecord {
    pub chapter_number: String,
    pub chapter_url: String,
    pub section_number: String,
    pub section_label: String,
    pub url: String,
    pub section_index: usize,
    pub text: String,
    pub status: SectionStatus,
    /// RFC 3339 timestamp of when the record was written
    pub fetched_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Worklist position of the leaf, orders duplicate keys
    #[serde(skip)]
    pub position: usize,
}

impl SectionRecord {
    pub fn new(leaf: &LeafDescriptor, text: String, status: SectionStatus) -> Self {
        Self {
            chapter_number: leaf.chapter_number.clone(),
            chapter_url: leaf.chapter_url.clone(),
            section_number: leaf.section_number.clone(),
            section_label: leaf.section_label.clone(),
            url: leaf.url.clone(),
            section_index: leaf.section_index,
            text,
            status,
            fetched_at: Utc::now().to_rfc3339(),
            heading_number: None,
            heading_name: None,
            last_updated: None,
            position: leaf.position,
        }
    }

    /// Attaches page details found alongside the text
    pub fn with_details(mut self, details: SectionDetails) -> Self {
        self.heading_number = details.heading_number;
        self.heading_name = details.heading_name;
        self.last_updated = details.last_updated;
        self
    }

    /// Record for a section whose text was extracted (or found missing)
    pub fn extracted(leaf: &LeafDescriptor, text: Option<String>) -> Self {
        match text {
            Some(text) => Self::new(leaf, text, SectionStatus::Extracted),
            None => Self::new(
                leaf,
                CONTENT_NOT_AVAILABLE.to_string(),
                SectionStatus::ContentMissing,
            ),
        }
    }

    /// Record for a section that could not be fetched
    pub fn failed(leaf: &LeafDescriptor) -> Self {
        Self::new(leaf, FAILED_TO_FETCH.to_string(), SectionStatus::Failed)
    }

    pub fn key(&self) -> String {
        crate::hierarchy::section_key(&self.chapter_number, &self.section_number)
    }
}

/// Shared accumulator of crawled sections
#[derive(Debug, Default)]
pub struct ResultStore {
    records: Mutex<Vec<SectionRecord>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record; its key is assigned when the store is read
    pub fn insert(&self, record: SectionRecord) {
        self.lock().push(record);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn get(&self, key: &str) -> Option<SectionRecord> {
        self.snapshot().remove(key)
    }

    /// Whether any record came from the given section URL
    pub fn contains_url(&self, url: &str) -> bool {
        self.lock().iter().any(|r| r.url == url)
    }

    /// Copy of all records, ordered by key
    pub fn snapshot(&self) -> BTreeMap<String, SectionRecord> {
        assign_keys(self.lock().clone())
    }

    /// Consumes the store, returning all records ordered by key
    pub fn into_records(self) -> BTreeMap<String, SectionRecord> {
        let records = self
            .records
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        assign_keys(records)
    }

    // A worker that panicked while holding the lock cannot leave a record
    // half-written: insert is a single push.
    fn lock(&self) -> MutexGuard<'_, Vec<SectionRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keys records by `chapter{N}_section{M}` in worklist order
///
/// Two distinct leaves can share a key (Texas codes reuse chapter and
/// section numbers, unnumbered sections all parse to `0`). The first in
/// worklist order keeps the plain key; later ones get `_dup2`, `_dup3`, ...
fn assign_keys(mut records: Vec<SectionRecord>) -> BTreeMap<String, SectionRecord> {
    records.sort_by_key(|r| (r.position, r.section_index));

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut keyed = BTreeMap::new();

    for record in records {
        let base = record.key();
        let count = seen.entry(base.clone()).or_insert(0);
        *count += 1;

        let mut key = base.clone();
        let mut n = (*count).max(2);
        while keyed.contains_key(&key) {
            key = format!("{}_dup{}", base, n);
            n += 1;
        }
        if key != base {
            tracing::warn!("Duplicate section key {}, storing as {}", base, key);
        }

        keyed.insert(key, record);
    }

    keyed
}
