//! SQLite document store output
//!
//! Each crawl appends one row to `runs`, its hierarchy to `nodes` and its
//! section records to `sections`, all in a single transaction. Re-running
//! against the same file keeps earlier runs.

use crate::hierarchy::HierarchyNode;
use crate::output::traits::{CrawlDocument, OutputHandler, OutputResult};
use rusqlite::{params, Connection, Transaction};
use std::fs;
use std::path::{Path, PathBuf};

/// SQL schema for the document store
pub const SCHEMA_SQL: &str = r#"
-- One row per crawl
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site TEXT NOT NULL,
    root_url TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    total_sections INTEGER NOT NULL,
    extracted INTEGER NOT NULL,
    content_missing INTEGER NOT NULL,
    failed INTEGER NOT NULL
);

-- Part / Title / Chapter / Section hierarchy
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    parent_id INTEGER REFERENCES nodes(id),
    position INTEGER NOT NULL,
    kind TEXT NOT NULL,
    number TEXT NOT NULL,
    label TEXT NOT NULL,
    url TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_nodes_run ON nodes(run_id);
CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id);

-- Section text keyed by chapter{N}_section{M}
CREATE TABLE IF NOT EXISTS sections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    key TEXT NOT NULL,
    chapter_number TEXT NOT NULL,
    chapter_url TEXT NOT NULL,
    section_number TEXT NOT NULL,
    section_label TEXT NOT NULL,
    section_index INTEGER NOT NULL,
    url TEXT NOT NULL,
    text TEXT NOT NULL,
    status TEXT NOT NULL,
    fetched_at TEXT NOT NULL,
    heading_number TEXT,
    heading_name TEXT,
    last_updated TEXT,
    UNIQUE(run_id, key)
);

CREATE INDEX IF NOT EXISTS idx_sections_status ON sections(status);
"#;

/// Writes the crawl into a SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteOutput {
    path: PathBuf,
}

impl SqliteOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> OutputResult<Connection> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(conn)
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputHandler for SqliteOutput {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn write(&self, document: &CrawlDocument) -> OutputResult<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;

        let meta = &document.metadata;
        let stats = &document.statistics;
        tx.execute(
            "INSERT INTO runs (site, root_url, started_at, finished_at, config_hash,
                               total_sections, extracted, content_missing, failed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                meta.site,
                meta.root_url,
                meta.started_at,
                meta.finished_at,
                meta.config_hash,
                stats.total_sections as i64,
                stats.extracted as i64,
                stats.content_missing as i64,
                stats.failed as i64,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        insert_nodes(&tx, run_id, None, &document.hierarchy())?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO sections (run_id, key, chapter_number, chapter_url, section_number,
                                       section_label, section_index, url, text, status, fetched_at,
                                       heading_number, heading_name, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;
            for (key, record) in &document.sections {
                stmt.execute(params![
                    run_id,
                    key,
                    record.chapter_number,
                    record.chapter_url,
                    record.section_number,
                    record.section_label,
                    record.section_index as i64,
                    record.url,
                    record.text,
                    record.status.as_str(),
                    record.fetched_at,
                    record.heading_number,
                    record.heading_name,
                    record.last_updated,
                ])?;
            }
        }

        tx.commit()?;

        tracing::info!(
            "Stored run {} ({} sections) in {}",
            run_id,
            document.sections.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn insert_nodes(
    tx: &Transaction<'_>,
    run_id: i64,
    parent_id: Option<i64>,
    nodes: &[HierarchyNode],
) -> rusqlite::Result<()> {
    for (position, node) in nodes.iter().enumerate() {
        tx.execute(
            "INSERT INTO nodes (run_id, parent_id, position, kind, number, label, url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run_id,
                parent_id,
                position as i64,
                node.kind.as_str(),
                node.number,
                node.label,
                node.url,
            ],
        )?;
        let id = tx.last_insert_rowid();
        insert_nodes(tx, run_id, Some(id), &node.children)?;
    }
    Ok(())
}
