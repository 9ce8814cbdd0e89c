//! Bounded-concurrency crawl scheduler
//!
//! This module handles:
//! - The shared FIFO worklist of sections (or whole chapters)
//! - Running at most `concurrency` workers, each with its own fetch session
//! - Per-worker pacing between sections
//! - Turning every failure into a sentinel record so each leaf gets exactly
//!   one entry in the [`ResultStore`]

use crate::config::CrawlerConfig;
use crate::crawler::expander::fetch_listing;
use crate::crawler::{FetchSession, PageFetcher, WaitFor};
use crate::extract::{ChildLink, ExtractionStrategy};
use crate::hierarchy::{parse_label, ChapterDescriptor, LeafDescriptor, NodeKind};
use crate::robots::RobotsPolicy;
use crate::state::SectionState;
use crate::store::{ResultStore, SectionDetails, SectionRecord};
use crate::CrawlError;
use futures::FutureExt;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

/// How often (in sections) workers report progress
const PROGRESS_INTERVAL: usize = 10;

/// A unit of work claimed by one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// A single section page
    Leaf(LeafDescriptor),
    /// A chapter whose sections the worker lists and fetches itself
    Chapter(ChapterDescriptor),
}

/// FIFO worklist shared by all workers
///
/// Claims are atomic: an item is handed to exactly one worker.
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<WorkItem>>,
}

impl WorkQueue {
    pub fn new(items: impl IntoIterator<Item = WorkItem>) -> Self {
        Self {
            items: Mutex::new(items.into_iter().collect()),
        }
    }

    /// Takes the item at the front of the queue
    pub fn claim(&self) -> Option<WorkItem> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn drain(&self) -> Vec<WorkItem> {
        self.lock().drain(..).collect()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<WorkItem>> {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Scheduler tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Maximum number of workers
    pub concurrency: usize,
    /// Pause a worker takes after each section
    pub delay: Duration,
    /// Navigation budget for section pages
    pub content_timeout: Duration,
    /// Navigation budget for chapter listings
    pub listing_timeout: Duration,
}

impl SchedulerSettings {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            concurrency: config.concurrency as usize,
            delay: Duration::from_millis(config.request_delay),
            content_timeout: Duration::from_millis(config.content_timeout),
            listing_timeout: Duration::from_millis(config.listing_timeout),
        }
    }
}

/// Counts reported at the end of a run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Workers spawned
    pub workers: usize,
    /// Sections processed by workers, failures included
    pub sections_processed: usize,
    /// Chapters whose section listing loaded
    pub chapters_listed: usize,
    /// Chapters whose section listing failed or was never claimed
    pub chapters_failed: usize,
    /// Sections no worker claimed
    pub unclaimed: usize,
}

#[derive(Debug, Default)]
struct Counters {
    sections: AtomicUsize,
    chapters_listed: AtomicUsize,
    chapters_failed: AtomicUsize,
}

/// Runs the worklist through a bounded pool of workers
pub struct CrawlScheduler {
    fetcher: Arc<dyn PageFetcher>,
    strategy: Arc<dyn ExtractionStrategy>,
    settings: SchedulerSettings,
    robots: Option<Arc<RobotsPolicy>>,
}

impl CrawlScheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Opens one session per worker
    /// * `strategy` - Extracts section text (and section links for chapters)
    /// * `settings` - Concurrency, pacing and timeouts
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        strategy: Arc<dyn ExtractionStrategy>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            fetcher,
            strategy,
            settings,
            robots: None,
        }
    }

    /// Filters worker-side section discovery through robots.txt rules
    pub fn with_robots(mut self, robots: Option<Arc<RobotsPolicy>>) -> Self {
        self.robots = robots;
        self
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Processes every item of `work`, writing one record per section to
    /// `store`
    ///
    /// Spawns `min(concurrency, work.len())` workers and resolves once all of
    /// them have exited. Sections left on the queue because no worker could
    /// open a session are recorded as failed.
    pub async fn run(&self, work: Vec<WorkItem>, store: Arc<ResultStore>) -> RunSummary {
        if work.is_empty() {
            tracing::info!("Worklist is empty, nothing to crawl");
            return RunSummary::default();
        }

        let queue = Arc::new(WorkQueue::new(work));
        let counters = Arc::new(Counters::default());
        let worker_count = self.settings.concurrency.max(1).min(queue.len());

        tracing::info!(
            "Starting {} workers for {} work items (delay {:?})",
            worker_count,
            queue.len(),
            self.settings.delay
        );

        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let worker = Worker {
                id,
                fetcher: Arc::clone(&self.fetcher),
                strategy: Arc::clone(&self.strategy),
                settings: self.settings.clone(),
                robots: self.robots.clone(),
                queue: Arc::clone(&queue),
                store: Arc::clone(&store),
                counters: Arc::clone(&counters),
            };
            handles.push(tokio::spawn(worker.run()));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task ended abnormally: {}", e);
            }
        }

        let mut summary = RunSummary {
            workers: worker_count,
            ..RunSummary::default()
        };

        for item in queue.drain() {
            match item {
                WorkItem::Leaf(leaf) => {
                    tracing::error!("Section {} was never claimed", leaf.key());
                    store.insert(SectionRecord::failed(&leaf));
                    summary.unclaimed += 1;
                }
                WorkItem::Chapter(chapter) => {
                    tracing::error!("Chapter {} was never claimed", chapter.number);
                    counters.chapters_failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        summary.sections_processed = counters.sections.load(Ordering::Relaxed);
        summary.chapters_listed = counters.chapters_listed.load(Ordering::Relaxed);
        summary.chapters_failed = counters.chapters_failed.load(Ordering::Relaxed);

        tracing::info!(
            "Workers finished: {} sections processed, {} unclaimed",
            summary.sections_processed,
            summary.unclaimed
        );

        summary
    }
}

struct Worker {
    id: usize,
    fetcher: Arc<dyn PageFetcher>,
    strategy: Arc<dyn ExtractionStrategy>,
    settings: SchedulerSettings,
    robots: Option<Arc<RobotsPolicy>>,
    queue: Arc<WorkQueue>,
    store: Arc<ResultStore>,
    counters: Arc<Counters>,
}

impl Worker {
    async fn run(self) {
        let mut session = match self.fetcher.open_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Worker {} could not open a session: {}", self.id, e);
                return;
            }
        };
        tracing::debug!("Worker {} started", self.id);

        // The session is closed even if processing panics
        let outcome = AssertUnwindSafe(self.work_loop(session.as_mut()))
            .catch_unwind()
            .await;
        if outcome.is_err() {
            tracing::error!("Worker {} panicked", self.id);
        }

        session.close().await;
        tracing::debug!("Worker {} finished", self.id);
    }

    async fn work_loop(&self, session: &mut dyn FetchSession) {
        while let Some(item) = self.queue.claim() {
            match item {
                WorkItem::Leaf(leaf) => self.process_leaf(session, &leaf).await,
                WorkItem::Chapter(chapter) => self.process_chapter(session, &chapter).await,
            }
        }
    }

    /// Fetches one section and records it, then paces the worker
    async fn process_leaf(&self, session: &mut dyn FetchSession, leaf: &LeafDescriptor) {
        let outcome = AssertUnwindSafe(self.fetch_section(session, leaf))
            .catch_unwind()
            .await;

        let record = match outcome {
            Ok(Ok((text, details))) => {
                if text.is_none() {
                    tracing::warn!("No content found for {} at {}", leaf.key(), leaf.url);
                }
                SectionRecord::extracted(leaf, text).with_details(details)
            }
            Ok(Err(e)) => {
                tracing::error!("Failed to fetch {} at {}: {}", leaf.key(), leaf.url, e);
                SectionRecord::failed(leaf)
            }
            Err(_) => {
                tracing::error!("Processing {} at {} panicked", leaf.key(), leaf.url);
                SectionRecord::failed(leaf)
            }
        };

        self.store.insert(record);

        let done = self.counters.sections.fetch_add(1, Ordering::Relaxed) + 1;
        if done % PROGRESS_INTERVAL == 0 {
            tracing::info!("Progress: {} sections crawled", done);
        }

        if !self.settings.delay.is_zero() {
            tokio::time::sleep(self.settings.delay).await;
        }
    }

    async fn fetch_section(
        &self,
        session: &mut dyn FetchSession,
        leaf: &LeafDescriptor,
    ) -> Result<(Option<String>, SectionDetails), CrawlError> {
        let mut state = SectionState::Pending;

        state = state.transition(SectionState::Fetching)?;
        let wait = WaitFor::new(self.strategy.content_marker(), self.settings.content_timeout);
        let navigation = match Url::parse(&leaf.url) {
            Ok(url) => session.navigate(&url, &wait).await,
            Err(e) => Err(e.into()),
        };
        let page = match navigation {
            Ok(page) => page,
            Err(e) => {
                let failed = state.transition(SectionState::Failed)?;
                tracing::debug!("Worker {}: {} {} while {}", self.id, leaf.key(), failed, state);
                return Err(e);
            }
        };

        state = state.transition(SectionState::Extracting)?;
        let text = self.strategy.extract_text(&page);
        let details = self.strategy.extract_details(&page);

        state = state.transition(SectionState::Done)?;
        tracing::debug!("Worker {}: {} {}", self.id, leaf.key(), state);

        Ok((text, details))
    }

    /// Lists a chapter's sections and processes them in listing order
    async fn process_chapter(&self, session: &mut dyn FetchSession, chapter: &ChapterDescriptor) {
        let links = match self.list_sections(session, chapter).await {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!(
                    "Could not list sections of chapter {} at {}: {}",
                    chapter.number,
                    chapter.url,
                    e
                );
                self.counters.chapters_failed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        self.counters.chapters_listed.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            "Worker {}: chapter {} has {} sections",
            self.id,
            chapter.number,
            links.len()
        );

        for (section_index, link) in links.iter().enumerate() {
            let parsed = parse_label(&link.label);
            let leaf = LeafDescriptor {
                chapter_number: chapter.number.clone(),
                chapter_url: chapter.url.clone(),
                section_number: parsed.number,
                section_label: parsed.label,
                url: link.url.clone(),
                section_index,
                position: chapter.position,
            };
            self.process_leaf(session, &leaf).await;
        }
    }

    async fn list_sections(
        &self,
        session: &mut dyn FetchSession,
        chapter: &ChapterDescriptor,
    ) -> Result<Vec<ChildLink>, CrawlError> {
        let url = Url::parse(&chapter.url)?;
        fetch_listing(
            session,
            self.strategy.as_ref(),
            &url,
            NodeKind::Section,
            self.settings.listing_timeout,
            self.robots.as_deref(),
        )
        .await
    }
}
