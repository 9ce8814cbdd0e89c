//! Scheduler behavior under an instrumented fetcher
//!
//! Runs use tokio's paused clock, so simulated fetch times and worker delays
//! advance instantly while keeping their ordering.

use async_trait::async_trait;
use statute_crawler::crawler::{
    CrawlScheduler, FetchSession, Page, PageFetcher, SchedulerSettings, WaitFor, WorkItem,
};
use statute_crawler::extract::{ChildLink, ExtractionStrategy};
use statute_crawler::store::{CONTENT_NOT_AVAILABLE, FAILED_TO_FETCH};
use statute_crawler::{CrawlError, LeafDescriptor, NodeKind, ResultStore, SectionStatus};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

#[derive(Default)]
struct FetchTally {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    /// (session id, fetch start) for every navigation
    starts: Mutex<Vec<(usize, Instant)>>,
}

struct TimedFetcher {
    fetch_time: Duration,
    failing: HashSet<String>,
    refuse_sessions: bool,
    tally: Arc<FetchTally>,
}

impl TimedFetcher {
    fn new(fetch_time: Duration) -> Self {
        Self {
            fetch_time,
            failing: HashSet::new(),
            refuse_sessions: false,
            tally: Arc::new(FetchTally::default()),
        }
    }

    fn failing(mut self, paths: &[&str]) -> Self {
        self.failing = paths.iter().map(|p| p.to_string()).collect();
        self
    }
}

struct TimedSession {
    id: usize,
    fetch_time: Duration,
    failing: HashSet<String>,
    tally: Arc<FetchTally>,
}

#[async_trait]
impl PageFetcher for TimedFetcher {
    async fn open_session(&self) -> Result<Box<dyn FetchSession>, CrawlError> {
        if self.refuse_sessions {
            return Err(CrawlError::FetcherLaunch("refused".to_string()));
        }
        let id = self.tally.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TimedSession {
            id,
            fetch_time: self.fetch_time,
            failing: self.failing.clone(),
            tally: Arc::clone(&self.tally),
        }))
    }
}

#[async_trait]
impl FetchSession for TimedSession {
    async fn navigate(&mut self, url: &Url, _wait: &WaitFor) -> Result<Page, CrawlError> {
        self.tally
            .starts
            .lock()
            .unwrap()
            .push((self.id, Instant::now()));

        let now = self.tally.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.tally.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.fetch_time).await;
        self.tally.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(url.path()) {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status: 500,
            });
        }

        Ok(Page {
            url: url.clone(),
            html: String::new(),
        })
    }

    async fn close(self: Box<Self>) {
        self.tally.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Echoes the page path as section text; `/empty` has none, `/panic` panics
struct PathStrategy;

impl ExtractionStrategy for PathStrategy {
    fn list_children(&self, _page: &Page, _kind: NodeKind) -> Vec<ChildLink> {
        Vec::new()
    }

    fn extract_text(&self, page: &Page) -> Option<String> {
        match page.url.path() {
            "/panic" => panic!("extraction blew up"),
            "/empty" => None,
            path => Some(path.to_string()),
        }
    }

    fn listing_marker(&self) -> &str {
        "body"
    }

    fn content_marker(&self) -> &str {
        "body"
    }
}

fn leaf(path: &str, index: usize) -> WorkItem {
    WorkItem::Leaf(LeafDescriptor {
        chapter_number: "1".to_string(),
        chapter_url: "https://example.gov/chapter-1".to_string(),
        section_number: index.to_string(),
        section_label: format!("Section {}", index),
        url: format!("https://example.gov{}", path),
        section_index: index,
        position: index,
    })
}

fn leaves(count: usize) -> Vec<WorkItem> {
    (0..count).map(|i| leaf(&format!("/s/{}", i), i)).collect()
}

fn settings(concurrency: usize, delay_ms: u64) -> SchedulerSettings {
    SchedulerSettings {
        concurrency,
        delay: Duration::from_millis(delay_ms),
        content_timeout: Duration::from_secs(30),
        listing_timeout: Duration::from_secs(30),
    }
}

fn scheduler(fetcher: TimedFetcher, concurrency: usize, delay_ms: u64) -> CrawlScheduler {
    CrawlScheduler::new(
        Arc::new(fetcher),
        Arc::new(PathStrategy),
        settings(concurrency, delay_ms),
    )
}

#[tokio::test(start_paused = true)]
async fn test_every_leaf_gets_exactly_one_record() {
    let store = Arc::new(ResultStore::new());
    let summary = scheduler(TimedFetcher::new(Duration::from_millis(20)), 4, 0)
        .run(leaves(25), Arc::clone(&store))
        .await;

    assert_eq!(summary.workers, 4);
    assert_eq!(summary.sections_processed, 25);
    assert_eq!(summary.unclaimed, 0);
    assert_eq!(store.len(), 25);
    for i in 0..25 {
        let record = store
            .get(&format!("chapter1_section{}", i))
            .unwrap_or_else(|| panic!("missing section {}", i));
        assert_eq!(record.text, format!("/s/{}", i));
        assert_eq!(record.status, SectionStatus::Extracted);
    }
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_fetches_never_exceed_concurrency() {
    let fetcher = TimedFetcher::new(Duration::from_millis(100));
    let tally = Arc::clone(&fetcher.tally);
    let store = Arc::new(ResultStore::new());

    scheduler(fetcher, 3, 0).run(leaves(20), Arc::clone(&store)).await;

    assert_eq!(store.len(), 20);
    assert_eq!(tally.max_in_flight.load(Ordering::SeqCst), 3);
    assert_eq!(tally.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_worker_count_is_capped_by_worklist() {
    let fetcher = TimedFetcher::new(Duration::from_millis(10));
    let tally = Arc::clone(&fetcher.tally);
    let store = Arc::new(ResultStore::new());

    let summary = scheduler(fetcher, 10, 0).run(leaves(2), Arc::clone(&store)).await;

    assert_eq!(summary.workers, 2);
    assert_eq!(tally.opened.load(Ordering::SeqCst), 2);
    assert_eq!(tally.closed.load(Ordering::SeqCst), 2);
    assert_eq!(store.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_worker_waits_between_sections() {
    let fetcher = TimedFetcher::new(Duration::from_millis(10));
    let tally = Arc::clone(&fetcher.tally);
    let store = Arc::new(ResultStore::new());

    scheduler(fetcher, 2, 500).run(leaves(6), Arc::clone(&store)).await;

    let starts = tally.starts.lock().unwrap().clone();
    assert_eq!(starts.len(), 6);

    for session in 0..2 {
        let times: Vec<Instant> = starts
            .iter()
            .filter(|(id, _)| *id == session)
            .map(|(_, at)| *at)
            .collect();
        assert!(times.len() >= 2, "session {} fetched {}", session, times.len());
        for pair in times.windows(2) {
            assert!(
                pair[1] - pair[0] >= Duration::from_millis(510),
                "session {} fetched again after {:?}",
                session,
                pair[1] - pair[0]
            );
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_section_failures_are_isolated() {
    let fetcher = TimedFetcher::new(Duration::from_millis(10)).failing(&["/broken"]);
    let tally = Arc::clone(&fetcher.tally);
    let store = Arc::new(ResultStore::new());

    let work = vec![
        leaf("/s/0", 0),
        leaf("/broken", 1),
        leaf("/panic", 2),
        leaf("/empty", 3),
        leaf("/s/4", 4),
    ];
    let summary = scheduler(fetcher, 2, 0).run(work, Arc::clone(&store)).await;

    assert_eq!(summary.sections_processed, 5);
    assert_eq!(store.len(), 5);

    let broken = store.get("chapter1_section1").unwrap();
    assert_eq!(broken.text, FAILED_TO_FETCH);
    assert_eq!(broken.status, SectionStatus::Failed);

    let panicked = store.get("chapter1_section2").unwrap();
    assert_eq!(panicked.text, FAILED_TO_FETCH);

    let empty = store.get("chapter1_section3").unwrap();
    assert_eq!(empty.text, CONTENT_NOT_AVAILABLE);
    assert_eq!(empty.status, SectionStatus::ContentMissing);

    assert_eq!(store.get("chapter1_section4").unwrap().text, "/s/4");

    // Panicking and failing sections still release their sessions
    assert_eq!(tally.closed.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unopenable_sessions_leave_failed_records() {
    let mut fetcher = TimedFetcher::new(Duration::from_millis(10));
    fetcher.refuse_sessions = true;
    let store = Arc::new(ResultStore::new());

    let summary = scheduler(fetcher, 3, 0).run(leaves(4), Arc::clone(&store)).await;

    assert_eq!(summary.sections_processed, 0);
    assert_eq!(summary.unclaimed, 4);
    assert_eq!(store.len(), 4);
    assert!(store
        .snapshot()
        .values()
        .all(|r| r.status == SectionStatus::Failed));
}

#[tokio::test(start_paused = true)]
async fn test_two_workers_finish_three_sections_in_two_rounds() {
    let store = Arc::new(ResultStore::new());
    let start = Instant::now();

    scheduler(TimedFetcher::new(Duration::from_millis(150)), 2, 0)
        .run(leaves(3), Arc::clone(&store))
        .await;

    let elapsed = start.elapsed();
    assert_eq!(store.len(), 3);
    assert!(elapsed >= Duration::from_millis(300), "took {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(400), "took {:?}", elapsed);
}
