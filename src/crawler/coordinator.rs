//! Crawler coordinator - main crawl orchestration logic
//!
//! This module ties the phases of a crawl together:
//! - Building the page fetcher and extraction strategy
//! - Loading robots.txt when asked to
//! - Expanding the hierarchy with a single session
//! - Running the worklist through the scheduler
//! - Assembling the final document

use crate::config::{Config, SectionDiscovery};
use crate::crawler::expander::LinkExpander;
use crate::crawler::scheduler::{CrawlScheduler, SchedulerSettings, WorkItem};
use crate::crawler::{HttpFetcher, PageFetcher};
use crate::extract::{build_strategy, ExtractionStrategy};
use crate::hierarchy::{collect_chapters, collect_leaves, HierarchyNode, NodeKind};
use crate::output::{CrawlDocument, CrawlStatistics, RunMetadata};
use crate::robots::{effective_delay, fetch_robots, RobotsPolicy};
use crate::store::ResultStore;
use crate::CrawlError;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Result of the sequential expansion phase
#[derive(Debug, Clone)]
pub struct CrawlPlan {
    /// Hierarchy down to the last level the expander owns
    pub tree: Vec<HierarchyNode>,
    /// Items for the scheduler, in depth-first order
    pub work: Vec<WorkItem>,
    /// Robots rules in force, if robots.txt is respected
    pub robots: Option<Arc<RobotsPolicy>>,
}

impl CrawlPlan {
    /// Number of section leaves queued (zero when workers discover sections)
    pub fn leaf_count(&self) -> usize {
        self.work
            .iter()
            .filter(|item| matches!(item, WorkItem::Leaf(_)))
            .count()
    }

    /// Number of chapters queued for worker-side discovery
    pub fn chapter_count(&self) -> usize {
        self.work.len() - self.leaf_count()
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    config_hash: String,
    root_url: Url,
    fetcher: Arc<dyn PageFetcher>,
    strategy: Arc<dyn ExtractionStrategy>,
}

impl Coordinator {
    /// Creates a coordinator using the HTTP fetcher
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash of the configuration file, recorded in output
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to crawl
    /// * `Err(CrawlError)` - The fetcher could not be built or a URL is invalid
    pub fn new(config: Config, config_hash: String) -> Result<Self, CrawlError> {
        let fetcher = Arc::new(HttpFetcher::new(&config.user_agent)?);
        Self::with_fetcher(config, config_hash, fetcher)
    }

    /// Creates a coordinator around any page fetcher
    pub fn with_fetcher(
        config: Config,
        config_hash: String,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Result<Self, CrawlError> {
        let root_url = Url::parse(&config.site.root_url)?;
        let base_url = Url::parse(&config.site.base_url)?;
        let strategy = build_strategy(config.site.strategy, base_url);

        Ok(Self {
            config,
            config_hash,
            root_url,
            fetcher,
            strategy,
        })
    }

    /// Levels the expander lists itself
    ///
    /// With worker-side discovery the expander stops at chapters.
    fn expander_levels(&self) -> Vec<NodeKind> {
        let levels = self.config.site.levels.iter().copied();
        match self.config.crawler.section_discovery {
            SectionDiscovery::Expander => levels.collect(),
            SectionDiscovery::Worker => levels.filter(|k| *k != NodeKind::Section).collect(),
        }
    }

    /// Runs the sequential phase: robots.txt, then hierarchy expansion
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlPlan)` - The tree and the worklist built from it
    /// * `Err(CrawlError)` - The expander's session could not be opened
    pub async fn plan(&self) -> Result<CrawlPlan, CrawlError> {
        let crawler = &self.config.crawler;
        let listing_timeout = Duration::from_millis(crawler.listing_timeout);

        let mut session = self.fetcher.open_session().await?;

        let robots = if crawler.respect_robots {
            let rules = fetch_robots(session.as_mut(), &self.root_url, listing_timeout).await;
            Some(Arc::new(RobotsPolicy::new(
                rules,
                self.config.user_agent.crawler_name.clone(),
            )))
        } else {
            None
        };

        let expander = LinkExpander::new(
            Arc::clone(&self.strategy),
            self.expander_levels(),
            listing_timeout,
            Duration::from_millis(crawler.expansion_delay),
        )
        .with_robots(robots.clone());

        let tree = expander.expand(session.as_mut(), &self.root_url).await;
        session.close().await;

        let work: Vec<WorkItem> = match crawler.section_discovery {
            SectionDiscovery::Expander => collect_leaves(&tree)
                .into_iter()
                .map(WorkItem::Leaf)
                .collect(),
            SectionDiscovery::Worker => collect_chapters(&tree)
                .into_iter()
                .map(WorkItem::Chapter)
                .collect(),
        };

        Ok(CrawlPlan { tree, work, robots })
    }

    /// Runs the whole crawl and returns the finished document
    ///
    /// Section failures never fail the run; they are recorded in the
    /// document with sentinel text.
    pub async fn run(&self) -> Result<CrawlDocument, CrawlError> {
        let started_at = Utc::now();
        let start = Instant::now();

        tracing::info!(
            "Starting crawl of {} from {}",
            self.config.site.name,
            self.root_url
        );

        let plan = self.plan().await?;
        tracing::info!(
            "Expansion complete: {} sections, {} chapters queued",
            plan.leaf_count(),
            plan.chapter_count()
        );

        let mut settings = SchedulerSettings::from_config(&self.config.crawler);
        settings.delay = effective_delay(settings.delay, plan.robots.as_deref());

        let scheduler = CrawlScheduler::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.strategy),
            settings,
        )
        .with_robots(plan.robots.clone());

        let store = Arc::new(ResultStore::new());
        let summary = scheduler.run(plan.work, Arc::clone(&store)).await;

        let sections = match Arc::try_unwrap(store) {
            Ok(store) => store.into_records(),
            Err(shared) => shared.snapshot(),
        };

        let elapsed = start.elapsed();
        let statistics = CrawlStatistics::collect(&sections, &plan.tree, &summary, elapsed);

        tracing::info!(
            "Crawl completed: {} sections ({} extracted, {} missing, {} failed) in {:?}",
            statistics.total_sections,
            statistics.extracted,
            statistics.content_missing,
            statistics.failed,
            elapsed
        );

        Ok(CrawlDocument {
            metadata: RunMetadata {
                site: self.config.site.name.clone(),
                root_url: self.root_url.to_string(),
                started_at: started_at.to_rfc3339(),
                finished_at: Utc::now().to_rfc3339(),
                config_hash: self.config_hash.clone(),
            },
            statistics,
            tree: plan.tree,
            sections,
        })
    }
}

/// Runs a crawl and writes its output
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Crawl finished and output was written
/// * `Err(CrawlError)` - A fatal error stopped the crawl
pub async fn run_crawl(config: Config, config_hash: String) -> Result<CrawlStatistics, CrawlError> {
    let output = config.output.clone();
    let coordinator = Coordinator::new(config, config_hash)?;

    let document = coordinator.run().await?;
    crate::output::write_document(&output, &document)?;

    Ok(document.statistics)
}
