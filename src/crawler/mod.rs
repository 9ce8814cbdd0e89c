//! Crawler module for hierarchy expansion and section fetching
//!
//! This module contains the core crawling logic, including:
//! - The page fetcher contract and its HTTP implementation
//! - Sequential expansion of the Part/Title/Chapter/Section hierarchy
//! - The bounded-concurrency section scheduler
//! - Overall crawl coordination

mod coordinator;
mod expander;
mod fetcher;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator, CrawlPlan};
pub use expander::{fetch_listing, LinkExpander};
pub use fetcher::{build_http_client, FetchSession, HttpFetcher, Page, PageFetcher, WaitFor};
pub use scheduler::{CrawlScheduler, RunSummary, SchedulerSettings, WorkItem, WorkQueue};

use crate::config::Config;
use crate::output::CrawlStatistics;
use crate::CrawlError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP fetcher
/// 2. Expand the hierarchy from the site root
/// 3. Fetch every section with the worker pool
/// 4. Write the configured output and summary
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Crawl completed
/// * `Err(CrawlError)` - Crawl could not start or its output could not be written
pub async fn crawl(config: Config, config_hash: String) -> Result<CrawlStatistics, CrawlError> {
    run_crawl(config, config_hash).await
}
