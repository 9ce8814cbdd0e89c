//! Robots.txt handling
//!
//! Consulted only when `respect-robots` is enabled. The file is fetched once
//! per crawl from the site origin; a missing or unreadable file allows
//! everything.

mod parser;

pub use parser::ParsedRobots;

use crate::crawler::{FetchSession, WaitFor};
use crate::url::robots_url;
use std::time::Duration;
use url::Url;

/// Robots rules bound to the crawler's product token
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    robots: ParsedRobots,
    user_agent: String,
}

impl RobotsPolicy {
    pub fn new(robots: ParsedRobots, user_agent: impl Into<String>) -> Self {
        Self {
            robots,
            user_agent: user_agent.into(),
        }
    }

    /// Whether the crawler may fetch `url`
    pub fn allows(&self, url: &str) -> bool {
        self.robots.is_allowed(url, &self.user_agent)
    }

    /// The `Crawl-delay` that applies to the crawler, if any
    pub fn crawl_delay(&self) -> Option<Duration> {
        self.robots.crawl_delay(&self.user_agent)
    }
}

/// Fetches and parses robots.txt for the origin of `site_url`
///
/// # Arguments
///
/// * `session` - Session used for the request
/// * `site_url` - Any URL on the site
/// * `timeout` - Navigation budget
///
/// # Returns
///
/// The parsed rules, or [`ParsedRobots::allow_all`] if the file cannot be
/// fetched
pub async fn fetch_robots(
    session: &mut dyn FetchSession,
    site_url: &Url,
    timeout: Duration,
) -> ParsedRobots {
    let Some(url) = robots_url(site_url) else {
        return ParsedRobots::allow_all();
    };

    // Plain text still parses to a document with a body
    match session.navigate(&url, &WaitFor::new("body", timeout)).await {
        Ok(page) => {
            tracing::info!("Loaded robots.txt from {}", url);
            ParsedRobots::from_content(&page.html)
        }
        Err(e) => {
            tracing::warn!("Could not fetch {}, allowing all: {}", url, e);
            ParsedRobots::allow_all()
        }
    }
}

/// Calculates the per-worker delay
///
/// This takes the maximum of the configured request delay and the
/// robots.txt crawl delay (if any).
pub fn effective_delay(configured: Duration, policy: Option<&RobotsPolicy>) -> Duration {
    let robots_delay = policy
        .and_then(RobotsPolicy::crawl_delay)
        .unwrap_or(Duration::ZERO);

    std::cmp::max(configured, robots_delay)
}
