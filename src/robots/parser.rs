//! Robots.txt rule matching backed by the `robotstxt` crate

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Parsed robots.txt for one site
///
/// Matching is delegated to Google's matcher; `Crawl-delay`, which that
/// matcher ignores, is read here.
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    /// Raw file body; empty means every path is allowed
    content: String,
}

impl ParsedRobots {
    /// Wraps a fetched robots.txt body
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Permissive rules, used when robots.txt is absent or unreadable
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Checks whether `url` may be fetched by `user_agent`
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL or path, e.g. `"/ohio-revised-code/section-1.01"`
    /// * `user_agent` - Product token of the crawler
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.content.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Gets the `Crawl-delay` for a user agent
    ///
    /// A group naming the agent wins over the `*` group. Values are seconds
    /// and may be fractional.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        let mut group_agents: Vec<String> = Vec::new();
        let mut in_agent_lines = false;
        let mut wildcard_delay = None;
        let mut agent_delay = None;

        let agent = user_agent.to_lowercase();

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    // Consecutive User-agent lines share one group
                    if !in_agent_lines {
                        group_agents.clear();
                    }
                    group_agents.push(value.to_lowercase());
                    in_agent_lines = true;
                }
                "crawl-delay" => {
                    in_agent_lines = false;
                    let Ok(seconds) = value.parse::<f64>() else {
                        continue;
                    };
                    if !seconds.is_finite() || seconds < 0.0 {
                        continue;
                    }
                    if group_agents.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                        agent_delay = Some(seconds);
                    } else if group_agents.iter().any(|ua| ua == "*") {
                        wildcard_delay = Some(seconds);
                    }
                }
                _ => in_agent_lines = false,
            }
        }

        agent_delay
            .or(wildcard_delay)
            .map(Duration::from_secs_f64)
    }
}
