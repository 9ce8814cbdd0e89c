use crate::hierarchy::NodeKind;
use serde::Deserialize;

/// Main configuration structure for a crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub site: SiteConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of section workers running at once
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Pause a worker takes after each section (milliseconds)
    #[serde(default = "default_request_delay")]
    pub request_delay: u64,

    /// Pause between listing fetches while expanding the hierarchy (milliseconds)
    #[serde(default = "default_expansion_delay")]
    pub expansion_delay: u64,

    /// How long a section page may take to show its content marker (milliseconds)
    #[serde(default = "default_timeout")]
    pub content_timeout: u64,

    /// How long a listing page may take to show its list marker (milliseconds)
    #[serde(default = "default_timeout")]
    pub listing_timeout: u64,

    /// Who discovers the section links of a chapter
    #[serde(default)]
    pub section_discovery: SectionDiscovery,

    /// Consult the site's robots.txt before crawling
    #[serde(default)]
    pub respect_robots: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            request_delay: default_request_delay(),
            expansion_delay: default_expansion_delay(),
            content_timeout: default_timeout(),
            listing_timeout: default_timeout(),
            section_discovery: SectionDiscovery::default(),
            respect_robots: false,
        }
    }
}

fn default_concurrency() -> u32 {
    10
}

fn default_request_delay() -> u64 {
    2000
}

fn default_expansion_delay() -> u64 {
    1000
}

fn default_timeout() -> u64 {
    30_000
}

/// Where section links are discovered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionDiscovery {
    /// The link expander lists sections; workers receive one section each
    #[default]
    Expander,
    /// Workers receive whole chapters and list their sections themselves
    Worker,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Short name of the jurisdiction, used in output metadata
    pub name: String,

    /// Page listing the top level of the hierarchy
    pub root_url: String,

    /// Base for resolving relative links
    pub base_url: String,

    /// Extraction strategy for this site's markup
    pub strategy: StrategyKind,

    /// Levels below the root page, top-down
    pub levels: Vec<NodeKind>,
}

/// Available extraction strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Header-matched tables, text in `.laws-body` (codes.ohio.gov style)
    Table,
    /// Header-matched tables, text in plain paragraphs under a
    /// `Sec. N. NAME.` heading (statutes.capitol.texas.gov style)
    TexasTable,
    /// `ul.generalLawsList` listings (malegislature.gov style)
    List,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// File the crawl result is written to
    pub path: String,

    /// Shape of the output document
    #[serde(default)]
    pub format: OutputFormat,

    /// Optional markdown summary of the run
    #[serde(default)]
    pub summary_path: Option<String>,
}

/// Output document formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// JSON map keyed by `chapter{N}_section{M}`
    #[default]
    Flat,
    /// Nested JSON hierarchy with inline section text
    Tree,
    /// SQLite document store
    Sqlite,
}
