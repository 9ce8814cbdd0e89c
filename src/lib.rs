//! Statute-Crawler: a polite concurrent crawler for state legal codes
//!
//! This crate walks published legal-code websites (Part → Title → Chapter →
//! Section), fetches every section with a bounded worker pool, and writes the
//! whole hierarchy, section text included, to a structured document.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod hierarchy;
pub mod output;
pub mod robots;
pub mod state;
pub mod store;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Marker '{selector}' not found at {url}")]
    MarkerMissing { url: String, selector: String },

    #[error("Invalid selector '{0}'")]
    Selector(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Failed to start page fetcher: {0}")]
    FetcherLaunch(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::SectionState,
        to: state::SectionState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use hierarchy::{HierarchyNode, LeafDescriptor, NodeKind};
pub use state::SectionState;
pub use store::{ResultStore, SectionDetails, SectionRecord, SectionStatus};
