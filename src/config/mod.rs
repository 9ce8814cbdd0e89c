//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use statute_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ohio.toml")).unwrap();
//! println!("Crawling {} with {} workers", config.site.name, config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, OutputFormat, SectionDiscovery, SiteConfig,
    StrategyKind, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
