//! Site-specific extraction strategies
//!
//! Each legislature publishes its code with different markup. A strategy
//! knows where a site lists the children of a node and where it keeps the
//! body of a section. Strategies are pure functions of a fetched [`Page`];
//! they never perform I/O and report a miss as an empty list or `None`.

mod list;
mod table;

pub use list::ListStrategy;
pub use table::TableStrategy;

use crate::config::StrategyKind;
use crate::crawler::Page;
use crate::hierarchy::NodeKind;
use crate::store::SectionDetails;
use scraper::Selector;
use std::sync::Arc;
use url::Url;

/// A link to a child node as shown on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildLink {
    /// Raw display text, e.g. `"Chapter 5 | Definitions"`
    pub label: String,
    /// Absolute URL of the child page
    pub url: String,
}

/// Locates hierarchy links and section text in a site's markup
pub trait ExtractionStrategy: Send + Sync {
    /// Lists the children of the given kind on a listing page
    fn list_children(&self, page: &Page, kind: NodeKind) -> Vec<ChildLink>;

    /// Extracts the body text of a section page
    fn extract_text(&self, page: &Page) -> Option<String>;

    /// Reads headings and dates a section page carries besides its text
    fn extract_details(&self, _page: &Page) -> SectionDetails {
        SectionDetails::default()
    }

    /// Selector a listing page must match before it is read
    fn listing_marker(&self) -> &str;

    /// Selector a section page must match before it is read
    fn content_marker(&self) -> &str;
}

/// Builds the strategy for a configured site
///
/// # Arguments
///
/// * `kind` - Strategy named in the site configuration
/// * `base_url` - Base for resolving relative hrefs
pub fn build_strategy(kind: StrategyKind, base_url: Url) -> Arc<dyn ExtractionStrategy> {
    match kind {
        StrategyKind::Table => Arc::new(TableStrategy::new(base_url)),
        StrategyKind::TexasTable => Arc::new(TableStrategy::texas(base_url)),
        StrategyKind::List => Arc::new(ListStrategy::new(base_url)),
    }
}

// Selectors below are literals; a parse failure is a programming error that
// degrades to "no match" rather than aborting a crawl.
pub(crate) fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::error!("Invalid selector '{}': {:?}", css, e);
            None
        }
    }
}

/// Collapses runs of whitespace into single spaces
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
