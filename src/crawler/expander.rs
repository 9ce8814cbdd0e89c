//! Hierarchical link expander
//!
//! Walks the configured levels top-down with a single session, one listing
//! page at a time, and builds the [`HierarchyNode`] tree the worklist is
//! taken from. A listing that fails to load or shows no children is logged
//! and contributes nothing; the walk carries on with its siblings.

use crate::crawler::{FetchSession, WaitFor};
use crate::extract::{ChildLink, ExtractionStrategy};
use crate::hierarchy::{HierarchyNode, NodeKind};
use crate::robots::RobotsPolicy;
use crate::CrawlError;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Lists the children of `kind` on the page at `url`
///
/// Shared by the expander and by workers doing section discovery. Links
/// disallowed by `robots` are dropped.
///
/// # Returns
///
/// * `Ok(Vec<ChildLink>)` - Links in page order, possibly empty
/// * `Err(CrawlError)` - The listing could not be loaded, or the strategy panicked
pub async fn fetch_listing<S>(
    session: &mut S,
    strategy: &dyn ExtractionStrategy,
    url: &Url,
    kind: NodeKind,
    timeout: Duration,
    robots: Option<&RobotsPolicy>,
) -> Result<Vec<ChildLink>, CrawlError>
where
    S: FetchSession + ?Sized,
{
    let wait = WaitFor::new(strategy.listing_marker(), timeout);
    let page = session.navigate(url, &wait).await?;

    let links = catch_unwind(AssertUnwindSafe(|| strategy.list_children(&page, kind)))
        .map_err(|_| CrawlError::Extraction(format!("strategy panicked listing {}", url)))?;

    let Some(policy) = robots else {
        return Ok(links);
    };

    Ok(links
        .into_iter()
        .filter(|link| {
            let allowed = policy.allows(&link.url);
            if !allowed {
                tracing::debug!("Skipping {} (disallowed by robots.txt)", link.url);
            }
            allowed
        })
        .collect())
}

type ExpandFuture<'a> = Pin<Box<dyn Future<Output = Vec<HierarchyNode>> + Send + 'a>>;

/// Builds the hierarchy tree from the root listing
pub struct LinkExpander {
    strategy: Arc<dyn ExtractionStrategy>,
    /// Levels below the root this expander lists, top-down
    levels: Vec<NodeKind>,
    listing_timeout: Duration,
    delay: Duration,
    robots: Option<Arc<RobotsPolicy>>,
}

impl LinkExpander {
    /// Creates an expander
    ///
    /// # Arguments
    ///
    /// * `strategy` - Site extraction strategy
    /// * `levels` - Levels to list below the root, top-down
    /// * `listing_timeout` - Navigation budget per listing page
    /// * `delay` - Pause between listing fetches
    pub fn new(
        strategy: Arc<dyn ExtractionStrategy>,
        levels: Vec<NodeKind>,
        listing_timeout: Duration,
        delay: Duration,
    ) -> Self {
        Self {
            strategy,
            levels,
            listing_timeout,
            delay,
            robots: None,
        }
    }

    pub fn with_robots(mut self, robots: Option<Arc<RobotsPolicy>>) -> Self {
        self.robots = robots;
        self
    }

    /// Expands the tree under `root_url`
    ///
    /// Never fails: unreachable branches are logged and left empty.
    pub async fn expand<S>(&self, session: &mut S, root_url: &Url) -> Vec<HierarchyNode>
    where
        S: FetchSession + ?Sized,
    {
        tracing::info!(
            "Expanding hierarchy from {} ({} levels)",
            root_url,
            self.levels.len()
        );

        let tree = self.expand_level(session, root_url.clone(), 0, false).await;

        tracing::info!("Expansion found {} top-level nodes", tree.len());
        tree
    }

    fn expand_level<'a, S>(
        &'a self,
        session: &'a mut S,
        url: Url,
        depth: usize,
        pause: bool,
    ) -> ExpandFuture<'a>
    where
        S: FetchSession + ?Sized + 'a,
    {
        Box::pin(async move {
            let Some(&kind) = self.levels.get(depth) else {
                return Vec::new();
            };

            if pause && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let links = match fetch_listing(
                &mut *session,
                self.strategy.as_ref(),
                &url,
                kind,
                self.listing_timeout,
                self.robots.as_deref(),
            )
            .await
            {
                Ok(links) => links,
                Err(e) => {
                    tracing::warn!("Could not list {}s at {}: {}", kind.as_str(), url, e);
                    return Vec::new();
                }
            };

            if links.is_empty() {
                tracing::warn!("No {} links found at {}", kind.as_str(), url);
                return Vec::new();
            }
            tracing::debug!("{} {} links at {}", links.len(), kind.as_str(), url);

            let descend = kind != NodeKind::Section && depth + 1 < self.levels.len();
            let mut nodes = Vec::with_capacity(links.len());

            for link in &links {
                let mut node = HierarchyNode::from_link(kind, link);

                if descend {
                    match Url::parse(&node.url) {
                        Ok(child_url) => {
                            node.children =
                                self.expand_level(&mut *session, child_url, depth + 1, true).await;
                        }
                        Err(e) => tracing::warn!("Skipping children of {}: {}", node.url, e),
                    }
                }

                nodes.push(node);
            }

            nodes
        })
    }
}
