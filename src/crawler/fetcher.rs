//! Page fetcher
//!
//! The crawl core talks to the network through [`PageFetcher`] and
//! [`FetchSession`]. A session is a worker's private page handle: it is opened
//! once when the worker starts and closed when the worker exits. The shipped
//! implementation, [`HttpFetcher`], issues plain GET requests with `reqwest`
//! and checks the awaited marker against the parsed document.

use crate::config::UserAgentConfig;
use crate::CrawlError;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed for one navigation
const MAX_REDIRECTS: usize = 10;

/// A fetched page
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects
    pub url: Url,
    /// Raw HTML body
    pub html: String,
}

/// What a navigation waits for before the page counts as loaded
#[derive(Debug, Clone)]
pub struct WaitFor {
    /// CSS selector the page must match
    pub selector: String,
    /// Budget for the whole navigation
    pub timeout: Duration,
}

impl WaitFor {
    pub fn new(selector: impl Into<String>, timeout: Duration) -> Self {
        Self {
            selector: selector.into(),
            timeout,
        }
    }
}

/// Opens fetch sessions
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Opens a new session
    ///
    /// # Returns
    ///
    /// * `Ok(Box<dyn FetchSession>)` - A session ready to navigate
    /// * `Err(CrawlError)` - No session could be opened
    async fn open_session(&self) -> Result<Box<dyn FetchSession>, CrawlError>;
}

/// A single page handle owned by one worker
#[async_trait]
pub trait FetchSession: Send {
    /// Navigates to `url` and waits for the marker in `wait`
    async fn navigate(&mut self, url: &Url, wait: &WaitFor) -> Result<Page, CrawlError>;

    /// Releases the session
    async fn close(self: Box<Self>);
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use statute_crawler::config::UserAgentConfig;
/// use statute_crawler::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "StatuteCrawler".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.org/about".to_string(),
///     contact_email: "ops@example.org".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain HTTP page fetcher
///
/// Sessions share the underlying connection pool; opening one is free.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher identifying itself with the configured user agent
    ///
    /// # Returns
    ///
    /// * `Ok(HttpFetcher)` - Fetcher ready to open sessions
    /// * `Err(CrawlError::FetcherLaunch)` - The HTTP client could not be built
    pub fn new(config: &UserAgentConfig) -> Result<Self, CrawlError> {
        let client =
            build_http_client(config).map_err(|e| CrawlError::FetcherLaunch(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn open_session(&self) -> Result<Box<dyn FetchSession>, CrawlError> {
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
        }))
    }
}

struct HttpSession {
    client: Client,
}

impl HttpSession {
    async fn get(&self, url: &Url) -> Result<Page, CrawlError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| classify_error(url, e))?;

        Ok(Page {
            url: final_url,
            html,
        })
    }
}

#[async_trait]
impl FetchSession for HttpSession {
    async fn navigate(&mut self, url: &Url, wait: &WaitFor) -> Result<Page, CrawlError> {
        tracing::debug!("GET {}", url);

        let page = tokio::time::timeout(wait.timeout, self.get(url))
            .await
            .map_err(|_| CrawlError::Timeout {
                url: url.to_string(),
            })??;

        if !has_marker(&page.html, &wait.selector)? {
            return Err(CrawlError::MarkerMissing {
                url: url.to_string(),
                selector: wait.selector.clone(),
            });
        }

        Ok(page)
    }

    async fn close(self: Box<Self>) {}
}

fn classify_error(url: &Url, error: reqwest::Error) -> CrawlError {
    if error.is_timeout() {
        CrawlError::Timeout {
            url: url.to_string(),
        }
    } else {
        CrawlError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

/// Whether the document matches `css`
///
/// Kept synchronous so the parsed document never lives across an await.
fn has_marker(html: &str, css: &str) -> Result<bool, CrawlError> {
    let selector = Selector::parse(css).map_err(|_| CrawlError::Selector(css.to_string()))?;
    let document = Html::parse_document(html);
    let found = document.select(&selector).next().is_some();
    Ok(found)
}
