//! Breadth-first site crawler.
//!
//! Starting from a seed URL, pages are fetched in discovery order until the
//! frontier is empty or the page budget is spent. Each URL is fetched at most
//! once per crawl.
//!
//! ## Link Filtering
//!
//! Each `href` on a fetched page is resolved against that page's URL and its
//! fragment is removed. A link is dropped when it:
//!
//! - is empty or fragment-only (`#section`)
//! - resolves to a scheme other than `http`/`https` (`mailto:`, `tel:`,
//!   `javascript:`)
//! - points to another host or port while same-domain restriction is on
//! - ends in a non-content extension (see [`NON_CONTENT_EXTENSIONS`])
//!
//! ## Failures
//!
//! Only the seed fetch can fail the crawl. Any later page that fails to load
//! is skipped, and its links are never followed.
//!
//! ```rust,no_run
//! use netscout_core::crawler::{CrawlOptions, crawl};
//! use netscout_core::Fetcher;
//!
//! # async fn run() -> netscout_core::Result<()> {
//! let fetcher = Fetcher::new()?;
//! let report = crawl(&fetcher, "https://example.com", &CrawlOptions::default()).await?;
//! for page in &report.pages {
//!     println!("{} - {}", page.url, page.title);
//! }
//! # Ok(())
//! # }
//! ```

use crate::fetcher::Fetcher;
use crate::html::{NON_TEXT_ELEMENTS, PageDocument};
use crate::text::take_chars;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use tracing::debug;
use url::Url;

/// Path suffixes of resources that are never crawled.
pub const NON_CONTENT_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".bmp", ".css", ".js",
    ".mjs", ".zip", ".gz", ".tar", ".mp3", ".mp4", ".webm", ".woff", ".woff2", ".ttf",
];

/// Something that can return the HTML of a page.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the HTML body at `url`.
    async fn fetch_html(&self, url: &str) -> Result<String>;
}

#[async_trait]
impl PageSource for Fetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        Ok(self.get_page(url).await?.html)
    }
}

/// Crawl parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Maximum number of pages to return. Must be at least 1.
    pub max_pages: usize,
    /// Only follow links on the seed's host and port.
    pub same_domain: bool,
    /// Maximum characters kept in each page preview.
    pub preview_chars: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_pages: 10,
            same_domain: true,
            preview_chars: 2000,
        }
    }
}

/// One successfully crawled page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    /// Normalized URL that was fetched.
    pub url: String,
    /// Page title, `"No title"` when missing.
    pub title: String,
    /// Leading body text with scripts and styles removed.
    pub content_preview: String,
}

/// Outcome of a crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    /// The seed as given.
    pub start_url: String,
    /// Pages in fetch order.
    pub pages: Vec<PageSummary>,
}

/// Resolve `href` against `base`, dropping fragments and non-web schemes.
///
/// ```rust
/// use netscout_core::crawler::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/docs/").unwrap();
/// assert_eq!(
///     resolve_link("intro#setup", &base).unwrap().as_str(),
///     "https://example.com/docs/intro"
/// );
/// assert!(resolve_link("#top", &base).is_none());
/// assert!(resolve_link("mailto:hi@example.com", &base).is_none());
/// ```
pub fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved)
}

/// Whether `a` and `b` share host (case-insensitive) and explicit port.
pub fn same_site(a: &Url, b: &Url) -> bool {
    let host = |u: &Url| u.host_str().map(str::to_ascii_lowercase);
    host(a) == host(b) && a.port() == b.port()
}

/// Whether the URL path ends in a non-content extension.
pub fn has_non_content_extension(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    NON_CONTENT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Crawl breadth-first from `seed`.
///
/// # Errors
///
/// [`Error::InvalidInput`] when `seed` is not an absolute web URL or
/// `max_pages` is zero; the seed's own fetch error when it cannot be loaded.
pub async fn crawl<S: PageSource + ?Sized>(
    source: &S,
    seed: &str,
    options: &CrawlOptions,
) -> Result<CrawlReport> {
    if options.max_pages == 0 {
        return Err(Error::InvalidInput("max_pages must be at least 1".into()));
    }
    let mut seed_url = Url::parse(seed.trim())?;
    if !matches!(seed_url.scheme(), "http" | "https") {
        return Err(Error::InvalidInput(format!(
            "unsupported URL scheme '{}'",
            seed_url.scheme()
        )));
    }
    seed_url.set_fragment(None);

    let mut state = CrawlState::new(seed_url.as_str());

    while state.pages.len() < options.max_pages {
        let Some(current) = state.pop_unvisited() else {
            break;
        };
        let is_seed = current == seed_url.as_str();

        let html = match source.fetch_html(&current).await {
            Ok(html) => html,
            Err(err) if is_seed => return Err(err),
            Err(err) => {
                debug!(url = %current, category = err.category(), "skipping page: {err}");
                continue;
            },
        };

        let Ok(page_url) = Url::parse(&current) else {
            continue;
        };
        let (summary, hrefs) = summarize_page(&html, &current, options.preview_chars);
        debug!(url = %current, links = hrefs.len(), "crawled page");
        state.pages.push(summary);

        for href in hrefs {
            let Some(link) = resolve_link(&href, &page_url) else {
                continue;
            };
            if options.same_domain && !same_site(&link, &seed_url) {
                continue;
            }
            if has_non_content_extension(&link) {
                continue;
            }
            state.enqueue(link.into());
        }
    }

    Ok(CrawlReport {
        start_url: seed.to_string(),
        pages: state.pages,
    })
}

/// Mutable state of one crawl.
struct CrawlState {
    visited: HashSet<String>,
    frontier: VecDeque<String>,
    // Mirrors `frontier` for O(1) membership checks.
    queued: HashSet<String>,
    pages: Vec<PageSummary>,
}

impl CrawlState {
    fn new(seed: &str) -> Self {
        let mut state = Self {
            visited: HashSet::new(),
            frontier: VecDeque::new(),
            queued: HashSet::new(),
            pages: Vec::new(),
        };
        state.enqueue(seed.to_string());
        state
    }

    /// Pop the next unvisited URL and mark it visited.
    fn pop_unvisited(&mut self) -> Option<String> {
        while let Some(url) = self.frontier.pop_front() {
            self.queued.remove(&url);
            if self.visited.insert(url.clone()) {
                return Some(url);
            }
        }
        None
    }

    fn enqueue(&mut self, url: String) {
        if self.visited.contains(&url) || self.queued.contains(&url) {
            return;
        }
        self.queued.insert(url.clone());
        self.frontier.push_back(url);
    }
}

/// Extract the page summary and raw link targets, dropping the parsed tree.
fn summarize_page(html: &str, url: &str, preview_chars: usize) -> (PageSummary, Vec<String>) {
    let mut doc = PageDocument::parse(html);
    let title = doc.title().unwrap_or_else(|| "No title".to_string());
    let hrefs = doc.anchors().into_iter().map(|a| a.href).collect();
    doc.remove(NON_TEXT_ELEMENTS);
    let text = doc.body_text();

    let summary = PageSummary {
        url: url.to_string(),
        title,
        content_preview: take_chars(&text, preview_chars).to_string(),
    };
    (summary, hrefs)
}
