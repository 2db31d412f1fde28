//! Tool operations exposed to an LLM agent.
//!
//! Every tool is an async method on [`WebToolkit`] that takes primitive
//! arguments and returns a pretty-printed JSON envelope (see
//! [`crate::envelope`]). Tools never return `Err`: failures are reported in
//! the envelope with `"status": "error"` or `"status": "not_found"`.
//!
//! | Group | Tools |
//! |---|---|
//! | search | `search_web`, `search_news`, `search_images`, `search_youtube`, `search_maps`, `batch_search` |
//! | page | `fetch_webpage`, `fetch_webpage_js`, `fetch_as_markdown`, `take_screenshot`, `extract_links`, `get_page_metadata` |
//! | lookup | `search_wikipedia`, `get_weather`, `translate_text` |
//! | documents | `read_pdf_url`, `get_youtube_transcript` |
//! | crawl | `crawl_website` |
//! | cache | `clear_cache` |
//!
//! `fetch_as_markdown`, `read_pdf_url` and `get_youtube_transcript` store
//! their successful responses in the toolkit's [`ResultCache`].

mod crawl;
mod documents;
mod lookup;
mod page;
mod search;

#[cfg(feature = "browser")]
use crate::backends::ChromiumBrowser;
#[cfg(not(feature = "browser"))]
use crate::backends::UnavailableBrowser;
use crate::backends::{
    BrowserBackend, DuckDuckGo, LopdfReader, PdfReader, SearchBackend, TranscriptBackend,
    YouTubeTranscripts,
};
use crate::cache::{Clock, ResultCache, SystemClock};
use crate::config::Config;
use crate::crawler::PageSource;
use crate::envelope::Envelope;
use crate::fetcher::Fetcher;
use crate::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Request-handling context shared by every tool.
///
/// Owns the HTTP client, the result cache and the backends. Build one per
/// process (or per test) and call tools through `&self`.
///
/// ```rust,no_run
/// use netscout_core::{Config, WebToolkit};
///
/// # async fn run() -> netscout_core::Result<()> {
/// let toolkit = WebToolkit::new(Config::load()?)?;
/// let json = toolkit.fetch_as_markdown("docs.rs", 10_000).await;
/// println!("{json}");
/// # Ok(())
/// # }
/// ```
pub struct WebToolkit {
    config: Config,
    fetcher: Fetcher,
    cache: Mutex<ResultCache>,
    search: Arc<dyn SearchBackend>,
    browser: Arc<dyn BrowserBackend>,
    pdf: Arc<dyn PdfReader>,
    transcripts: Arc<dyn TranscriptBackend>,
    pages: Arc<dyn PageSource>,
}

impl std::fmt::Debug for WebToolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebToolkit")
            .field("config", &self.config)
            .field("search", &self.search.backend_name())
            .finish_non_exhaustive()
    }
}

impl WebToolkit {
    /// Build a toolkit with the default backends.
    pub fn new(config: Config) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Start a builder for swapping individual backends.
    pub fn builder(config: Config) -> WebToolkitBuilder {
        WebToolkitBuilder::new(config)
    }

    /// Active configuration.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Number of entries currently held by the result cache.
    pub async fn cached_entries(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Drop every cached result.
    ///
    /// Returns `{"status": "success", "message": ..., "entries_removed": n}`.
    #[tracing::instrument(skip(self))]
    pub async fn clear_cache(&self) -> String {
        let entries_removed = self.cache.lock().await.clear();
        debug!(entries_removed, "result cache cleared");
        Envelope::success(ClearCacheOutput {
            message: "Cache cleared successfully",
            entries_removed,
        })
        .render()
    }

    /// Return the cached response for `key`, or run `compute` and cache its
    /// success response.
    ///
    /// `compute` yields `Ok(json)` for a success envelope and `Err(json)` for
    /// a failure envelope; only the former is stored. The lock is released
    /// while `compute` runs, so concurrent misses on one key both compute.
    async fn cached<F>(&self, key: String, compute: F) -> String
    where
        F: Future<Output = std::result::Result<String, String>> + Send,
    {
        let hit = self.cache.lock().await.get(&key);
        if let Some(json) = hit {
            return json;
        }
        debug!(key = %key, "result cache miss");

        match compute.await {
            Ok(json) => {
                self.cache.lock().await.put(key, json.clone());
                json
            },
            Err(json) => json,
        }
    }
}

#[derive(Debug, Serialize)]
struct ClearCacheOutput {
    message: &'static str,
    entries_removed: usize,
}

/// Builder for [`WebToolkit`].
pub struct WebToolkitBuilder {
    config: Config,
    search: Option<Arc<dyn SearchBackend>>,
    browser: Option<Arc<dyn BrowserBackend>>,
    pdf: Option<Arc<dyn PdfReader>>,
    transcripts: Option<Arc<dyn TranscriptBackend>>,
    pages: Option<Arc<dyn PageSource>>,
    clock: Option<Arc<dyn Clock>>,
}

impl WebToolkitBuilder {
    fn new(config: Config) -> Self {
        Self {
            config,
            search: None,
            browser: None,
            pdf: None,
            transcripts: None,
            pages: None,
            clock: None,
        }
    }

    /// Use a custom search backend.
    #[must_use]
    pub fn search_backend(mut self, backend: Arc<dyn SearchBackend>) -> Self {
        self.search = Some(backend);
        self
    }

    /// Use a custom headless browser.
    #[must_use]
    pub fn browser_backend(mut self, backend: Arc<dyn BrowserBackend>) -> Self {
        self.browser = Some(backend);
        self
    }

    /// Use a custom PDF reader.
    #[must_use]
    pub fn pdf_reader(mut self, reader: Arc<dyn PdfReader>) -> Self {
        self.pdf = Some(reader);
        self
    }

    /// Use a custom transcript backend.
    #[must_use]
    pub fn transcript_backend(mut self, backend: Arc<dyn TranscriptBackend>) -> Self {
        self.transcripts = Some(backend);
        self
    }

    /// Use a custom page source for crawling.
    #[must_use]
    pub fn page_source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.pages = Some(source);
        self
    }

    /// Read cache time from `clock`.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Construct the toolkit, filling unset backends with the defaults.
    pub fn build(self) -> Result<WebToolkit> {
        let config = self.config;
        if config.cache.ttl_secs == 0 {
            return Err(Error::Config("cache.ttl_secs must be greater than zero".into()));
        }
        let fetcher = Fetcher::from_config(&config.http)?;
        let endpoints = &config.endpoints;

        let search = self.search.unwrap_or_else(|| {
            Arc::new(DuckDuckGo::new(
                fetcher.clone(),
                &endpoints.search_html,
                &endpoints.search_api,
            ))
        });
        let browser = self.browser.unwrap_or_else(|| default_browser(&config));
        let pdf = self.pdf.unwrap_or_else(|| Arc::new(LopdfReader));
        let transcripts = self
            .transcripts
            .unwrap_or_else(|| Arc::new(YouTubeTranscripts::new(fetcher.clone(), &endpoints.youtube)));
        let pages = self
            .pages
            .unwrap_or_else(|| Arc::new(fetcher.clone()) as Arc<dyn PageSource>);
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = ResultCache::with_clock(config.cache.ttl(), clock);

        Ok(WebToolkit {
            config,
            fetcher,
            cache: Mutex::new(cache),
            search,
            browser,
            pdf,
            transcripts,
            pages,
        })
    }
}

#[cfg(feature = "browser")]
fn default_browser(config: &Config) -> Arc<dyn BrowserBackend> {
    Arc::new(ChromiumBrowser::new(config.browser.clone()))
}

#[cfg(not(feature = "browser"))]
fn default_browser(_config: &Config) -> Arc<dyn BrowserBackend> {
    Arc::new(UnavailableBrowser)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn toolkit() -> WebToolkit {
        WebToolkit::new(Config::default()).unwrap()
    }

    #[tokio::test]
    async fn test_cached_stores_only_success() {
        let toolkit = toolkit();
        let calls = AtomicUsize::new(0);

        let failure = toolkit
            .cached("k".into(), async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("failed".to_string())
            })
            .await;
        assert_eq!(failure, "failed");
        assert_eq!(toolkit.cached_entries().await, 0);

        let first = toolkit
            .cached("k".into(), async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("fresh".to_string())
            })
            .await;
        let second = toolkit
            .cached("k".into(), async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("recomputed".to_string())
            })
            .await;

        assert_eq!(first, "fresh");
        assert_eq!(second, "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_cache_reports_count() {
        let toolkit = toolkit();
        toolkit.cached("a".into(), async { Ok("1".to_string()) }).await;
        toolkit.cached("b".into(), async { Ok("2".to_string()) }).await;

        let value: Value = serde_json::from_str(&toolkit.clear_cache().await).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["message"], "Cache cleared successfully");
        assert_eq!(value["entries_removed"], 2);
        assert_eq!(toolkit.cached_entries().await, 0);
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = Config::default();
        config.cache.ttl_secs = 0;
        let err = WebToolkit::new(config).unwrap_err();
        assert_eq!(err.category(), "config");
    }
}
