//! Headless browser backend for JavaScript-rendered pages and screenshots.
//!
//! Every call launches its own browser, uses one page, and closes the
//! browser before returning, whether the page work succeeded or not.

use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Text content of a page after scripts have run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Document title, empty when missing.
    pub title: String,
    /// `<meta name="description">` content, empty when missing.
    pub description: String,
    /// Visible body text.
    pub text: String,
}

/// Headless browser automation.
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    /// Load `url`, wait `settle` for scripts, and read the rendered text.
    async fn render(&self, url: &str, settle: Duration) -> Result<RenderedPage>;

    /// Load `url` and capture a PNG of the viewport, or of the whole page
    /// when `full_page` is set.
    async fn screenshot(&self, url: &str, full_page: bool) -> Result<Vec<u8>>;
}

/// Backend that refuses every request.
///
/// The default when the crate is built without the `browser` feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableBrowser;

const UNAVAILABLE: &str = "headless browser support is not enabled (build with the `browser` feature)";

#[async_trait]
impl BrowserBackend for UnavailableBrowser {
    async fn render(&self, _url: &str, _settle: Duration) -> Result<RenderedPage> {
        Err(Error::Browser(UNAVAILABLE.into()))
    }

    async fn screenshot(&self, _url: &str, _full_page: bool) -> Result<Vec<u8>> {
        Err(Error::Browser(UNAVAILABLE.into()))
    }
}

#[cfg(feature = "browser")]
pub use chromium::ChromiumBrowser;

#[cfg(feature = "browser")]
mod chromium {
    use super::{BrowserBackend, RenderedPage};
    use crate::config::BrowserConfig;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
    use chromiumoxide::handler::viewport::Viewport;
    use chromiumoxide::page::{Page, ScreenshotParams};
    use futures::StreamExt;
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tracing::debug;

    const DESCRIPTION_JS: &str =
        "(() => { const m = document.querySelector('meta[name=\"description\"]'); \
         return m ? (m.getAttribute('content') || '') : ''; })()";
    const BODY_TEXT_JS: &str = "document.body ? document.body.innerText : ''";

    fn browser_err(err: impl std::fmt::Display) -> Error {
        Error::Browser(err.to_string())
    }

    /// Chromium driven over the DevTools protocol.
    #[derive(Debug, Clone)]
    pub struct ChromiumBrowser {
        config: BrowserConfig,
    }

    impl ChromiumBrowser {
        /// Create a backend with the given viewport and timing settings.
        pub const fn new(config: BrowserConfig) -> Self {
            Self { config }
        }

        async fn launch(&self) -> Result<(Browser, JoinHandle<()>)> {
            let launch = LaunchConfig::builder()
                .window_size(self.config.viewport_width, self.config.viewport_height)
                .viewport(Viewport {
                    width: self.config.viewport_width,
                    height: self.config.viewport_height,
                    ..Viewport::default()
                })
                .build()
                .map_err(browser_err)?;
            let (browser, mut handler) = Browser::launch(launch).await.map_err(browser_err)?;
            let events = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });
            Ok((browser, events))
        }

        /// Run `work` against a freshly navigated page, then tear the browser down.
        async fn with_page<T, F, Fut>(&self, url: &str, work: F) -> Result<T>
        where
            F: FnOnce(Page) -> Fut + Send,
            Fut: Future<Output = Result<T>> + Send,
            T: Send,
        {
            let (mut browser, events) = self.launch().await?;
            let navigation = Duration::from_secs(self.config.navigation_timeout_secs);

            let outcome = match tokio::time::timeout(navigation, browser.new_page(url)).await {
                Ok(Ok(page)) => work(page).await,
                Ok(Err(err)) => Err(browser_err(err)),
                Err(_) => Err(Error::Timeout(format!(
                    "navigation to {url} exceeded {}s",
                    navigation.as_secs()
                ))),
            };

            if let Err(err) = browser.close().await {
                debug!("browser close failed: {err}");
            }
            if let Err(err) = browser.wait().await {
                debug!("browser exit wait failed: {err}");
            }
            events.abort();
            outcome
        }
    }

    #[async_trait]
    impl BrowserBackend for ChromiumBrowser {
        async fn render(&self, url: &str, settle: Duration) -> Result<RenderedPage> {
            self.with_page(url, |page| async move {
                tokio::time::sleep(settle).await;
                let title = page.get_title().await.map_err(browser_err)?.unwrap_or_default();
                let description = page
                    .evaluate(DESCRIPTION_JS)
                    .await
                    .map_err(browser_err)?
                    .into_value::<String>()
                    .unwrap_or_default();
                let text = page
                    .evaluate(BODY_TEXT_JS)
                    .await
                    .map_err(browser_err)?
                    .into_value::<String>()
                    .unwrap_or_default();
                Ok(RenderedPage {
                    title,
                    description,
                    text,
                })
            })
            .await
        }

        async fn screenshot(&self, url: &str, full_page: bool) -> Result<Vec<u8>> {
            let settle = Duration::from_millis(self.config.screenshot_settle_ms);
            self.with_page(url, |page| async move {
                tokio::time::sleep(settle).await;
                let params = ScreenshotParams::builder().full_page(full_page).build();
                page.screenshot(params).await.map_err(browser_err)
            })
            .await
        }
    }
}
