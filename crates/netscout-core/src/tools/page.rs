use super::WebToolkit;
use crate::cache::CacheKey;
use crate::crawler::same_site;
use crate::envelope::{Envelope, Failure};
use crate::html::{NON_TEXT_ELEMENTS, PageDocument};
use crate::markdown::page_to_markdown;
use crate::text::{
    TRUNCATED_BLOCK, TRUNCATED_INLINE, collapse_whitespace, take_chars, truncate_with_suffix,
    with_scheme,
};
use crate::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use url::Url;

#[derive(Debug, Serialize)]
struct PageTextOutput<'a> {
    url: &'a str,
    title: String,
    description: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct MarkdownOutput<'a> {
    url: &'a str,
    title: String,
    content_markdown: String,
}

#[derive(Debug, Serialize)]
struct ScreenshotOutput<'a> {
    url: &'a str,
    saved_to: String,
    full_page: bool,
    base64_preview: String,
}

#[derive(Debug, Serialize)]
struct LinksOutput<'a> {
    source_url: &'a str,
    total_links: usize,
    links: Vec<Link>,
}

#[derive(Debug, Serialize)]
struct Link {
    url: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct MetadataOutput<'a> {
    url: &'a str,
    title: String,
    description: String,
    keywords: String,
    canonical_url: String,
    favicon: String,
    opengraph: Map<String, Value>,
    twitter_card: Map<String, Value>,
}

impl WebToolkit {
    /// Fetch a page and return its title, description and visible text.
    ///
    /// Scripts, styles and `noscript` blocks are dropped before the body text
    /// is collected. Text beyond `max_length` characters is cut and marked
    /// `... [truncated]`.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_webpage(&self, url: &str, max_length: usize) -> String {
        let url = with_scheme(url);
        match self.page_text(&url, max_length).await {
            Ok(json) => json,
            Err(err) => Failure::new("Failed to fetch webpage", &err)
                .subject("url", &url)
                .render(),
        }
    }

    async fn page_text(&self, url: &str, max_length: usize) -> Result<String> {
        let page = self.fetcher.get_page(url).await?;
        let (title, description, text) = {
            let mut doc = PageDocument::parse(&page.html);
            doc.remove(NON_TEXT_ELEMENTS);
            (
                doc.title().unwrap_or_else(|| "No title".to_string()),
                doc.meta_named("description").unwrap_or_default(),
                doc.body_text(),
            )
        };
        Ok(Envelope::success(PageTextOutput {
            url,
            title,
            description,
            content: truncate_with_suffix(&text, max_length, TRUNCATED_INLINE),
        })
        .render())
    }

    /// Render a page in the headless browser, wait `wait_time` seconds for
    /// scripts, then return the same fields as [`Self::fetch_webpage`].
    #[tracing::instrument(skip(self))]
    pub async fn fetch_webpage_js(&self, url: &str, max_length: usize, wait_time: u64) -> String {
        let url = with_scheme(url);
        match self.browser.render(&url, Duration::from_secs(wait_time)).await {
            Ok(rendered) => {
                let title = if rendered.title.trim().is_empty() {
                    "No title".to_string()
                } else {
                    rendered.title
                };
                let text = collapse_whitespace(&rendered.text);
                Envelope::success(PageTextOutput {
                    url: &url,
                    title,
                    description: rendered.description,
                    content: truncate_with_suffix(&text, max_length, TRUNCATED_INLINE),
                })
                .render()
            },
            Err(err) => Failure::new("Failed to fetch webpage", &err)
                .subject("url", &url)
                .render(),
        }
    }

    /// Fetch a page and convert its main content to Markdown.
    ///
    /// Successful responses are cached per `(url, max_length)`.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_as_markdown(&self, url: &str, max_length: usize) -> String {
        let url = with_scheme(url);
        let key = CacheKey::new("markdown").arg(&url).arg(max_length).finish();
        self.cached(key, async {
            self.markdown_page(&url, max_length).await.map_err(|err| {
                Failure::new("Failed to fetch as markdown", &err)
                    .subject("url", &url)
                    .render()
            })
        })
        .await
    }

    async fn markdown_page(&self, url: &str, max_length: usize) -> Result<String> {
        let page = self.fetcher.get_page(url).await?;
        let converted = page_to_markdown(&page.html)?;
        Ok(Envelope::success(MarkdownOutput {
            url,
            title: converted.title,
            content_markdown: truncate_with_suffix(&converted.markdown, max_length, TRUNCATED_BLOCK),
        })
        .render())
    }

    /// Capture a PNG of a page and write it to disk.
    ///
    /// Without `output_path` the file is named after the host
    /// (`screenshot_example_com.png`) and placed in `browser.screenshot_dir`
    /// or the working directory. The response reports the absolute path and
    /// the first characters of the base64-encoded image.
    #[tracing::instrument(skip(self))]
    pub async fn take_screenshot(
        &self,
        url: &str,
        full_page: bool,
        output_path: Option<&Path>,
    ) -> String {
        let url = with_scheme(url);
        match self.screenshot_to_file(&url, full_page, output_path).await {
            Ok(json) => json,
            Err(err) => Failure::new("Screenshot failed", &err)
                .subject("url", &url)
                .render(),
        }
    }

    async fn screenshot_to_file(
        &self,
        url: &str,
        full_page: bool,
        output_path: Option<&Path>,
    ) -> Result<String> {
        let target = match output_path {
            Some(path) => path.to_path_buf(),
            None => self.default_screenshot_path(&Url::parse(url)?),
        };
        let png = self.browser.screenshot(url, full_page).await?;
        tokio::fs::write(&target, &png).await?;
        let saved_to = std::path::absolute(&target)?;
        info!("Saved {} byte screenshot to {}", png.len(), saved_to.display());

        let encoded = STANDARD.encode(&png);
        let preview_chars = self.config.limits.screenshot_preview_chars;
        let base64_preview = truncate_with_suffix(&encoded, preview_chars, "...");

        Ok(Envelope::success(ScreenshotOutput {
            url,
            saved_to: saved_to.display().to_string(),
            full_page,
            base64_preview,
        })
        .render())
    }

    fn default_screenshot_path(&self, url: &Url) -> PathBuf {
        let mut netloc = url.host_str().unwrap_or("page").to_string();
        if let Some(port) = url.port() {
            netloc.push_str(&format!("_{port}"));
        }
        let name = format!("screenshot_{}.png", netloc.replace('.', "_"));
        match &self.config.browser.screenshot_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// List the absolute `http(s)` links on a page, deduplicated, in
    /// document order.
    ///
    /// With `same_domain_only`, links to other hosts are dropped.
    #[tracing::instrument(skip(self))]
    pub async fn extract_links(&self, url: &str, same_domain_only: bool) -> String {
        let url = with_scheme(url);
        match self.page_links(&url, same_domain_only).await {
            Ok(json) => json,
            Err(err) => Failure::new("Failed to extract links", &err)
                .subject("url", &url)
                .render(),
        }
    }

    async fn page_links(&self, url: &str, same_domain_only: bool) -> Result<String> {
        let page = self.fetcher.get_page(url).await?;
        let base = Url::parse(&page.url)?;
        let links = collect_links(
            &page.html,
            &base,
            same_domain_only,
            self.config.limits.link_text_chars,
        );
        Ok(Envelope::success(LinksOutput {
            source_url: url,
            total_links: links.len(),
            links,
        })
        .render())
    }

    /// Read the title, description, keywords, canonical URL, favicon,
    /// OpenGraph and Twitter card tags of a page.
    #[tracing::instrument(skip(self))]
    pub async fn get_page_metadata(&self, url: &str) -> String {
        let url = with_scheme(url);
        match self.page_metadata(&url).await {
            Ok(json) => json,
            Err(err) => Failure::new("Failed to extract metadata", &err)
                .subject("url", &url)
                .render(),
        }
    }

    async fn page_metadata(&self, url: &str) -> Result<String> {
        let page = self.fetcher.get_page(url).await?;
        let base = Url::parse(&page.url)?;
        Ok(Envelope::success(read_metadata(url, &page.html, &base)).render())
    }
}

fn read_metadata<'a>(url: &'a str, html: &str, base: &Url) -> MetadataOutput<'a> {
    let doc = PageDocument::parse(html);
    let favicon = doc
        .favicon()
        .and_then(|href| base.join(href.trim()).ok())
        .map(String::from)
        .unwrap_or_default();
    MetadataOutput {
        url,
        title: doc.title().unwrap_or_default(),
        description: doc.meta_named("description").unwrap_or_default(),
        keywords: doc.meta_named("keywords").unwrap_or_default(),
        canonical_url: doc.canonical().unwrap_or_default(),
        favicon,
        opengraph: tag_map(doc.meta_with_prefix("property", "og:")),
        twitter_card: tag_map(doc.meta_with_prefix("name", "twitter:")),
    }
}

fn collect_links(html: &str, base: &Url, same_domain_only: bool, text_chars: usize) -> Vec<Link> {
    let doc = PageDocument::parse(html);
    let mut seen = HashSet::new();
    doc.anchors()
        .into_iter()
        .filter_map(|anchor| {
            let target = base.join(anchor.href.trim()).ok()?;
            if !matches!(target.scheme(), "http" | "https") {
                return None;
            }
            if same_domain_only && !same_site(&target, base) {
                return None;
            }
            let absolute = String::from(target);
            seen.insert(absolute.clone()).then(|| Link {
                url: absolute,
                text: take_chars(&anchor.text, text_chars).to_string(),
            })
        })
        .collect()
}

fn tag_map(pairs: Vec<(String, String)>) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}
