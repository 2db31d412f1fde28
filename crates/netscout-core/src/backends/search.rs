//! Web search backend trait and the DuckDuckGo implementation.
//!
//! Text search scrapes the DuckDuckGo HTML endpoint. News, image, video and
//! place search first obtain a `vqd` token from the search page and then
//! call the matching JSON endpoint (`news.js`, `i.js`, `v.js`, `local.js`).
//! Every JSON response is decoded into a wire struct whose fields default
//! when absent, then mapped to the public hit types.

use crate::fetcher::{Fetcher, RequestProfile};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

/// A web search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextHit {
    /// Result title.
    pub title: String,
    /// Destination URL.
    pub url: String,
    /// Summary text.
    pub snippet: String,
}

/// A news article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsHit {
    /// Headline.
    pub title: String,
    /// Article URL.
    pub url: String,
    /// Excerpt.
    pub snippet: String,
    /// Publisher name.
    pub source: String,
    /// Publication time (RFC 3339) or `"Unknown"`.
    pub date: String,
}

/// An image result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageHit {
    /// Image title.
    pub title: String,
    /// Full-size image URL.
    pub image_url: String,
    /// Thumbnail URL.
    pub thumbnail_url: String,
    /// Page hosting the image.
    pub source_url: String,
    /// Pixel width, 0 when unknown.
    pub width: u64,
    /// Pixel height, 0 when unknown.
    pub height: u64,
    /// Search engine that indexed the image.
    pub source: String,
}

/// A video result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoHit {
    /// Video title.
    pub title: String,
    /// Watch URL.
    pub url: String,
    /// Description.
    pub description: String,
    /// Hosting platform.
    pub publisher: String,
    /// Duration as displayed, e.g. `"4:12"`.
    pub duration: String,
    /// View count, `None` when unknown.
    pub views: Option<u64>,
    /// Large thumbnail URL.
    pub thumbnail: String,
}

/// A place or business.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceHit {
    /// Place name.
    pub title: String,
    /// Street address.
    pub address: String,
    /// City.
    pub city: String,
    /// State or region.
    pub state: String,
    /// Country code.
    pub country: String,
    /// Phone number.
    pub phone: String,
    /// Website.
    pub website: String,
    /// Latitude, when known.
    pub latitude: Option<f64>,
    /// Longitude, when known.
    pub longitude: Option<f64>,
    /// Business category.
    pub category: String,
}

/// Source of web, news, image, video and place search results.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Web search.
    async fn text(&self, query: &str, max_results: usize) -> Result<Vec<TextHit>>;

    /// News search.
    async fn news(&self, query: &str, max_results: usize) -> Result<Vec<NewsHit>>;

    /// Image search.
    async fn images(&self, query: &str, max_results: usize) -> Result<Vec<ImageHit>>;

    /// Video search.
    async fn videos(&self, query: &str, max_results: usize) -> Result<Vec<VideoHit>>;

    /// Place search.
    async fn places(&self, query: &str, max_results: usize) -> Result<Vec<PlaceHit>>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}

/// Regex for the `vqd` token embedded in DuckDuckGo search pages.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static VQD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"vqd=["']?([0-9-]+)["']?"#).unwrap());

/// DuckDuckGo search without an API key.
#[derive(Debug, Clone)]
pub struct DuckDuckGo {
    fetcher: Fetcher,
    html_endpoint: String,
    api_base: String,
}

impl DuckDuckGo {
    /// Create a backend against the given endpoints.
    ///
    /// `html_endpoint` receives text-search form posts; `api_base` hosts the
    /// token page and the JSON endpoints.
    pub fn new(fetcher: Fetcher, html_endpoint: &str, api_base: &str) -> Self {
        Self {
            fetcher,
            html_endpoint: html_endpoint.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn referer(&self) -> String {
        format!("{}/", self.api_base)
    }

    async fn vqd(&self, query: &str) -> Result<String> {
        let page = self
            .fetcher
            .get_text(&self.referer(), &[("q", query)], RequestProfile::Page)
            .await?;
        VQD_RE
            .captures(&page)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| Error::Parse("search token not found in DuckDuckGo response".into()))
    }

    async fn json_results<T>(
        &self,
        endpoint: &str,
        query: &str,
        extra: &[(&str, &str)],
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        let vqd = self.vqd(query).await?;
        let mut params = vec![("l", "wt-wt"), ("o", "json"), ("q", query), ("vqd", vqd.as_str())];
        params.extend_from_slice(extra);

        let url = format!("{}/{endpoint}", self.api_base);
        let reply: JsonResults<T> = self
            .fetcher
            .get_json_with_referer(&url, &params, &self.referer())
            .await?;
        debug!(endpoint, results = reply.results.len(), "duckduckgo json results");
        Ok(reply.results)
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGo {
    async fn text(&self, query: &str, max_results: usize) -> Result<Vec<TextHit>> {
        let body = self
            .fetcher
            .post_form(&self.html_endpoint, &[("q", query)])
            .await?;
        Ok(parse_html_results(&body, max_results))
    }

    async fn news(&self, query: &str, max_results: usize) -> Result<Vec<NewsHit>> {
        let raw: Vec<WireNews> = self
            .json_results("news.js", query, &[("noamp", "1"), ("p", "-1")])
            .await?;
        Ok(raw.into_iter().take(max_results).map(NewsHit::from).collect())
    }

    async fn images(&self, query: &str, max_results: usize) -> Result<Vec<ImageHit>> {
        let raw: Vec<WireImage> = self
            .json_results("i.js", query, &[("f", ",,,,,"), ("p", "1")])
            .await?;
        Ok(raw.into_iter().take(max_results).map(ImageHit::from).collect())
    }

    async fn videos(&self, query: &str, max_results: usize) -> Result<Vec<VideoHit>> {
        let raw: Vec<WireVideo> = self
            .json_results("v.js", query, &[("f", ",,,"), ("p", "-1")])
            .await?;
        Ok(raw.into_iter().take(max_results).map(VideoHit::from).collect())
    }

    async fn places(&self, query: &str, max_results: usize) -> Result<Vec<PlaceHit>> {
        let raw: Vec<WirePlace> = self
            .json_results("local.js", query, &[("tg", "maps_places"), ("rt", "D")])
            .await?;
        Ok(raw.into_iter().take(max_results).map(PlaceHit::from).collect())
    }

    fn backend_name(&self) -> &'static str {
        "duckduckgo"
    }
}

/// Parse the DuckDuckGo HTML results page.
fn parse_html_results(body: &str, max_results: usize) -> Vec<TextHit> {
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse("a.result__a"),
        Selector::parse("a.result__snippet, .result__snippet"),
    ) else {
        return Vec::new();
    };

    let doc = Html::parse_document(body);
    doc.select(&result_sel)
        .filter_map(|result| {
            let link = result.select(&link_sel).next()?;
            let title = link.text().collect::<String>().trim().to_string();
            if title.is_empty() {
                return None;
            }
            let url = link
                .value()
                .attr("href")
                .map(decode_redirect)
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| "No URL".to_string());
            let snippet = result
                .select(&snippet_sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "No description".to_string());
            Some(TextHit {
                title,
                url,
                snippet,
            })
        })
        .take(max_results)
        .collect()
}

/// Unwrap `//duckduckgo.com/l/?uddg=<encoded>&rut=...` redirect links.
fn decode_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    Url::parse(&absolute)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or(absolute)
}

fn or_default(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[derive(Debug, Deserialize)]
struct JsonResults<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireNews {
    title: Option<String>,
    url: Option<String>,
    excerpt: Option<String>,
    source: Option<String>,
    date: Option<i64>,
}

impl From<WireNews> for NewsHit {
    fn from(raw: WireNews) -> Self {
        let date = raw
            .date
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .map_or_else(|| "Unknown".to_string(), |d| d.to_rfc3339());
        Self {
            title: or_default(raw.title, "No title"),
            url: or_default(raw.url, "No URL"),
            snippet: or_default(raw.excerpt, "No description"),
            source: or_default(raw.source, "Unknown"),
            date,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireImage {
    title: Option<String>,
    image: Option<String>,
    thumbnail: Option<String>,
    url: Option<String>,
    width: Option<u64>,
    height: Option<u64>,
    source: Option<String>,
}

impl From<WireImage> for ImageHit {
    fn from(raw: WireImage) -> Self {
        Self {
            title: or_default(raw.title, "No title"),
            image_url: raw.image.unwrap_or_default(),
            thumbnail_url: raw.thumbnail.unwrap_or_default(),
            source_url: raw.url.unwrap_or_default(),
            width: raw.width.unwrap_or(0),
            height: raw.height.unwrap_or(0),
            source: or_default(raw.source, "Unknown"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireVideo {
    title: Option<String>,
    content: Option<String>,
    description: Option<String>,
    publisher: Option<String>,
    duration: Option<String>,
    statistics: Option<WireVideoStats>,
    images: Option<WireVideoImages>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireVideoStats {
    #[serde(rename = "viewCount")]
    view_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireVideoImages {
    large: Option<String>,
}

impl From<WireVideo> for VideoHit {
    fn from(raw: WireVideo) -> Self {
        Self {
            title: or_default(raw.title, "No title"),
            url: raw.content.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            publisher: or_default(raw.publisher, "Unknown"),
            duration: raw.duration.unwrap_or_default(),
            views: raw.statistics.and_then(|s| s.view_count),
            thumbnail: raw.images.and_then(|i| i.large).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WirePlace {
    name: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country_code: Option<String>,
    phone: Option<String>,
    website: Option<String>,
    coordinates: Option<WireCoordinates>,
    ddg_category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireCoordinates {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl From<WirePlace> for PlaceHit {
    fn from(raw: WirePlace) -> Self {
        let (latitude, longitude) = raw
            .coordinates
            .map_or((None, None), |c| (c.latitude, c.longitude));
        Self {
            title: or_default(raw.name, "No title"),
            address: raw.address.unwrap_or_default(),
            city: raw.city.unwrap_or_default(),
            state: raw.state.unwrap_or_default(),
            country: raw.country_code.unwrap_or_default(),
            phone: raw.phone.unwrap_or_default(),
            website: raw.website.unwrap_or_default(),
            latitude,
            longitude,
            category: raw.ddg_category.unwrap_or_default(),
        }
    }
}
