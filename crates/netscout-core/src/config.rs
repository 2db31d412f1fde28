//! Configuration management for netscout.
//!
//! Configuration is stored in TOML format. Every field has a default, so a
//! partial file (or no file at all) is valid.
//!
//! ## Resolution Order
//!
//! 1. **Config file**: `$NETSCOUT_CONFIG`, or `config.toml` in the platform
//!    config directory (see [`Config::default_path`])
//! 2. **Defaults** for anything the file leaves out
//! 3. **Environment variables**: `NETSCOUT_CACHE_TTL_SECS`, `NETSCOUT_USER_AGENT`
//!
//! ## Example Configuration File
//!
//! ```toml
//! [cache]
//! ttl_secs = 600
//!
//! [http]
//! page_timeout_secs = 20
//!
//! [limits]
//! crawl_preview_chars = 1000
//!
//! [endpoints]
//! weather = "https://wttr.in"
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "NETSCOUT_CONFIG";
/// Environment variable overriding [`CacheConfig::ttl_secs`].
pub const CACHE_TTL_ENV: &str = "NETSCOUT_CACHE_TTL_SECS";
/// Environment variable overriding [`HttpConfig::user_agent`].
pub const USER_AGENT_ENV: &str = "NETSCOUT_USER_AGENT";

/// Top-level configuration for the toolkit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Result cache settings
    pub cache: CacheConfig,
    /// HTTP client settings
    pub http: HttpConfig,
    /// Output size limits
    pub limits: LimitsConfig,
    /// Headless browser settings
    pub browser: BrowserConfig,
    /// Base URLs of the public APIs the lookup tools call
    pub endpoints: EndpointsConfig,
}

/// Result cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live applied to every cached tool result, in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl CacheConfig {
    /// TTL as a [`Duration`].
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// HTTP client settings.
///
/// Pages are requested with a browser-like user agent; public APIs
/// (Wikipedia, wttr.in, MyMemory) get an identifying one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User agent for webpage, crawl and document requests.
    pub user_agent: String,
    /// User agent for JSON API requests.
    pub api_user_agent: String,
    /// Timeout for webpage and crawl requests, in seconds.
    pub page_timeout_secs: u64,
    /// Timeout for JSON API requests, in seconds.
    pub api_timeout_secs: u64,
    /// Timeout for document (PDF) downloads, in seconds.
    pub document_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            api_user_agent: concat!("netscout/", env!("CARGO_PKG_VERSION")).to_string(),
            page_timeout_secs: 15,
            api_timeout_secs: 10,
            document_timeout_secs: 30,
        }
    }
}

/// Output size limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum number of queries a batch search runs.
    pub batch_max_queries: usize,
    /// Characters of body text kept per crawled page.
    pub crawl_preview_chars: usize,
    /// Characters of text kept per PDF page.
    pub pdf_page_chars: usize,
    /// Characters of concatenated PDF text kept.
    pub pdf_full_text_chars: usize,
    /// Transcript segments returned.
    pub transcript_max_segments: usize,
    /// Characters of base64 screenshot preview returned.
    pub screenshot_preview_chars: usize,
    /// Characters of anchor text kept per extracted link.
    pub link_text_chars: usize,
    /// Characters of text sent to the language detection probe.
    pub detect_probe_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            batch_max_queries: 10,
            crawl_preview_chars: 2000,
            pdf_page_chars: 3000,
            pdf_full_text_chars: 50_000,
            transcript_max_segments: 100,
            screenshot_preview_chars: 500,
            link_text_chars: 100,
            detect_probe_chars: 100,
        }
    }
}

/// Headless browser settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Viewport width in CSS pixels.
    pub viewport_width: u32,
    /// Viewport height in CSS pixels.
    pub viewport_height: u32,
    /// Navigation timeout, in seconds.
    pub navigation_timeout_secs: u64,
    /// Delay after navigation before a screenshot is captured, in milliseconds.
    pub screenshot_settle_ms: u64,
    /// Directory for auto-named screenshots. Relative to the working
    /// directory when unset.
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
            navigation_timeout_secs: 30,
            screenshot_settle_ms: 2000,
            screenshot_dir: None,
        }
    }
}

/// Base URLs of the public APIs used by the lookup tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Wikipedia REST API root (`/page/summary/{title}` is appended).
    pub wikipedia_rest: String,
    /// Wikipedia action API (`opensearch` suggestions).
    pub wikipedia_action: String,
    /// wttr.in root.
    pub weather: String,
    /// MyMemory translation API root (`/get` is appended).
    pub translate: String,
    /// DuckDuckGo HTML results endpoint used for text search.
    pub search_html: String,
    /// DuckDuckGo root for token discovery and the JSON result endpoints.
    pub search_api: String,
    /// YouTube root (`/watch?v=` is appended for caption discovery).
    pub youtube: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            wikipedia_rest: "https://en.wikipedia.org/api/rest_v1".to_string(),
            wikipedia_action: "https://en.wikipedia.org/w/api.php".to_string(),
            weather: "https://wttr.in".to_string(),
            translate: "https://api.mymemory.translated.net".to_string(),
            search_html: "https://html.duckduckgo.com/html/".to_string(),
            search_api: "https://duckduckgo.com".to_string(),
            youtube: "https://www.youtube.com".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, then apply environment
    /// overrides.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use netscout_core::Config;
    ///
    /// let config = Config::load()?;
    /// println!("cache ttl: {}s", config.cache.ttl_secs);
    /// # Ok::<(), netscout_core::Error>(())
    /// ```
    pub fn load() -> Result<Self> {
        let path = match std::env::var(CONFIG_PATH_ENV) {
            Ok(explicit) if !explicit.is_empty() => Some(PathBuf::from(explicit)),
            _ => Self::default_path(),
        };

        let mut config = match path {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from an explicit file, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Platform config file location:
    /// - Linux: `~/.config/netscout/config.toml`
    /// - macOS: `~/Library/Application Support/dev.netscout.netscout/config.toml`
    /// - Windows: `%APPDATA%\netscout\netscout\config\config.toml`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "netscout", "netscout")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(ttl) = std::env::var(CACHE_TTL_ENV) {
            self.cache.ttl_secs = ttl.trim().parse().map_err(|e| {
                Error::Config(format!("{CACHE_TTL_ENV} must be a whole number of seconds: {e}"))
            })?;
        }
        if let Ok(agent) = std::env::var(USER_AGENT_ENV) {
            if !agent.trim().is_empty() {
                self.http.user_agent = agent;
            }
        }
        Ok(())
    }
}
