//! # netscout-core
//!
//! Web research tools for LLM agents: search, page fetching, crawling and
//! document extraction, each exposed as an async operation that returns a
//! JSON envelope ready to hand back to a model.
//!
//! ## Architecture
//!
//! - **Tools**: [`WebToolkit`] owns the shared state and exposes every tool
//!   as an `async fn(&self, ...) -> String`
//! - **Result Cache**: [`ResultCache`] stores successful responses of the
//!   expensive tools for a fixed time-to-live
//! - **Crawler**: [`crawler::crawl`] walks a site breadth-first
//! - **Backends**: search, headless browser, PDF and transcript providers
//!   behind traits in [`backends`]
//! - **Error Handling**: one [`Error`] taxonomy with categories and retry
//!   hints, rendered into failure envelopes by [`envelope`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netscout_core::{Config, WebToolkit};
//!
//! # async fn run() -> netscout_core::Result<()> {
//! let toolkit = WebToolkit::new(Config::load()?)?;
//!
//! let results = toolkit.search_web("rust async runtimes", 5).await;
//! let page = toolkit.fetch_webpage("https://tokio.rs", 5000).await;
//! println!("{results}\n{page}");
//! # Ok(())
//! # }
//! ```
//!
//! Tools never return `Err`. A failure is a JSON object with
//! `"status": "error"` (or `"not_found"`), the echoed request identifier and
//! a `message`.
//!
//! ## Logging
//!
//! The crate emits `tracing` events and spans but installs no subscriber.

/// Third-party search, browser, PDF and transcript backends
pub mod backends;
/// Time-bounded cache of tool responses
pub mod cache;
/// Configuration loading and defaults
pub mod config;
/// Breadth-first same-site crawler
pub mod crawler;
/// JSON response envelopes
pub mod envelope;
/// Error types and result aliases
pub mod error;
/// HTTP client with per-request profiles
pub mod fetcher;
/// HTML parsing helpers
pub mod html;
/// HTML to Markdown conversion
pub mod markdown;
/// String helpers
pub mod text;
/// Tool operations
pub mod tools;

pub use cache::{CacheKey, ResultCache};
pub use config::Config;
pub use error::{Error, Result};
pub use fetcher::Fetcher;
pub use tools::{WebToolkit, WebToolkitBuilder};
