//! HTML to Markdown conversion for LLM consumption.

use crate::html::{BOILERPLATE_ELEMENTS, PageDocument};
use crate::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Regex for Markdown images: `![alt](src)`
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());

/// Regex for Markdown links: `[text](href)`
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());

/// Three or more consecutive newlines, blank-ish lines included.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static EXCESS_NEWLINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Title and cleaned Markdown body of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownPage {
    /// Page title, `"No title"` when missing.
    pub title: String,
    /// Markdown content, images and link targets removed.
    pub markdown: String,
}

/// Convert a full HTML page to Markdown.
///
/// Navigation and other boilerplate is removed first, then the main content
/// region (or `<body>`) is converted. Images are dropped,
/// links keep only their text, and runs of blank lines collapse to one.
pub fn page_to_markdown(source: &str) -> Result<MarkdownPage> {
    let (title, content_html) = {
        let mut doc = PageDocument::parse(source);
        let title = doc.title().unwrap_or_else(|| "No title".to_string());
        doc.remove(BOILERPLATE_ELEMENTS);
        (title, doc.main_content_html())
    };

    let markdown = html_to_markdown(&content_html)?;
    Ok(MarkdownPage { title, markdown })
}

/// Convert an HTML fragment to cleaned Markdown.
pub fn html_to_markdown(fragment: &str) -> Result<String> {
    if fragment.trim().is_empty() {
        return Ok(String::new());
    }
    let converted =
        htmd::convert(fragment).map_err(|e| Error::Parse(format!("Markdown conversion: {e}")))?;
    Ok(clean_markdown(&converted))
}

fn clean_markdown(markdown: &str) -> String {
    let without_images = IMAGE_RE.replace_all(markdown, "");
    let without_links = LINK_RE.replace_all(&without_images, "$1");
    EXCESS_NEWLINES_RE
        .replace_all(&without_links, "\n\n")
        .trim()
        .to_string()
}
