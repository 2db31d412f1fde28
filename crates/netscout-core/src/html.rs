//! HTML document queries and cleanup.
//!
//! [`PageDocument`] wraps a parsed `scraper::Html` tree. The tree is not
//! `Send`, so documents are parsed, queried and dropped inside synchronous
//! code; async callers only ever hold the owned strings extracted from them.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Elements stripped before extracting page text.
pub const NON_TEXT_ELEMENTS: &str = "script, style, noscript";

/// Elements stripped before converting a page to Markdown.
pub const BOILERPLATE_ELEMENTS: &str =
    "script, style, noscript, nav, footer, header, aside, iframe, form";

macro_rules! selector {
    ($name:ident, $css:expr) => {
        /// SAFETY: Selector is a compile-time constant that is known to be valid.
        #[allow(clippy::unwrap_used)]
        static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

selector!(TITLE, "title");
selector!(BODY, "body");
selector!(ANCHOR, "a[href]");
selector!(META, "meta");
selector!(CANONICAL, r#"link[rel="canonical"]"#);
selector!(FAVICON, r#"link[rel="icon"], link[rel="shortcut icon"]"#);
selector!(MAIN_CONTENT, r#"main, article, div[role="main"]"#);

/// A hyperlink found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Raw `href` attribute, unresolved.
    pub href: String,
    /// Trimmed anchor text.
    pub text: String,
}

/// Parsed HTML document.
pub struct PageDocument {
    html: Html,
}

impl PageDocument {
    /// Parse a full HTML document.
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    /// Text of the first `<title>`, trimmed; `None` when absent or blank.
    pub fn title(&self) -> Option<String> {
        self.html
            .select(&TITLE)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// `content` of the first `<meta name="...">` with the given name.
    pub fn meta_named(&self, name: &str) -> Option<String> {
        self.metas()
            .find(|el| el.value().attr("name") == Some(name))
            .and_then(|el| el.value().attr("content"))
            .map(str::to_string)
    }

    /// `(suffix, content)` pairs of `<meta>` tags whose `attribute` starts with
    /// `prefix`, in document order. Pairs with an empty suffix or empty
    /// content are skipped.
    ///
    /// `meta_with_prefix("property", "og:")` yields OpenGraph data.
    pub fn meta_with_prefix(&self, attribute: &str, prefix: &str) -> Vec<(String, String)> {
        self.metas()
            .filter_map(|el| {
                let key = el.value().attr(attribute)?.strip_prefix(prefix)?;
                let content = el.value().attr("content")?;
                (!key.is_empty() && !content.is_empty())
                    .then(|| (key.to_string(), content.to_string()))
            })
            .collect()
    }

    /// `href` of `<link rel="canonical">`.
    pub fn canonical(&self) -> Option<String> {
        first_attr(&self.html, &CANONICAL, "href")
    }

    /// `href` of the first `<link rel="icon">` or `<link rel="shortcut icon">`.
    pub fn favicon(&self) -> Option<String> {
        first_attr(&self.html, &FAVICON, "href")
    }

    /// Every `<a href>` in document order.
    pub fn anchors(&self) -> Vec<Anchor> {
        self.html
            .select(&ANCHOR)
            .filter_map(|el| {
                let href = el.value().attr("href")?;
                Some(Anchor {
                    href: href.to_string(),
                    text: el.text().collect::<String>().trim().to_string(),
                })
            })
            .collect()
    }

    /// Detach every element matching the CSS selector list `css`.
    ///
    /// Returns how many elements were removed. An unparsable selector removes
    /// nothing.
    pub fn remove(&mut self, css: &str) -> usize {
        let Ok(selector) = Selector::parse(css) else {
            return 0;
        };
        let ids: Vec<_> = self.html.select(&selector).map(|el| el.id()).collect();
        let mut removed = 0;
        for id in ids {
            if let Some(mut node) = self.html.tree.get_mut(id) {
                node.detach();
                removed += 1;
            }
        }
        removed
    }

    /// Text nodes under `<body>`, each trimmed, blanks skipped, joined by a
    /// single space.
    pub fn body_text(&self) -> String {
        let fragments: Vec<&str> = match self.html.select(&BODY).next() {
            Some(body) => body.text().collect(),
            None => self.html.root_element().text().collect(),
        };
        crate::text::join_fragments(fragments)
    }

    /// Outer HTML of the first `main`, `article` or `div[role=main]`,
    /// falling back to `<body>`, or empty when neither exists.
    pub fn main_content_html(&self) -> String {
        self.html
            .select(&MAIN_CONTENT)
            .next()
            .or_else(|| self.html.select(&BODY).next())
            .map(|el| el.html())
            .unwrap_or_default()
    }

    fn metas(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.html.select(&META)
    }
}

fn first_attr(html: &Html, selector: &Selector, attr: &str) -> Option<String> {
    html.select(selector)
        .find_map(|el| el.value().attr(attr))
        .map(str::to_string)
}
