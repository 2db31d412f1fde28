#![allow(missing_docs, clippy::unwrap_used, clippy::panic)]

use async_trait::async_trait;
use netscout_core::{Config, Error, Result, WebToolkit};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page_urls(value: &Value) -> Vec<String> {
    value["pages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["url"].as_str().unwrap().to_string())
        .collect()
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn crawl_stays_on_seed_domain() -> anyhow::Result<()> {
    let site = MockServer::start().await;
    let elsewhere = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>D</body></html>"))
        .expect(0)
        .mount(&elsewhere)
        .await;

    let seed = format!(
        r#"<html><head><title>A</title></head><body>
        <a href="/b">B</a>
        <a href="/c">C</a>
        <a href="{}/d">D</a>
        </body></html>"#,
        elsewhere.uri()
    );
    mount_html(&site, "/a", seed).await;
    mount_html(&site, "/b", "<html><head><title>B</title></head><body>b</body></html>".into()).await;
    mount_html(&site, "/c", "<html><head><title>C</title></head><body>c</body></html>".into()).await;

    let toolkit = WebToolkit::new(Config::default())?;
    let json = toolkit.crawl_website(&format!("{}/a", site.uri()), 10, true).await;
    let value: Value = serde_json::from_str(&json)?;

    assert_eq!(value["status"], "success");
    assert_eq!(value["pages_crawled"], 3);
    assert_eq!(
        page_urls(&value),
        [
            format!("{}/a", site.uri()),
            format!("{}/b", site.uri()),
            format!("{}/c", site.uri()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn crawl_skips_unreachable_page() -> anyhow::Result<()> {
    let site = MockServer::start().await;

    // A port with no listener.
    let closed = std::net::TcpListener::bind("127.0.0.1:0")?;
    let dead = format!("http://{}/b", closed.local_addr()?);
    drop(closed);

    let seed = format!(
        r#"<html><body><a href="{dead}">B</a><a href="/c">C</a></body></html>"#
    );
    mount_html(&site, "/a", seed).await;
    mount_html(&site, "/c", "<html><body>c</body></html>".into()).await;

    let toolkit = WebToolkit::new(Config::default())?;
    let json = toolkit.crawl_website(&format!("{}/a", site.uri()), 10, false).await;
    let value: Value = serde_json::from_str(&json)?;

    assert_eq!(value["status"], "success");
    assert_eq!(
        page_urls(&value),
        [format!("{}/a", site.uri()), format!("{}/c", site.uri())]
    );
    Ok(())
}

/// In-memory site whose `/b` page fails at the transport layer.
struct FlakySite {
    pages: HashMap<&'static str, &'static str>,
    fetched: Mutex<Vec<String>>,
}

impl FlakySite {
    fn new() -> Self {
        let pages = HashMap::from([
            (
                "https://site.test/a",
                r#"<a href="/b">B</a><a href="/c">C</a>"#,
            ),
            ("https://site.test/b", r#"<a href="/e">E</a>"#),
            ("https://site.test/c", r#"<a href="/d">D</a>"#),
            ("https://site.test/d", "leaf"),
            ("https://site.test/e", "only reachable from b"),
        ]);
        Self {
            pages,
            fetched: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl netscout_core::crawler::PageSource for FlakySite {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        self.fetched.lock().unwrap().push(url.to_string());
        if url.ends_with("/b") {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }
        self.pages
            .get(url)
            .map(|html| (*html).to_string())
            .ok_or_else(|| Error::NotFound(url.to_string()))
    }
}

#[tokio::test]
async fn crawl_continues_after_transport_error() -> anyhow::Result<()> {
    let site = Arc::new(FlakySite::new());
    let toolkit = WebToolkit::builder(Config::default())
        .page_source(site.clone())
        .build()?;

    let json = toolkit.crawl_website("https://site.test/a", 10, true).await;
    let value: Value = serde_json::from_str(&json)?;

    assert_eq!(value["status"], "success");
    assert_eq!(
        page_urls(&value),
        ["https://site.test/a", "https://site.test/c", "https://site.test/d"]
    );
    let fetched = site.fetched.lock().unwrap().clone();
    assert_eq!(
        fetched,
        [
            "https://site.test/a",
            "https://site.test/b",
            "https://site.test/c",
            "https://site.test/d",
        ]
    );
    Ok(())
}
