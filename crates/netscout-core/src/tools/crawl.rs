use super::WebToolkit;
use crate::crawler::{CrawlOptions, PageSummary, crawl};
use crate::envelope::{Envelope, Failure};
use crate::text::with_scheme;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct CrawlOutput {
    start_url: String,
    pages_crawled: usize,
    pages: Vec<PageSummary>,
}

impl WebToolkit {
    /// Crawl breadth-first from `url`, visiting at most `max_pages` pages.
    ///
    /// Pages that fail after the first one are skipped; a failing start page
    /// fails the whole crawl.
    #[tracing::instrument(skip(self))]
    pub async fn crawl_website(&self, url: &str, max_pages: usize, same_domain: bool) -> String {
        let url = with_scheme(url);
        let options = CrawlOptions {
            max_pages,
            same_domain,
            preview_chars: self.config.limits.crawl_preview_chars,
        };

        match crawl(self.pages.as_ref(), &url, &options).await {
            Ok(report) => Envelope::success(CrawlOutput {
                start_url: report.start_url,
                pages_crawled: report.pages.len(),
                pages: report.pages,
            })
            .render(),
            Err(err) => Failure::new("Crawl failed", &err)
                .subject("url", &url)
                .render(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use crate::config::Config;
    use crate::tools::WebToolkit;
    use serde_json::Value;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn page(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    fn parse(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_crawl_website_envelope() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        page(
            &server,
            "/",
            r#"<html><head><title>Home</title></head><body>Welcome <a href="/about">About</a></body></html>"#.to_string(),
        )
        .await;
        page(
            &server,
            "/about",
            "<html><head><title>About</title></head><body>Team</body></html>".to_string(),
        )
        .await;
        let toolkit = WebToolkit::new(Config::default())?;

        let value = parse(&toolkit.crawl_website(&format!("{}/", server.uri()), 10, true).await);
        assert_eq!(value["status"], "success");
        assert_eq!(value["pages_crawled"], 2);
        assert_eq!(value["pages"][0]["title"], "Home");
        assert_eq!(value["pages"][1]["url"], format!("{}/about", server.uri()));
        assert_eq!(value["pages"][1]["content_preview"], "Team");
        Ok(())
    }

    #[tokio::test]
    async fn test_crawl_website_seed_failure() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        let toolkit = WebToolkit::new(Config::default())?;
        let url = format!("{}/missing", server.uri());

        let value = parse(&toolkit.crawl_website(&url, 10, true).await);
        assert_eq!(value["status"], "not_found");
        assert_eq!(value["url"], url);
        Ok(())
    }

    #[tokio::test]
    async fn test_crawl_website_rejects_zero_budget() -> anyhow::Result<()> {
        let toolkit = WebToolkit::new(Config::default())?;
        let value = parse(&toolkit.crawl_website("example.com", 0, true).await);

        assert_eq!(value["status"], "error");
        assert_eq!(value["url"], "https://example.com");
        assert_eq!(value["error_kind"], "invalid_input");
        Ok(())
    }
}
