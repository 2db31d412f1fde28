use crate::config::HttpConfig;
use crate::{Error, Result};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// Kind of request being made, selecting timeout and client identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestProfile {
    /// HTML page fetched on behalf of the user, with a browser user agent.
    Page,
    /// JSON API call, identified with the library's own user agent.
    Api,
    /// Large document download (PDF), with a browser user agent.
    Document,
}

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects.
    pub url: String,
    /// Response body.
    pub html: String,
}

/// A fetched binary document.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// URL after redirects.
    pub url: String,
    /// `Content-Type` header, empty when absent.
    pub content_type: String,
    /// Raw body.
    pub bytes: Vec<u8>,
}

/// HTTP client shared by every tool.
///
/// Follows redirects, decompresses gzip/brotli, and maps non-2xx responses
/// to [`Error::HttpStatus`]. Each request carries the timeout of its
/// [`RequestProfile`]; there are no retries.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    http: HttpConfig,
}

impl Fetcher {
    /// Creates a fetcher with default settings
    pub fn new() -> Result<Self> {
        Self::from_config(&HttpConfig::default())
    }

    /// Creates a fetcher from HTTP configuration
    pub fn from_config(http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self {
            client,
            http: http.clone(),
        })
    }

    /// Creates a fetcher using one timeout for every profile (primarily for tests)
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let secs = timeout.as_secs().max(1);
        let http = HttpConfig {
            page_timeout_secs: secs,
            api_timeout_secs: secs,
            document_timeout_secs: secs,
            ..HttpConfig::default()
        };
        Self::from_config(&http)
    }

    fn timeout_for(&self, profile: RequestProfile) -> Duration {
        let secs = match profile {
            RequestProfile::Page => self.http.page_timeout_secs,
            RequestProfile::Api => self.http.api_timeout_secs,
            RequestProfile::Document => self.http.document_timeout_secs,
        };
        Duration::from_secs(secs)
    }

    fn user_agent_for(&self, profile: RequestProfile) -> &str {
        match profile {
            RequestProfile::Page | RequestProfile::Document => &self.http.user_agent,
            RequestProfile::Api => &self.http.api_user_agent,
        }
    }

    fn prepare(&self, builder: RequestBuilder, profile: RequestProfile) -> RequestBuilder {
        let builder = builder
            .timeout(self.timeout_for(profile))
            .header(reqwest::header::USER_AGENT, self.user_agent_for(profile));
        match profile {
            RequestProfile::Page => builder
                .header(
                    ACCEPT,
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
                .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5"),
            RequestProfile::Api | RequestProfile::Document => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!("{} answered {}", response.url(), status);
            return Err(Error::from_status(status));
        }
        Ok(response)
    }

    /// Fetches an HTML page with the page profile
    pub async fn get_page(&self, url: &str) -> Result<FetchedPage> {
        let request = self.prepare(self.client.get(url), RequestProfile::Page);
        let response = Self::send(request).await?;
        let final_url = response.url().to_string();
        let html = response.text().await?;

        info!("Fetched {} bytes from {}", html.len(), final_url);

        Ok(FetchedPage {
            url: final_url,
            html,
        })
    }

    /// Fetches a response body as text
    pub async fn get_text(
        &self,
        url: &str,
        query: &[(&str, &str)],
        profile: RequestProfile,
    ) -> Result<String> {
        let request = self.prepare(self.client.get(url).query(query), profile);
        let response = Self::send(request).await?;
        Ok(response.text().await?)
    }

    /// Fetches and deserializes a JSON response
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        profile: RequestProfile,
    ) -> Result<T> {
        let request = self.prepare(self.client.get(url).query(query), profile);
        Self::decode_json(Self::send(request).await?).await
    }

    /// Fetches JSON with a `Referer` header, as some search endpoints require
    pub async fn get_json_with_referer<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        referer: &str,
    ) -> Result<T> {
        let request = self
            .prepare(self.client.get(url).query(query), RequestProfile::Page)
            .header(REFERER, referer);
        Self::decode_json(Self::send(request).await?).await
    }

    /// Submits a form and returns the response body
    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<String> {
        let request = self.prepare(self.client.post(url).form(form), RequestProfile::Page);
        let response = Self::send(request).await?;
        Ok(response.text().await?)
    }

    /// Downloads a binary document with the document profile
    pub async fn get_document(&self, url: &str) -> Result<FetchedDocument> {
        let request = self.prepare(self.client.get(url), RequestProfile::Document);
        let response = Self::send(request).await?;
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(std::string::ToString::to_string)
            .unwrap_or_default();
        let bytes = response.bytes().await?.to_vec();

        info!("Downloaded {} bytes from {}", bytes.len(), final_url);

        Ok(FetchedDocument {
            url: final_url,
            content_type,
            bytes,
        })
    }

    async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| Error::Parse(format!("invalid JSON response: {e}")))
    }
}

// Note: Default is not implemented as Fetcher::new() can fail.
// Use Fetcher::new() directly and handle the Result.

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, header_exists, method, path, query_param},
    };

    #[tokio::test]
    async fn test_fetcher_creation() {
        let result = Fetcher::new();
        assert!(result.is_ok(), "Fetcher creation should succeed");
    }

    #[tokio::test]
    async fn test_get_page_sends_browser_headers() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header_exists("accept-language"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new()?;
        let page = fetcher
            .get_page(&format!("{}/page", mock_server.uri()))
            .await?;

        assert_eq!(page.html, "<html>ok</html>");
        assert!(page.url.ends_with("/page"));
        Ok(())
    }

    #[tokio::test]
    async fn test_redirect_reports_final_url() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("location", format!("{}/new", mock_server.uri()).as_str()),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new()?;
        let page = fetcher.get_page(&format!("{}/old", mock_server.uri())).await?;

        assert_eq!(page.html, "moved");
        assert!(page.url.ends_with("/new"));
        Ok(())
    }

    #[tokio::test]
    async fn test_404_maps_to_http_status() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new()?;
        let result = fetcher
            .get_page(&format!("{}/missing", mock_server.uri()))
            .await;

        match result {
            Err(err @ Error::HttpStatus { status: 404, .. }) => {
                assert!(err.is_not_found());
                assert_eq!(err.to_string(), "HTTP error 404: Not Found");
            },
            Err(e) => panic!("Expected HttpStatus 404, got: {e}"),
            Ok(_) => panic!("Expected error for 404 response"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_500_is_recoverable() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new()?;
        let err = fetcher
            .get_text(&mock_server.uri(), &[], RequestProfile::Api)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
        assert!(err.is_recoverable());
        Ok(())
    }

    #[tokio::test]
    async fn test_get_json_with_query() -> anyhow::Result<()> {
        #[derive(Deserialize)]
        struct Reply {
            answer: u32,
        }

        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("q", "life"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"answer": 42})))
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new()?;
        let reply: Reply = fetcher
            .get_json(
                &format!("{}/api", mock_server.uri()),
                &[("q", "life")],
                RequestProfile::Api,
            )
            .await?;

        assert_eq!(reply.answer, 42);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new()?;
        let result: Result<serde_json::Value> = fetcher
            .get_json(&mock_server.uri(), &[], RequestProfile::Api)
            .await;

        assert!(matches!(result, Err(Error::Parse(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_post_form_encodes_fields() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/html/"))
            .and(body_string_contains("q=rust+lang"))
            .respond_with(ResponseTemplate::new(200).set_body_string("results"))
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new()?;
        let body = fetcher
            .post_form(
                &format!("{}/html/", mock_server.uri()),
                &[("q", "rust lang")],
            )
            .await?;

        assert_eq!(body, "results");
        Ok(())
    }

    #[tokio::test]
    async fn test_get_document_captures_content_type() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/doc.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"%PDF-1.4".to_vec()),
            )
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new()?;
        let doc = fetcher
            .get_document(&format!("{}/doc.pdf", mock_server.uri()))
            .await?;

        assert_eq!(doc.content_type, "application/pdf");
        assert_eq!(doc.bytes, b"%PDF-1.4");
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_is_enforced() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::with_timeout(Duration::from_secs(1))?;
        let err = fetcher.get_page(&mock_server.uri()).await.unwrap_err();

        match err {
            Error::Network(ref inner) => assert!(inner.is_timeout()),
            other => panic!("Expected timeout, got: {other}"),
        }
        assert!(err.is_recoverable());
        Ok(())
    }
}
