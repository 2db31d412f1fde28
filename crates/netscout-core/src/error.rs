//! Error types and handling for netscout-core operations.
//!
//! Every external call a tool makes (HTTP request, browser session, PDF parse,
//! search backend query) reports failures through the single [`Error`] type
//! defined here. Tools never let these escape: they are converted into an
//! error envelope by [`crate::envelope::Failure`].
//!
//! ## Error Categories
//!
//! - **Transport**: connection failures, timeouts, TLS problems
//! - **HTTP status**: the server answered with a non-2xx status
//! - **Not found**: missing article, missing document, 404
//! - **Invalid input**: arguments rejected before any external call
//! - **Parse**: HTML, JSON, XML or PDF content could not be understood
//! - **Backend**: a collaborator (search, translation, browser) reported failure
//!
//! ## Recovery Hints
//!
//! ```rust
//! use netscout_core::Error;
//!
//! let err = Error::HttpStatus { status: 503, reason: "Service Unavailable".into() };
//! assert!(err.is_recoverable());
//! assert_eq!(err.category(), "http_status");
//!
//! let err = Error::InvalidInput("max_pages must be at least 1".into());
//! assert!(!err.is_recoverable());
//! ```

use thiserror::Error;

/// The main error type for netscout-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure.
    ///
    /// Wraps the underlying `reqwest::Error` (DNS, connect, TLS, timeout,
    /// body decoding).
    ///
    /// ## Recoverability
    ///
    /// Connection and timeout errors are recoverable; builder and redirect
    /// errors are not.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status code.
    ///
    /// The display form is the one reported to callers:
    /// `HTTP error 404: Not Found`.
    #[error("HTTP error {status}: {reason}")]
    HttpStatus {
        /// Numeric status code.
        status: u16,
        /// Canonical reason phrase for the status.
        reason: String,
    },

    /// Requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Arguments failed validation before any external call was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Content could not be parsed (HTML, JSON, XML, PDF).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Headless browser launch, navigation or capture failed.
    #[error("Browser error: {0}")]
    Browser(String),

    /// An external backend reported a failure in its own response body.
    ///
    /// Used when the transport succeeded but the collaborator refused the
    /// request, e.g. a translation service answering `responseStatus: 403`.
    #[error("{0}")]
    Backend(String),

    /// Operation exceeded its deadline outside of the HTTP client.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Local I/O failed (writing screenshots, reading config).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidInput(format!("invalid URL: {err}"))
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Self::Parse(format!("PDF: {err}"))
    }
}

impl Error {
    /// Build an [`Error::HttpStatus`] from a `reqwest` status code.
    #[must_use]
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        Self::HttpStatus {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }

    /// Whether this error describes a missing resource.
    ///
    /// True for [`Error::NotFound`] and for HTTP 404/410 responses.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::HttpStatus { status: 404 | 410, .. }
        )
    }

    /// Check if the error might succeed if the same call is made again later.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use netscout_core::Error;
    /// use std::io;
    ///
    /// assert!(Error::Timeout("browser navigation".into()).is_recoverable());
    /// assert!(Error::HttpStatus { status: 429, reason: "Too Many Requests".into() }.is_recoverable());
    /// assert!(!Error::Parse("bad json".into()).is_recoverable());
    /// assert!(!Error::NotFound("article".into()).is_recoverable());
    /// assert!(Error::Io(io::Error::new(io::ErrorKind::TimedOut, "slow disk")).is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout(_) | Self::Browser(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
            ),
            _ => false,
        }
    }

    /// Get the error category as a string identifier.
    ///
    /// This is the `error_kind` field of an error envelope.
    ///
    /// - `"transport"` - network failures
    /// - `"http_status"` - non-2xx responses other than 404/410
    /// - `"not_found"` - missing resources
    /// - `"invalid_input"` - rejected arguments
    /// - `"parse"` - unreadable content
    /// - `"browser"` - headless browser failures
    /// - `"backend"` - collaborator-reported failures
    /// - `"timeout"`, `"io"`, `"serialization"`, `"config"`
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Network(_) => "transport",
            Self::HttpStatus { status: 404 | 410, .. } | Self::NotFound(_) => "not_found",
            Self::HttpStatus { .. } => "http_status",
            Self::InvalidInput(_) => "invalid_input",
            Self::Parse(_) => "parse",
            Self::Browser(_) => "browser",
            Self::Backend(_) => "backend",
            Self::Timeout(_) => "timeout",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "config",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_http_status_display_carries_code_and_reason() {
        let err = Error::from_status(reqwest::StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "HTTP error 404: Not Found");

        let err = Error::from_status(reqwest::StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "HTTP error 502: Bad Gateway");
    }

    #[test]
    fn test_not_found_detection() {
        assert!(Error::NotFound("missing".into()).is_not_found());
        assert!(Error::from_status(reqwest::StatusCode::NOT_FOUND).is_not_found());
        assert!(Error::from_status(reqwest::StatusCode::GONE).is_not_found());
        assert!(!Error::from_status(reqwest::StatusCode::FORBIDDEN).is_not_found());
        assert!(!Error::Parse("x".into()).is_not_found());
    }

    #[test]
    fn test_categories() {
        let cases = vec![
            (Error::NotFound("a".into()), "not_found"),
            (Error::from_status(reqwest::StatusCode::NOT_FOUND), "not_found"),
            (
                Error::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
                "http_status",
            ),
            (Error::InvalidInput("a".into()), "invalid_input"),
            (Error::Parse("a".into()), "parse"),
            (Error::Browser("a".into()), "browser"),
            (Error::Backend("a".into()), "backend"),
            (Error::Timeout("a".into()), "timeout"),
            (Error::Io(io::Error::other("a")), "io"),
            (Error::Serialization("a".into()), "serialization"),
            (Error::Config("a".into()), "config"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.category(), expected, "wrong category for {error:?}");
        }
    }

    #[test]
    fn test_recoverability() {
        assert!(Error::from_status(reqwest::StatusCode::SERVICE_UNAVAILABLE).is_recoverable());
        assert!(!Error::from_status(reqwest::StatusCode::UNAUTHORIZED).is_recoverable());
        assert!(
            Error::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")).is_recoverable()
        );
        assert!(!Error::Io(io::Error::new(io::ErrorKind::PermissionDenied, "no")).is_recoverable());
        assert!(!Error::InvalidInput("bad".into()).is_recoverable());
        assert!(!Error::Backend("quota".into()).is_recoverable());
    }

    #[test]
    fn test_conversions() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(Error::from(json_err), Error::Serialization(_)));

        let url_err = url::Url::parse("not a url").unwrap_err();
        match Error::from(url_err) {
            Error::InvalidInput(msg) => assert!(msg.contains("invalid URL")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }
}
