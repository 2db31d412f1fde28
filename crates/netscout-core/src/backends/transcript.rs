//! Video transcript retrieval.
//!
//! [`YouTubeTranscripts`] reads the caption track list embedded in a watch
//! page, picks the track for the requested language, and parses its
//! timed-text XML into [`TranscriptSegment`]s.

use crate::fetcher::{Fetcher, RequestProfile};
use crate::{Error, Result};
use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// Regex for video ids inside watch, short, legacy and embed URLs.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static VIDEO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:v=|/v/|youtu\.be/|/embed/)([a-zA-Z0-9_-]{11})").unwrap()
});

/// Regex for a bare 11-character video id.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static BARE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z0-9_-]{11})$").unwrap());

/// One timed caption line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptSegment {
    /// Offset from the start of the video, in seconds.
    pub start: f64,
    /// How long the line is shown, in seconds.
    pub duration: f64,
    /// Caption text.
    pub text: String,
}

/// Source of video transcripts.
#[async_trait]
pub trait TranscriptBackend: Send + Sync {
    /// Fetch the transcript of `video_id` in `language`.
    async fn fetch(&self, video_id: &str, language: &str) -> Result<Vec<TranscriptSegment>>;
}

/// Extract the 11-character video id from a YouTube URL or bare id.
///
/// ```rust
/// use netscout_core::backends::transcript::extract_video_id;
///
/// assert_eq!(extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
/// assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ?t=3").as_deref(), Some("dQw4w9WgXcQ"));
/// assert_eq!(extract_video_id("dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
/// assert!(extract_video_id("https://example.com/video").is_none());
/// ```
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    VIDEO_URL_RE
        .captures(input)
        .or_else(|| BARE_ID_RE.captures(input))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Transcripts scraped from public YouTube caption tracks.
#[derive(Debug, Clone)]
pub struct YouTubeTranscripts {
    fetcher: Fetcher,
    base_url: String,
}

impl YouTubeTranscripts {
    /// Create a backend reading watch pages under `base_url`.
    pub fn new(fetcher: Fetcher, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode", default)]
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
}

#[async_trait]
impl TranscriptBackend for YouTubeTranscripts {
    async fn fetch(&self, video_id: &str, language: &str) -> Result<Vec<TranscriptSegment>> {
        let watch_url = format!("{}/watch", self.base_url);
        let page = self
            .fetcher
            .get_text(&watch_url, &[("v", video_id)], RequestProfile::Page)
            .await?;

        let tracks = caption_tracks(&page)?;
        let track = select_track(&tracks, language).ok_or_else(|| {
            let available: Vec<&str> = tracks.iter().map(|t| t.language_code.as_str()).collect();
            Error::NotFound(format!(
                "no '{language}' transcript for video {video_id} (available: {})",
                available.join(", ")
            ))
        })?;
        debug!(video_id, language = %track.language_code, "selected caption track");

        let xml = self
            .fetcher
            .get_text(&track.base_url, &[], RequestProfile::Page)
            .await?;
        parse_timed_text(&xml)
    }
}

fn caption_tracks(page: &str) -> Result<Vec<CaptionTrack>> {
    let Some(array) = json_array_after(page, "\"captionTracks\":") else {
        return Err(Error::NotFound("transcripts are disabled or unavailable for this video".into()));
    };
    serde_json::from_str(array).map_err(|e| Error::Parse(format!("caption track list: {e}")))
}

/// Exact language match first, then a regional variant, preferring manual
/// captions over auto-generated ones.
fn select_track<'a>(tracks: &'a [CaptionTrack], language: &str) -> Option<&'a CaptionTrack> {
    let is_manual = |t: &&CaptionTrack| t.kind.as_deref() != Some("asr");
    let exact = |t: &&CaptionTrack| t.language_code.eq_ignore_ascii_case(language);
    let regional = |t: &&CaptionTrack| {
        t.language_code
            .split('-')
            .next()
            .is_some_and(|base| base.eq_ignore_ascii_case(language))
    };

    tracks
        .iter()
        .filter(exact)
        .find(is_manual)
        .or_else(|| tracks.iter().find(exact))
        .or_else(|| tracks.iter().filter(regional).find(is_manual))
        .or_else(|| tracks.iter().find(regional))
}

/// Slice of the JSON array that follows `marker`, found by bracket matching.
fn json_array_after<'a>(haystack: &'a str, marker: &str) -> Option<&'a str> {
    let after = haystack.find(marker)? + marker.len();
    let rest = &haystack[after..];
    let open = rest.find('[')?;
    if !rest[..open].trim().is_empty() {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in rest[open..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {},
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&rest[open..=open + idx]);
                }
            },
            _ => {},
        }
    }
    None
}

/// Parse `<transcript><text start=".." dur="..">..</text></transcript>`.
///
/// Caption text is entity-encoded twice (XML, then HTML), so it is
/// unescaped by the reader and then HTML-decoded.
fn parse_timed_text(xml: &str) -> Result<Vec<TranscriptSegment>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut segments = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<TranscriptSegment> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"text" => {
                let number = |key: &str| -> f64 {
                    e.try_get_attribute(key)
                        .ok()
                        .flatten()
                        .and_then(|a| a.unescape_value().ok().and_then(|v| v.trim().parse().ok()))
                        .unwrap_or(0.0)
                };
                current = Some(TranscriptSegment {
                    start: number("start"),
                    duration: number("dur"),
                    text: String::new(),
                });
            },
            Ok(Event::Text(e)) => {
                if let Some(segment) = current.as_mut() {
                    let text = e.unescape().map_err(|e| Error::Parse(e.to_string()))?;
                    segment.text.push_str(&html_escape::decode_html_entities(&text));
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"text" => {
                if let Some(mut segment) = current.take() {
                    segment.text = segment.text.replace('\n', " ").trim().to_string();
                    segments.push(segment);
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Parse(format!("XML parse error: {e}"))),
            _ => {},
        }
        buf.clear();
    }

    Ok(segments)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    const TIMED_TEXT: &str = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
<text start="0.32" dur="2.5">Hello &amp;#39;world&amp;#39;</text>
<text start="2.82" dur="1.04">rock &amp;amp; roll
again</text>
<text start="4" dur="1"></text>
</transcript>"#;

    fn track(code: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://example.test/{code}"),
            language_code: code.to_string(),
            kind: kind.map(str::to_string),
        }
    }

    #[test]
    fn test_video_id_patterns() {
        let id = "dQw4w9WgXcQ";
        for input in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            " dQw4w9WgXcQ ",
        ] {
            assert_eq!(extract_video_id(input).as_deref(), Some(id), "input: {input}");
        }
        assert!(extract_video_id("short").is_none());
        assert!(extract_video_id("https://vimeo.com/123456").is_none());
    }

    #[test]
    fn test_parse_timed_text_decodes_entities() {
        let segments = parse_timed_text(TIMED_TEXT).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].text, "Hello 'world'");
        assert!((segments[0].start - 0.32).abs() < f64::EPSILON);
        assert!((segments[0].duration - 2.5).abs() < f64::EPSILON);
        assert_eq!(segments[1].text, "rock & roll again");
        assert_eq!(segments[2].text, "");
    }

    #[test]
    fn test_json_array_after_handles_nesting_and_strings() {
        let page = r#"var x = {"captionTracks":[{"name":{"text":"En ]"}},{"a":"\"["}],"other":1};"#;
        let array = json_array_after(page, "\"captionTracks\":").unwrap();
        assert_eq!(array, r#"[{"name":{"text":"En ]"}},{"a":"\"["}]"#);
        assert!(json_array_after("nothing here", "\"captionTracks\":").is_none());
    }

    #[test]
    fn test_select_track_preferences() {
        let tracks = vec![
            track("fr", None),
            track("en", Some("asr")),
            track("en", None),
            track("de-DE", None),
        ];
        assert_eq!(select_track(&tracks, "en").unwrap().kind, None);
        assert_eq!(select_track(&tracks, "de").unwrap().language_code, "de-DE");
        assert!(select_track(&tracks, "ja").is_none());
    }

    #[tokio::test]
    async fn test_fetch_from_watch_page() {
        let server = MockServer::start().await;
        let track_url = format!("{}/api/timedtext?lang=en", server.uri());
        let watch_page = format!(
            r#"<script>var ytInitialPlayerResponse = {{"captions":{{"playerCaptionsTracklistRenderer":{{"captionTracks":[{{"baseUrl":"{track_url}","languageCode":"en"}}]}}}}}};</script>"#
        );

        Mock::given(method("GET"))
            .and(path("/watch"))
            .and(query_param("v", "dQw4w9WgXcQ"))
            .respond_with(ResponseTemplate::new(200).set_body_string(watch_page))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TIMED_TEXT))
            .mount(&server)
            .await;

        let backend = YouTubeTranscripts::new(Fetcher::new().unwrap(), &server.uri());
        let segments = backend.fetch("dQw4w9WgXcQ", "en").await.unwrap();
        assert_eq!(segments.len(), 3);

        let err = backend.fetch("dQw4w9WgXcQ", "ja").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_video_without_captions_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>no captions</html>"))
            .mount(&server)
            .await;

        let backend = YouTubeTranscripts::new(Fetcher::new().unwrap(), &server.uri());
        match backend.fetch("dQw4w9WgXcQ", "en").await {
            Err(Error::NotFound(msg)) => assert!(msg.contains("unavailable")),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
