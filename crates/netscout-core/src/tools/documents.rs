use super::WebToolkit;
use crate::backends::{PdfMetadata, TranscriptSegment, extract_video_id};
use crate::cache::CacheKey;
use crate::envelope::{Envelope, Failure};
use crate::text::{TRUNCATED_BLOCK, round2, take_chars, truncate_with_suffix, with_scheme};
use crate::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Serialize)]
struct PdfOutput<'a> {
    url: &'a str,
    metadata: PdfMetadata,
    full_text: String,
    pages: Vec<PdfPage>,
}

#[derive(Debug, Serialize)]
struct PdfPage {
    page: usize,
    text: String,
}

#[derive(Debug, Serialize)]
struct TranscriptOutput<'a> {
    video_id: &'a str,
    language: &'a str,
    full_text: String,
    segments: Vec<TranscriptSegment>,
}

fn looks_like_pdf(url: &str, content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("pdf")
        || url.to_ascii_lowercase().ends_with(".pdf")
}

impl WebToolkit {
    /// Download a PDF and extract metadata plus the text of its first
    /// `max_pages` pages.
    ///
    /// Per-page text and the concatenated `full_text` are both capped (see
    /// `limits.pdf_page_chars` and `limits.pdf_full_text_chars`). Successful
    /// responses are cached per `(url, max_pages)`.
    #[tracing::instrument(skip(self))]
    pub async fn read_pdf_url(&self, url: &str, max_pages: usize) -> String {
        let url = with_scheme(url);
        let key = CacheKey::new("pdf").arg(&url).arg(max_pages).finish();
        self.cached(key, async {
            self.pdf_document(&url, max_pages).await.map_err(|err| {
                Failure::new("Failed to read PDF", &err)
                    .subject("url", &url)
                    .render()
            })
        })
        .await
    }

    async fn pdf_document(&self, url: &str, max_pages: usize) -> Result<String> {
        let document = self.fetcher.get_document(url).await?;
        if !looks_like_pdf(url, &document.content_type) {
            return Err(Error::InvalidInput("URL does not appear to be a PDF file".into()));
        }

        let reader = Arc::clone(&self.pdf);
        let bytes = document.bytes;
        let content = tokio::task::spawn_blocking(move || reader.read(&bytes, max_pages))
            .await
            .map_err(|e| Error::Backend(format!("PDF worker failed: {e}")))??;

        let limits = &self.config.limits;
        let mut full_text = String::new();
        for page in &content.pages {
            full_text.push_str(page);
            full_text.push_str("\n\n");
        }
        let full_text = truncate_with_suffix(&full_text, limits.pdf_full_text_chars, TRUNCATED_BLOCK)
            .trim()
            .to_string();

        let pages = content
            .pages
            .iter()
            .enumerate()
            .map(|(i, text)| PdfPage {
                page: i + 1,
                text: take_chars(text, limits.pdf_page_chars).to_string(),
            })
            .collect();

        Ok(Envelope::success(PdfOutput {
            url,
            metadata: content.metadata,
            full_text,
            pages,
        })
        .render())
    }

    /// Fetch the transcript of a YouTube video in `language`.
    ///
    /// `video_url` may be any common YouTube URL form or a bare video id.
    /// Successful responses are cached per `(video_id, language)`.
    #[tracing::instrument(skip(self))]
    pub async fn get_youtube_transcript(&self, video_url: &str, language: &str) -> String {
        let Some(video_id) = extract_video_id(video_url) else {
            let err = Error::InvalidInput("Could not extract video ID from URL".into());
            return Failure::new("Failed to get transcript", &err)
                .subject("url", video_url)
                .render();
        };

        let key = CacheKey::new("youtube").arg(&video_id).arg(language).finish();
        self.cached(key, async {
            self.transcript(&video_id, language).await.map_err(|err| {
                Failure::new("Transcript error", &err)
                    .subject("video_id", &video_id)
                    .render()
            })
        })
        .await
    }

    async fn transcript(&self, video_id: &str, language: &str) -> Result<String> {
        let segments = self.transcripts.fetch(video_id, language).await?;
        debug!(video_id, segments = segments.len(), "transcript fetched");

        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();
        let segments = segments
            .into_iter()
            .take(self.config.limits.transcript_max_segments)
            .map(|s| TranscriptSegment {
                start: round2(s.start),
                duration: round2(s.duration),
                text: s.text,
            })
            .collect();

        Ok(Envelope::success(TranscriptOutput {
            video_id,
            language,
            full_text,
            segments,
        })
        .render())
    }
}
