//! Third-party collaborators behind swappable traits.
//!
//! | Trait | Default |
//! |---|---|
//! | [`SearchBackend`] | [`DuckDuckGo`] |
//! | [`BrowserBackend`] | `ChromiumBrowser` with the `browser` feature, else [`UnavailableBrowser`] |
//! | [`PdfReader`] | [`LopdfReader`] |
//! | [`TranscriptBackend`] | [`YouTubeTranscripts`] |

pub mod browser;
pub mod pdf;
pub mod search;
pub mod transcript;

#[cfg(feature = "browser")]
pub use browser::ChromiumBrowser;
pub use browser::{BrowserBackend, RenderedPage, UnavailableBrowser};
pub use pdf::{LopdfReader, PdfContent, PdfMetadata, PdfReader};
pub use search::{DuckDuckGo, ImageHit, NewsHit, PlaceHit, SearchBackend, TextHit, VideoHit};
pub use transcript::{TranscriptBackend, TranscriptSegment, YouTubeTranscripts, extract_video_id};
