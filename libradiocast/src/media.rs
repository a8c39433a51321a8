//! Radio playback
//!
//! The adaptive streaming library is an external capability, modeled by
//! [`StreamEngine`] (support probe and session factory) and [`StreamSession`]
//! (load a source, attach to a media element, wait for the manifest).
//! [`RadioPlayer`] holds the play-click logic: prefer the adaptive engine,
//! fall back to native playback of the stream MIME type, otherwise do nothing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::document::{Document, ElementId};
use crate::error::{RadiocastError, Result};

/// MIME type of HLS playlists, for native playback probes
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

/// One adaptive playback session bound to a media element
#[async_trait]
pub trait StreamSession: Send {
    fn load_source(&mut self, url: &str);

    fn attach_media(&mut self, media: ElementId);

    /// Resolves once the stream manifest has been parsed
    async fn manifest_parsed(&mut self) -> Result<()>;
}

/// Adaptive streaming capability
pub trait StreamEngine: Send + Sync {
    fn is_supported(&self) -> bool;

    fn create_session(&self) -> Box<dyn StreamSession>;
}

/// Which playback path a play request took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPath {
    Adaptive,
    Native,
    /// Neither path is available; nothing happened
    Unsupported,
}

/// Starts radio streams on a media element
pub struct RadioPlayer {
    engine: Arc<dyn StreamEngine>,
    native_mime_type: String,
    active: Mutex<Option<Box<dyn StreamSession>>>,
}

impl RadioPlayer {
    pub fn new(engine: Arc<dyn StreamEngine>, native_mime_type: impl Into<String>) -> Self {
        Self {
            engine,
            native_mime_type: native_mime_type.into(),
            active: Mutex::new(None),
        }
    }

    /// Play `url` on `media`
    ///
    /// With adaptive support a fresh session loads the URL, attaches to the
    /// element and playback starts once the manifest is parsed; the new
    /// session replaces (and drops) the previous one. Otherwise, if the
    /// element plays the stream MIME type natively, its source is set and
    /// playback starts. Otherwise nothing happens.
    pub async fn play(
        &self,
        document: &dyn Document,
        media: ElementId,
        url: &str,
    ) -> Result<PlaybackPath> {
        if self.engine.is_supported() {
            let mut session = self.engine.create_session();
            session.load_source(url);
            session.attach_media(media);
            session
                .manifest_parsed()
                .await
                .map_err(|e| RadiocastError::Media(format!("manifest for {}: {}", url, e)))?;
            document.play(media)?;

            let previous = self
                .active
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .replace(session);
            drop(previous);

            tracing::info!(url, "Adaptive playback started");
            return Ok(PlaybackPath::Adaptive);
        }

        if document.can_play_type(media, &self.native_mime_type) {
            document.set_attribute(media, "src", url)?;
            document.play(media)?;
            tracing::info!(url, "Native playback started");
            return Ok(PlaybackPath::Native);
        }

        tracing::debug!(url, "No playback path available");
        Ok(PlaybackPath::Unsupported)
    }

    pub fn has_active_session(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_some()
    }
}

/// What a headless session was asked to do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRecord {
    pub source: Option<String>,
    pub media: Option<ElementId>,
    pub manifest_parsed: bool,
}

/// In-memory [`StreamEngine`] for headless hosts and tests
#[derive(Debug, Clone)]
pub struct HeadlessStreamEngine {
    supported: bool,
    manifest_error: Option<String>,
    sessions: Arc<Mutex<Vec<Arc<Mutex<SessionRecord>>>>>,
}

impl HeadlessStreamEngine {
    /// Engine that reports support and parses every manifest
    pub fn supported() -> Self {
        Self {
            supported: true,
            manifest_error: None,
            sessions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Engine that reports no support
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::supported()
        }
    }

    /// Engine whose manifests never parse
    pub fn failing_manifest(message: &str) -> Self {
        Self {
            manifest_error: Some(message.to_string()),
            ..Self::supported()
        }
    }

    /// Snapshot of every session created so far
    pub fn sessions(&self) -> Vec<SessionRecord> {
        self.sessions
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|s| s.lock().unwrap_or_else(|p| p.into_inner()).clone())
            .collect()
    }
}

impl StreamEngine for HeadlessStreamEngine {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create_session(&self) -> Box<dyn StreamSession> {
        let record = Arc::new(Mutex::new(SessionRecord::default()));
        self.sessions
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(Arc::clone(&record));
        Box::new(HeadlessSession {
            record,
            manifest_error: self.manifest_error.clone(),
        })
    }
}

struct HeadlessSession {
    record: Arc<Mutex<SessionRecord>>,
    manifest_error: Option<String>,
}

impl HeadlessSession {
    fn update(&self, f: impl FnOnce(&mut SessionRecord)) {
        f(&mut self.record.lock().unwrap_or_else(|p| p.into_inner()));
    }
}

#[async_trait]
impl StreamSession for HeadlessSession {
    fn load_source(&mut self, url: &str) {
        self.update(|r| r.source = Some(url.to_string()));
    }

    fn attach_media(&mut self, media: ElementId) {
        self.update(|r| r.media = Some(media));
    }

    async fn manifest_parsed(&mut self) -> Result<()> {
        if self.record.lock().unwrap_or_else(|p| p.into_inner()).source.is_none() {
            return Err(RadiocastError::Media("no source loaded".to_string()));
        }
        if let Some(message) = &self.manifest_error {
            return Err(RadiocastError::Media(message.clone()));
        }
        self.update(|r| r.manifest_parsed = true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ids, HeadlessDocument};

    const STREAM: &str = "https://streams.example.com/live/playlist.m3u8";

    fn radio_document(native: bool) -> (HeadlessDocument, ElementId) {
        let mut doc = HeadlessDocument::from_markup(r#"<audio id="radio-player"></audio>"#).unwrap();
        if native {
            doc = doc.with_native_mime_types([HLS_MIME_TYPE]);
        }
        let player = doc.get_element_by_id(ids::RADIO_PLAYER).unwrap();
        (doc, player)
    }

    #[tokio::test]
    async fn test_adaptive_path_preferred() {
        let (doc, player) = radio_document(true);
        let engine = HeadlessStreamEngine::supported();
        let radio = RadioPlayer::new(Arc::new(engine.clone()), HLS_MIME_TYPE);

        let path = radio.play(&doc, player, STREAM).await.unwrap();

        assert_eq!(path, PlaybackPath::Adaptive);
        assert!(doc.is_playing(player));
        assert!(radio.has_active_session());
        assert_eq!(
            engine.sessions(),
            vec![SessionRecord {
                source: Some(STREAM.to_string()),
                media: Some(player),
                manifest_parsed: true,
            }]
        );
        // Adaptive playback leaves the element source to the engine
        assert_eq!(doc.attribute(player, "src"), None);
    }

    #[tokio::test]
    async fn test_native_fallback_sets_source() {
        let (doc, player) = radio_document(true);
        let radio = RadioPlayer::new(Arc::new(HeadlessStreamEngine::unsupported()), HLS_MIME_TYPE);

        let path = radio.play(&doc, player, STREAM).await.unwrap();

        assert_eq!(path, PlaybackPath::Native);
        assert_eq!(doc.attribute(player, "src").as_deref(), Some(STREAM));
        assert!(doc.is_playing(player));
    }

    #[tokio::test]
    async fn test_unsupported_is_silent_noop() {
        let (doc, player) = radio_document(false);
        let radio = RadioPlayer::new(Arc::new(HeadlessStreamEngine::unsupported()), HLS_MIME_TYPE);

        let path = radio.play(&doc, player, STREAM).await.unwrap();

        assert_eq!(path, PlaybackPath::Unsupported);
        assert!(!doc.is_playing(player));
        assert_eq!(doc.attribute(player, "src"), None);
    }

    #[tokio::test]
    async fn test_manifest_failure_does_not_play() {
        let (doc, player) = radio_document(false);
        let radio = RadioPlayer::new(
            Arc::new(HeadlessStreamEngine::failing_manifest("404 playlist")),
            HLS_MIME_TYPE,
        );

        let result = radio.play(&doc, player, STREAM).await;

        assert!(matches!(result, Err(RadiocastError::Media(_))));
        assert!(!doc.is_playing(player));
        assert!(!radio.has_active_session());
    }

    #[tokio::test]
    async fn test_new_stream_replaces_session() {
        let (doc, player) = radio_document(false);
        let engine = HeadlessStreamEngine::supported();
        let radio = RadioPlayer::new(Arc::new(engine.clone()), HLS_MIME_TYPE);

        radio.play(&doc, player, STREAM).await.unwrap();
        radio
            .play(&doc, player, "https://streams.example.com/two.m3u8")
            .await
            .unwrap();

        assert_eq!(engine.sessions().len(), 2);
        assert!(radio.has_active_session());
    }
}
