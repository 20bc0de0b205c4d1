//! Upload session state machine.
//!
//! Transitions:
//! - select (image/video): any state -> MediaSelected
//! - select (unknown type): any state -> Idle
//! - clear: any state -> Idle
//! - analyze: MediaSelected | ResultReady -> [Capturing, for video] -> Analyzing -> ResultReady
//! - failure while capturing or analyzing: -> MediaSelected
//!
//! A session holds at most one asset and one result. Selecting new media or
//! clearing revokes the previous preview handle and drops the previous result.

use crate::detect::{DetectionResult, DetectorBackend, Submission};
use crate::error::{AnalysisError, AnalysisResult};
use crate::frame::{capture_frame, HeapAllocator, SurfaceAllocator, VideoSource};
use crate::ingest::{open_video, VideoConfig};
use crate::media::{fingerprint, MediaAsset, MediaKind, PreviewRegistry};
use crate::prefs::DEFAULT_CONFIDENCE_THRESHOLD;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    MediaSelected,
    Capturing,
    Analyzing,
    ResultReady,
}

pub struct Session {
    state: SessionState,
    previews: PreviewRegistry,
    asset: Option<MediaAsset>,
    result: Option<DetectionResult>,
    allocator: Box<dyn SurfaceAllocator>,
    confidence_threshold: u8,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            previews: PreviewRegistry::new(),
            asset: None,
            result: None,
            allocator: Box::new(HeapAllocator::new()),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    pub fn with_allocator(mut self, allocator: impl SurfaceAllocator + 'static) -> Self {
        self.allocator = Box::new(allocator);
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: u8) -> Self {
        self.confidence_threshold = threshold.min(100);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn asset(&self) -> Option<&MediaAsset> {
        self.asset.as_ref()
    }

    pub fn result(&self) -> Option<&DetectionResult> {
        self.result.as_ref()
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn confidence_threshold(&self) -> u8 {
        self.confidence_threshold
    }

    pub fn set_confidence_threshold(&mut self, threshold: u8) {
        self.confidence_threshold = threshold.min(100);
    }

    /// Select a file by path. Returns the classified kind.
    pub fn select_media(&mut self, path: impl Into<std::path::PathBuf>) -> MediaKind {
        self.release_current();
        let asset = MediaAsset::select(path, &mut self.previews);
        self.install(asset)
    }

    /// Select a file with a caller-declared content type.
    pub fn select_media_as(
        &mut self,
        path: impl Into<std::path::PathBuf>,
        content_type: &str,
    ) -> MediaKind {
        self.release_current();
        let asset = MediaAsset::with_content_type(path, content_type, &mut self.previews);
        self.install(asset)
    }

    /// Drop the asset and result, back to Idle.
    pub fn clear(&mut self) {
        self.release_current();
        self.state = SessionState::Idle;
    }

    /// Analyse the selected media with `backend`, opening videos from disk
    /// (or `stub://`).
    pub fn analyze<B>(&mut self, backend: &mut B) -> AnalysisResult<&DetectionResult>
    where
        B: DetectorBackend + ?Sized,
    {
        self.analyze_with(backend, |asset| {
            open_video(VideoConfig::for_path(asset.path().to_string_lossy()))
        })
    }

    /// Analyse the selected media, using `open_source` to obtain a video source.
    ///
    /// On failure the session returns to MediaSelected with no result.
    pub fn analyze_with<B, F>(
        &mut self,
        backend: &mut B,
        open_source: F,
    ) -> AnalysisResult<&DetectionResult>
    where
        B: DetectorBackend + ?Sized,
        F: FnOnce(&MediaAsset) -> AnalysisResult<Box<dyn VideoSource>>,
    {
        let asset = match self.asset.as_ref() {
            Some(asset) if asset.kind().is_supported() => asset,
            Some(asset) => {
                return Err(AnalysisError::UnsupportedMediaType(
                    asset.content_type().to_string(),
                ))
            }
            None => {
                return Err(AnalysisError::UnsupportedMediaType(
                    "no media selected".to_string(),
                ))
            }
        };
        self.result = None;

        let prepared = match asset.kind() {
            MediaKind::Video => {
                self.state = SessionState::Capturing;
                open_source(asset)
                    .and_then(|mut video| capture_frame(&mut video, self.allocator.as_ref()))
                    .and_then(|frame| {
                        frame.ok_or_else(|| {
                            AnalysisError::FrameCaptureFailed(
                                "no raster surface available".to_string(),
                            )
                        })
                    })
                    .map(|frame| Submission::frame(frame, self.confidence_threshold))
            }
            _ => asset.read_bytes().map(|bytes| {
                Submission::image(bytes, asset.content_type(), self.confidence_threshold)
            }),
        };
        let submission = match prepared {
            Ok(submission) => submission,
            Err(e) => {
                log::warn!("analysis aborted before submission: {}", e);
                self.state = SessionState::MediaSelected;
                return Err(e);
            }
        };

        log::info!(
            "submitting {} ({} bytes, {}) to {}",
            fingerprint(&submission.bytes),
            submission.bytes.len(),
            submission.content_type,
            backend.name()
        );
        self.state = SessionState::Analyzing;
        match backend.detect(&submission) {
            Ok(result) => {
                log::info!(
                    "detected {} ({:.1}%)",
                    result.common_name,
                    result.confidence_score
                );
                self.state = SessionState::ResultReady;
                Ok(&*self.result.insert(result))
            }
            Err(e) => {
                log::warn!("analysis failed: {}", e);
                self.state = SessionState::MediaSelected;
                Err(e)
            }
        }
    }

    fn release_current(&mut self) {
        self.result = None;
        if let Some(asset) = self.asset.take() {
            asset.release(&mut self.previews);
        }
    }

    fn install(&mut self, asset: MediaAsset) -> MediaKind {
        let kind = asset.kind();
        self.state = if kind.is_supported() {
            SessionState::MediaSelected
        } else {
            log::info!("unsupported media type {}", asset.content_type());
            SessionState::Idle
        };
        self.asset = Some(asset);
        kind
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::MockBackend;
    use crate::ingest::SyntheticVideo;
    use std::time::Duration;

    fn quick_backend() -> MockBackend {
        MockBackend::new().with_latency(Duration::ZERO)
    }

    /// Backend that records its submission and always fails.
    struct Offline {
        seen: Vec<String>,
    }

    impl DetectorBackend for Offline {
        fn name(&self) -> &'static str {
            "offline"
        }

        fn detect(&mut self, submission: &Submission) -> AnalysisResult<DetectionResult> {
            self.seen.push(submission.content_type.clone());
            Err(AnalysisError::AnalysisServiceUnavailable("offline".into()))
        }
    }

    #[test]
    fn replacing_media_revokes_previous_preview() {
        let mut session = Session::new();
        assert_eq!(session.select_media("a.jpg"), MediaKind::Image);
        assert_eq!(session.select_media("b.mp4"), MediaKind::Video);
        assert_eq!(session.select_media("c.png"), MediaKind::Image);

        assert_eq!(session.previews().live_count(), 1);
        assert_eq!(session.previews().issued(), 3);
        assert_eq!(session.previews().revoked(), 2);

        session.clear();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.previews().live_count(), 0);
        assert!(session.asset().is_none());
    }

    #[test]
    fn unknown_media_stays_idle_and_cannot_be_analyzed() {
        let mut session = Session::new();
        assert_eq!(session.select_media("song.mp3"), MediaKind::Unknown);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.previews().live_count(), 0);

        let err = session.analyze(&mut quick_backend()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedMediaType(_)));
    }

    #[test]
    fn analyze_without_media_is_refused() {
        let mut session = Session::new();
        let err = session.analyze(&mut quick_backend()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedMediaType(_)));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn video_is_captured_then_submitted_as_jpeg() {
        let mut session = Session::new().with_confidence_threshold(60);
        session.select_media("stub://clip.mp4");
        let mut backend = Offline { seen: vec![] };

        let err = session.analyze(&mut backend).unwrap_err();
        assert!(matches!(err, AnalysisError::AnalysisServiceUnavailable(_)));
        assert_eq!(backend.seen, vec!["image/jpeg".to_string()]);
        assert_eq!(session.state(), SessionState::MediaSelected);
        assert!(session.result().is_none());
    }

    #[test]
    fn video_result_is_ready_after_analysis() {
        let mut session = Session::new();
        session.select_media_as("upload.bin", "video/webm");
        let result = session
            .analyze_with(&mut quick_backend(), |_| {
                let video: Box<dyn VideoSource> = Box::new(SyntheticVideo::new(VideoConfig {
                    path: "stub://upload".into(),
                    width: 32,
                    height: 32,
                    warmup_polls: 2,
                }));
                Ok(video)
            })
            .unwrap();
        assert_eq!(result.common_name, "Sri Lanka Blue Magpie");
        assert_eq!(session.state(), SessionState::ResultReady);
    }

    #[test]
    fn missing_surface_fails_capture() {
        let mut session = Session::new().with_allocator(HeapAllocator::with_max_pixels(1));
        session.select_media("stub://clip.mp4");
        let mut backend = quick_backend();

        let err = session.analyze(&mut backend).unwrap_err();
        assert!(matches!(err, AnalysisError::FrameCaptureFailed(_)));
        assert_eq!(session.state(), SessionState::MediaSelected);
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn new_selection_invalidates_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bird.png");
        image::RgbImage::new(4, 4).save(&path).unwrap();

        let mut session = Session::new();
        session.select_media(&path);
        session.analyze(&mut quick_backend()).unwrap();
        assert!(session.result().is_some());

        session.select_media(&path);
        assert!(session.result().is_none());
        assert_eq!(session.state(), SessionState::MediaSelected);
    }
}
