//! Live camera feed.
//!
//! Starting the camera begins a scan. Once the scan delay has passed, the
//! next `tick` captures a frame and runs it through the backend; the result
//! is held until the camera is stopped. Timers are deadlines checked by
//! `tick`, so a caller-owned loop drives everything.

use std::time::{Duration, Instant};

use crate::detect::{DetectionResult, DetectorBackend, Submission};
use crate::error::{AnalysisError, AnalysisResult};
use crate::frame::{capture_frame, EncodedFrame, HeapAllocator, VideoSource};
use crate::prefs::DEFAULT_CONFIDENCE_THRESHOLD;

/// Time between starting the camera and the first detection.
pub const SCAN_DELAY: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiveState {
    Off,
    Scanning { since: Instant },
    Detected,
}

pub struct LiveFeed<V: VideoSource> {
    camera: V,
    allocator: HeapAllocator,
    state: LiveState,
    detection: Option<DetectionResult>,
    scan_delay: Duration,
    confidence_threshold: u8,
}

impl<V: VideoSource> LiveFeed<V> {
    pub fn new(camera: V) -> Self {
        Self {
            camera,
            allocator: HeapAllocator::new(),
            state: LiveState::Off,
            detection: None,
            scan_delay: SCAN_DELAY,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    pub fn with_scan_delay(mut self, delay: Duration) -> Self {
        self.scan_delay = delay;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: u8) -> Self {
        self.confidence_threshold = threshold.min(100);
        self
    }

    pub fn state(&self) -> LiveState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, LiveState::Off)
    }

    pub fn detection(&self) -> Option<&DetectionResult> {
        self.detection.as_ref()
    }

    pub fn set_confidence_threshold(&mut self, threshold: u8) {
        self.confidence_threshold = threshold.min(100);
    }

    /// Turn the camera on. No-op while already active.
    pub fn start(&mut self, now: Instant) {
        if self.is_active() {
            return;
        }
        log::info!("camera on; scanning for {:?}", self.scan_delay);
        self.state = LiveState::Scanning { since: now };
    }

    /// Turn the camera off and forget any detection.
    pub fn stop(&mut self) {
        if self.is_active() {
            log::info!("camera off");
        }
        self.state = LiveState::Off;
        self.detection = None;
    }

    /// Advance the feed. Runs detection once the scan delay has passed.
    ///
    /// Returns the detection made by this tick, if any.
    pub fn tick<B>(
        &mut self,
        now: Instant,
        backend: &mut B,
    ) -> AnalysisResult<Option<&DetectionResult>>
    where
        B: DetectorBackend + ?Sized,
    {
        let LiveState::Scanning { since } = self.state else {
            return Ok(None);
        };
        if now.saturating_duration_since(since) < self.scan_delay {
            return Ok(None);
        }

        let frame = self.grab()?.ok_or_else(|| {
            AnalysisError::FrameCaptureFailed("no raster surface available".to_string())
        })?;
        let result = backend.detect(&Submission::frame(frame, self.confidence_threshold))?;
        log::info!(
            "live detection: {} ({:.1}%)",
            result.common_name,
            result.confidence_score
        );
        self.state = LiveState::Detected;
        Ok(Some(&*self.detection.insert(result)))
    }

    /// Current camera frame as JPEG. `None` while the camera is off.
    pub fn snapshot(&mut self) -> AnalysisResult<Option<EncodedFrame>> {
        if !self.is_active() {
            return Ok(None);
        }
        self.grab()
    }

    fn grab(&mut self) -> AnalysisResult<Option<EncodedFrame>> {
        capture_frame(&mut self.camera, &self.allocator)
    }
}
