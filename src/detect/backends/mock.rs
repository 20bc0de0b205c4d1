use std::time::Duration;

use crate::detect::backend::{DetectorBackend, Submission};
use crate::detect::result::{BoundingRegion, DetectionResult};
use crate::error::AnalysisResult;

/// Simulated service latency for uploads.
pub const MOCK_LATENCY: Duration = Duration::from_millis(1200);

const MAGPIE_THUMBNAIL: &str = "https://images.unsplash.com/photo-1713299713432-21f7241ddcc1?crop=entropy&cs=tinysrgb&fit=max&fm=jpg&q=80&w=1080";

/// The record every mock analysis returns.
pub fn blue_magpie() -> DetectionResult {
    DetectionResult {
        common_name: "Sri Lanka Blue Magpie".to_string(),
        localized_name: "කැහැටාලිහිණියා".to_string(),
        confidence_score: 92.5,
        habitat_description: "Rainforests and wet zones".to_string(),
        conservation_status: "Vulnerable".to_string(),
        thumbnail_reference: MAGPIE_THUMBNAIL.to_string(),
        bounding_region: None,
    }
}

/// Stand-in for the inference service. Sleeps, then returns a constant
/// record regardless of what was submitted.
pub struct MockBackend {
    name: &'static str,
    latency: Duration,
    record: DetectionResult,
    calls: u64,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            name: "mock",
            latency: MOCK_LATENCY,
            record: blue_magpie(),
            calls: 0,
        }
    }

    /// Camera variant: same species, with a bounding region for the overlay.
    pub fn live() -> Self {
        let mut record = blue_magpie();
        record.bounding_region = Some(BoundingRegion {
            x: 25.0,
            y: 20.0,
            width: 50.0,
            height: 60.0,
        });
        Self {
            name: "mock-live",
            latency: Duration::ZERO,
            record,
            calls: 0,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for MockBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn detect(&mut self, submission: &Submission) -> AnalysisResult<DetectionResult> {
        log::debug!(
            "{}: {} bytes of {} (threshold {}%), answering in {:?}",
            self.name,
            submission.bytes.len(),
            submission.content_type,
            submission.confidence_threshold,
            self.latency
        );
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        self.calls += 1;
        Ok(self.record.clone())
    }
}
