use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// Result of analysing one image or frame. Replaced wholesale by each run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub common_name: String,
    pub localized_name: String,
    /// Percentage, 0..=100.
    pub confidence_score: f32,
    pub habitat_description: String,
    /// Free-form label such as "Vulnerable" or "Least Concern".
    pub conservation_status: String,
    pub thumbnail_reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_region: Option<BoundingRegion>,
}

/// Where the subject sits in the frame, as percentages of width/height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingRegion {
    pub fn is_within_frame(&self) -> bool {
        let in_range = |v: f32| (0.0..=100.0).contains(&v);
        in_range(self.x)
            && in_range(self.y)
            && in_range(self.width)
            && in_range(self.height)
            && self.x + self.width <= 100.0
            && self.y + self.height <= 100.0
    }
}

impl DetectionResult {
    /// Reject records a service should never produce.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.common_name.trim().is_empty() {
            return Err(AnalysisError::AnalysisServiceUnavailable(
                "detection result has no species name".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.confidence_score) {
            return Err(AnalysisError::AnalysisServiceUnavailable(format!(
                "confidence score {} outside 0..=100",
                self.confidence_score
            )));
        }
        if let Some(region) = &self.bounding_region {
            if !region.is_within_frame() {
                return Err(AnalysisError::AnalysisServiceUnavailable(format!(
                    "bounding region {:?} outside the frame",
                    region
                )));
            }
        }
        Ok(())
    }
}
