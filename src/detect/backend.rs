use crate::detect::result::DetectionResult;
use crate::error::AnalysisResult;
use crate::frame::EncodedFrame;

/// What gets sent to a detection service: an image file's bytes, or a frame
/// captured from a video.
#[derive(Clone, Debug)]
pub struct Submission {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// User's display threshold, forwarded as-is. Backends decide what to do with it.
    pub confidence_threshold: u8,
}

impl Submission {
    pub fn image(bytes: Vec<u8>, content_type: impl Into<String>, confidence_threshold: u8) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            confidence_threshold,
        }
    }

    pub fn frame(frame: EncodedFrame, confidence_threshold: u8) -> Self {
        let content_type = frame.content_type().to_string();
        Self {
            bytes: frame.bytes,
            content_type,
            confidence_threshold,
        }
    }
}

/// Detection service boundary.
///
/// `detect` is `submit(bytes, threshold) -> DetectionResult | Error`. Calls
/// block the caller until the service answers.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Analyse one submission.
    fn detect(&mut self, submission: &Submission) -> AnalysisResult<DetectionResult>;
}

impl<B: DetectorBackend + ?Sized> DetectorBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, submission: &Submission) -> AnalysisResult<DetectionResult> {
        (**self).detect(submission)
    }
}
