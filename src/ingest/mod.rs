//! Video sources.
//!
//! - `stub://` paths open a synthetic video (tests, demo, the default camera)
//! - Local video files are decoded with FFmpeg (feature: video-ffmpeg)
//!
//! Every source implements `frame::VideoSource`. Sources decode in memory
//! only; nothing is written to disk and frame content is never logged.

#[cfg(feature = "video-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod synthetic;

use crate::error::{AnalysisError, AnalysisResult};
use crate::frame::VideoSource;

pub use synthetic::SyntheticVideo;

pub const STUB_SCHEME: &str = "stub://";

/// Configuration for opening a video source.
#[derive(Clone, Debug)]
pub struct VideoConfig {
    /// Local path, or `stub://<name>` for a synthetic source.
    pub path: String,
    /// Frame size of synthetic sources. Real files report their own.
    pub width: u32,
    pub height: u32,
    /// Waits a synthetic source needs before it has current data.
    pub warmup_polls: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            width: 640,
            height: 480,
            warmup_polls: 2,
        }
    }
}

impl VideoConfig {
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Open a video source for `config.path`.
pub fn open_video(config: VideoConfig) -> AnalysisResult<Box<dyn VideoSource>> {
    if config.path.trim().is_empty() {
        return Err(AnalysisError::FrameCaptureFailed("empty video path".into()));
    }
    if config.path.starts_with(STUB_SCHEME) {
        return Ok(Box::new(SyntheticVideo::new(config)));
    }
    if config.path.contains("://") {
        return Err(AnalysisError::UnsupportedMediaType(format!(
            "video sources must be local paths: {}",
            config.path
        )));
    }

    #[cfg(feature = "video-ffmpeg")]
    {
        Ok(Box::new(file_ffmpeg::FfmpegVideo::open(config)?))
    }
    #[cfg(not(feature = "video-ffmpeg"))]
    {
        Err(AnalysisError::FrameCaptureFailed(
            "video decoding requires the video-ffmpeg feature".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{capture_frame, HeapAllocator};

    #[test]
    fn stub_paths_open_synthetic_video() {
        let mut video = open_video(VideoConfig {
            path: "stub://clip.mp4".into(),
            width: 32,
            height: 24,
            warmup_polls: 3,
        })
        .unwrap();
        let frame = capture_frame(&mut video, &HeapAllocator::new())
            .unwrap()
            .expect("frame");
        assert_eq!((frame.width, frame.height), (32, 24));
    }

    #[test]
    fn remote_urls_are_refused() {
        let err = open_video(VideoConfig::for_path("http://example.com/clip.mp4")).err();
        assert!(matches!(err, Some(AnalysisError::UnsupportedMediaType(_))));
        assert!(open_video(VideoConfig::for_path("  ")).is_err());
    }

    #[cfg(not(feature = "video-ffmpeg"))]
    #[test]
    fn real_files_need_ffmpeg() {
        let err = open_video(VideoConfig::for_path("clip.mp4")).err();
        assert!(matches!(err, Some(AnalysisError::FrameCaptureFailed(_))));
    }
}
