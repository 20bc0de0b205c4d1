//! Frame extraction.
//!
//! - `RawFrame`: one decoded RGB24 frame straight from a video source.
//! - `VideoSource`: what a decoder exposes (ready state, native size, current frame).
//! - `RasterSurface` / `SurfaceAllocator`: off-screen RGB surface the frame is drawn into.
//! - `capture_frame`: wait for decoded data, draw, encode as JPEG.
//!
//! The encoded frame is what gets submitted to a detector backend in place of
//! the whole video.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::error::{AnalysisError, AnalysisResult};

/// Surface size used when a source cannot report its native dimensions.
pub const FALLBACK_WIDTH: u32 = 1280;
pub const FALLBACK_HEIGHT: u32 = 720;

/// JPEG quality for captured frames (0.9 on a 0..1 scale).
pub const JPEG_QUALITY: u8 = 90;

/// Largest surface the heap allocator hands out (8K UHD).
pub const MAX_SURFACE_PIXELS: u64 = 7680 * 4320;

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

// ----------------------------------------------------------------------------
// RawFrame
// ----------------------------------------------------------------------------

/// Decoded RGB24 frame. Pixel bytes stay private to the crate.
pub struct RawFrame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RawFrame {
    /// Called by sources only. Length must be `width * height * 3`.
    pub(crate) fn new(data: Vec<u8>, width: u32, height: u32) -> AnalysisResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| AnalysisError::FrameCaptureFailed("frame dimensions overflow".into()))?;
        if data.len() != expected {
            return Err(AnalysisError::FrameCaptureFailed(format!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub(crate) fn byte_len(&self) -> usize {
        self.data.len()
    }

    fn into_image(self) -> AnalysisResult<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data).ok_or_else(|| {
            AnalysisError::FrameCaptureFailed("frame buffer does not match its dimensions".into())
        })
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// VideoSource
// ----------------------------------------------------------------------------

/// How much of the media a source has decoded. Ordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

impl ReadyState {
    /// A frame can be drawn.
    pub fn has_current_data(self) -> bool {
        self >= ReadyState::HaveCurrentData
    }
}

pub trait VideoSource {
    fn ready_state(&self) -> ReadyState;

    /// Block until the source has decoded more data and return the new state.
    ///
    /// Sources must return an error rather than spin when no further data
    /// can arrive (end of stream, decoder failure).
    fn wait_for_data(&mut self) -> AnalysisResult<ReadyState>;

    /// Native frame size, if known.
    fn native_dimensions(&self) -> Option<(u32, u32)>;

    /// The frame at the current playback position.
    fn current_frame(&mut self) -> AnalysisResult<RawFrame>;
}

impl<V: VideoSource + ?Sized> VideoSource for Box<V> {
    fn ready_state(&self) -> ReadyState {
        (**self).ready_state()
    }

    fn wait_for_data(&mut self) -> AnalysisResult<ReadyState> {
        (**self).wait_for_data()
    }

    fn native_dimensions(&self) -> Option<(u32, u32)> {
        (**self).native_dimensions()
    }

    fn current_frame(&mut self) -> AnalysisResult<RawFrame> {
        (**self).current_frame()
    }
}

// ----------------------------------------------------------------------------
// Raster surfaces
// ----------------------------------------------------------------------------

/// Off-screen RGB surface.
pub struct RasterSurface {
    image: RgbImage,
}

impl RasterSurface {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Draw a frame stretched to fill the surface.
    pub fn draw(&mut self, frame: RawFrame) -> AnalysisResult<()> {
        let source = frame.into_image()?;
        if source.dimensions() == self.image.dimensions() {
            self.image = source;
        } else {
            self.image = imageops::resize(
                &source,
                self.image.width(),
                self.image.height(),
                FilterType::Triangle,
            );
        }
        Ok(())
    }

    pub fn encode_jpeg(&self, quality: u8) -> AnalysisResult<EncodedFrame> {
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality)
            .encode_image(&self.image)
            .map_err(|e| AnalysisError::FrameCaptureFailed(format!("jpeg encode: {}", e)))?;
        Ok(EncodedFrame {
            bytes,
            width: self.image.width(),
            height: self.image.height(),
        })
    }
}

/// Hands out raster surfaces. `None` means no surface could be acquired.
pub trait SurfaceAllocator {
    fn acquire(&self, width: u32, height: u32) -> Option<RasterSurface>;
}

/// Allocates surfaces on the heap up to a pixel cap.
#[derive(Clone, Copy, Debug)]
pub struct HeapAllocator {
    max_pixels: u64,
}

impl HeapAllocator {
    pub fn new() -> Self {
        Self {
            max_pixels: MAX_SURFACE_PIXELS,
        }
    }

    pub fn with_max_pixels(max_pixels: u64) -> Self {
        Self { max_pixels }
    }
}

impl Default for HeapAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceAllocator for HeapAllocator {
    fn acquire(&self, width: u32, height: u32) -> Option<RasterSurface> {
        let pixels = width as u64 * height as u64;
        if pixels == 0 || pixels > self.max_pixels {
            return None;
        }
        Some(RasterSurface {
            image: RgbImage::new(width, height),
        })
    }
}

// ----------------------------------------------------------------------------
// Capture
// ----------------------------------------------------------------------------

/// A compressed still frame ready for submission.
#[derive(Clone, Debug)]
pub struct EncodedFrame {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedFrame {
    pub fn content_type(&self) -> &'static str {
        JPEG_CONTENT_TYPE
    }
}

/// Capture the current frame of `video` as JPEG.
///
/// Waits until the source has current data, then draws into a surface sized
/// to the native dimensions (1280x720 when unknown). Returns `Ok(None)` when
/// the allocator cannot provide a surface.
pub fn capture_frame<V, A>(video: &mut V, allocator: &A) -> AnalysisResult<Option<EncodedFrame>>
where
    V: VideoSource + ?Sized,
    A: SurfaceAllocator + ?Sized,
{
    while !video.ready_state().has_current_data() {
        let state = video.wait_for_data()?;
        log::debug!("video ready state: {:?}", state);
    }

    let (width, height) = video
        .native_dimensions()
        .filter(|(w, h)| *w > 0 && *h > 0)
        .unwrap_or((FALLBACK_WIDTH, FALLBACK_HEIGHT));

    let Some(mut surface) = allocator.acquire(width, height) else {
        log::warn!("no raster surface available for {}x{} capture", width, height);
        return Ok(None);
    };

    let frame = video.current_frame()?;
    log::debug!(
        "drawing {}x{} frame ({} bytes) into {}x{} surface",
        frame.width,
        frame.height,
        frame.byte_len(),
        width,
        height
    );
    surface.draw(frame)?;
    surface.encode_jpeg(JPEG_QUALITY).map(Some)
}
