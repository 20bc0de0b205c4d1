//! Local video file source using FFmpeg.
//!
//! Metadata (dimensions) is known once the decoder is open. `wait_for_data`
//! decodes up to the first frame; `current_frame` hands out the most recent
//! decoded frame and advances to the next one. Once the packets run out the
//! decoder is flushed, so frames it still buffers are delivered too.

use ffmpeg_next as ffmpeg;

use super::VideoConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::frame::{RawFrame, ReadyState, VideoSource};

pub(crate) struct FfmpegVideo {
    config: VideoConfig,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    state: ReadyState,
    current: Option<(Vec<u8>, u32, u32)>,
    eof_sent: bool,
    frame_count: u64,
}

fn capture_err(context: &str, err: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::FrameCaptureFailed(format!("{}: {}", context, err))
}

impl FfmpegVideo {
    pub(crate) fn open(config: VideoConfig) -> AnalysisResult<Self> {
        ffmpeg::init().map_err(|e| capture_err("initialize ffmpeg", e))?;
        let input = ffmpeg::format::input(&config.path)
            .map_err(|e| capture_err(&format!("open '{}'", config.path), e))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| AnalysisError::FrameCaptureFailed("file has no video track".into()))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .map_err(|e| capture_err("load video decoder parameters", e))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| capture_err("open ffmpeg video decoder", e))?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(|e| capture_err("create ffmpeg scaler", e))?;

        log::info!(
            "FfmpegVideo: opened {}x{} video",
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            config,
            input,
            stream_index,
            decoder,
            scaler,
            state: ReadyState::HaveMetadata,
            current: None,
            eof_sent: false,
            frame_count: 0,
        })
    }

    /// Decode the next frame into `current`.
    ///
    /// Frames already buffered in the decoder are taken first, so
    /// `send_packet` is only called once the decoder has asked for input. At
    /// end of stream the decoder is flushed, which releases frames held back
    /// for reordering or frame threading.
    fn decode_next(&mut self) -> AnalysisResult<()> {
        if let Some(frame) = receive_rgb(&mut self.decoder, &mut self.scaler)? {
            return self.store(frame);
        }

        if !self.eof_sent {
            let mut received = None;
            for (stream, packet) in self.input.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }
                self.decoder
                    .send_packet(&packet)
                    .map_err(|e| capture_err("send packet to ffmpeg decoder", e))?;
                received = receive_rgb(&mut self.decoder, &mut self.scaler)?;
                if received.is_some() {
                    break;
                }
            }
            if let Some(frame) = received {
                return self.store(frame);
            }

            self.decoder
                .send_eof()
                .map_err(|e| capture_err("flush ffmpeg decoder", e))?;
            self.eof_sent = true;
        }

        if let Some(frame) = receive_rgb(&mut self.decoder, &mut self.scaler)? {
            return self.store(frame);
        }

        Err(AnalysisError::FrameCaptureFailed(format!(
            "{} ended without frames",
            self.config.path
        )))
    }

    fn store(&mut self, frame: (Vec<u8>, u32, u32)) -> AnalysisResult<()> {
        self.current = Some(frame);
        self.frame_count += 1;
        Ok(())
    }
}

/// Pull one decoded frame as RGB24. `None` when the decoder needs more input
/// or has been fully drained.
fn receive_rgb(
    decoder: &mut ffmpeg::codec::decoder::Video,
    scaler: &mut ffmpeg::software::scaling::Context,
) -> AnalysisResult<Option<(Vec<u8>, u32, u32)>> {
    let mut decoded = ffmpeg::frame::Video::empty();
    match decoder.receive_frame(&mut decoded) {
        Ok(()) => {}
        Err(ffmpeg::Error::Eof) => return Ok(None),
        Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => {
            return Ok(None)
        }
        Err(e) => return Err(capture_err("decode video frame", e)),
    }
    let mut rgb_frame = ffmpeg::frame::Video::empty();
    scaler
        .run(&decoded, &mut rgb_frame)
        .map_err(|e| capture_err("scale frame to RGB", e))?;
    frame_to_pixels(&rgb_frame).map(Some)
}

impl VideoSource for FfmpegVideo {
    fn ready_state(&self) -> ReadyState {
        self.state
    }

    fn wait_for_data(&mut self) -> AnalysisResult<ReadyState> {
        if self.current.is_none() {
            self.decode_next()?;
        }
        self.state = ReadyState::HaveCurrentData;
        Ok(self.state)
    }

    fn native_dimensions(&self) -> Option<(u32, u32)> {
        Some((self.decoder.width(), self.decoder.height()))
    }

    fn current_frame(&mut self) -> AnalysisResult<RawFrame> {
        let (pixels, width, height) = match self.current.take() {
            Some(frame) => frame,
            None => {
                self.decode_next()?;
                self.current
                    .take()
                    .ok_or_else(|| AnalysisError::FrameCaptureFailed("no decoded frame".into()))?
            }
        };
        self.state = ReadyState::HaveMetadata;
        RawFrame::new(pixels, width, height)
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> AnalysisResult<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let plane = data.get(..row_bytes * height as usize).ok_or_else(|| {
            AnalysisError::FrameCaptureFailed("ffmpeg frame plane is truncated".into())
        })?;
        return Ok((plane.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(data.get(start..end).ok_or_else(|| {
            AnalysisError::FrameCaptureFailed("ffmpeg frame row is out of bounds".into())
        })?);
    }

    Ok((pixels, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{capture_frame, HeapAllocator};

    fn open(path: &std::path::Path) -> FfmpegVideo {
        FfmpegVideo::open(VideoConfig::for_path(path.to_string_lossy())).expect("open video")
    }

    #[test]
    fn single_frame_input_is_captured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one_frame.jpg");
        image::RgbImage::from_pixel(32, 16, image::Rgb([30, 120, 200]))
            .save(&path)
            .unwrap();

        let mut video = open(&path);
        let frame = capture_frame(&mut video, &HeapAllocator::new())
            .unwrap()
            .expect("frame");
        assert_eq!((frame.width, frame.height), (32, 16));
        assert_eq!(video.frame_count, 1);

        // Drained: asking for more reports end of stream instead of hanging.
        let err = video.wait_for_data().unwrap_err();
        assert!(matches!(err, AnalysisError::FrameCaptureFailed(_)));
    }

    #[test]
    fn missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let err = FfmpegVideo::open(VideoConfig::for_path(
            dir.path().join("absent.mp4").to_string_lossy(),
        ))
        .err();
        assert!(matches!(err, Some(AnalysisError::FrameCaptureFailed(_))));
    }
}
