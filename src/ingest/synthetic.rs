//! Synthetic video source for `stub://` paths.
//!
//! Produces a moving gradient. Metadata becomes available after the first
//! wait, current data after `warmup_polls` waits.

use super::VideoConfig;
use crate::error::AnalysisResult;
use crate::frame::{RawFrame, ReadyState, VideoSource};

pub struct SyntheticVideo {
    config: VideoConfig,
    state: ReadyState,
    polls: u32,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticVideo {
    pub fn new(config: VideoConfig) -> Self {
        let state = if config.warmup_polls == 0 {
            ReadyState::HaveEnoughData
        } else {
            ReadyState::HaveNothing
        };
        log::info!("SyntheticVideo: opened {}", config.path);
        Self {
            config,
            state,
            polls: 0,
            frame_count: 0,
            scene_state: 0,
        }
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    fn generate_pixels(&mut self) -> Vec<u8> {
        let pixel_count = (self.config.width as usize) * (self.config.height as usize) * 3;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }
}

impl VideoSource for SyntheticVideo {
    fn ready_state(&self) -> ReadyState {
        self.state
    }

    fn wait_for_data(&mut self) -> AnalysisResult<ReadyState> {
        self.polls += 1;
        self.state = if self.polls >= self.config.warmup_polls {
            ReadyState::HaveEnoughData
        } else {
            ReadyState::HaveMetadata
        };
        Ok(self.state)
    }

    fn native_dimensions(&self) -> Option<(u32, u32)> {
        (self.state >= ReadyState::HaveMetadata).then_some((self.config.width, self.config.height))
    }

    fn current_frame(&mut self) -> AnalysisResult<RawFrame> {
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        RawFrame::new(pixels, self.config.width, self.config.height)
    }
}
