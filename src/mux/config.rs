//! Mux configuration

use std::time::Duration;

use crate::error::ConfigError;

/// Default mosaic cell width in pixels
pub const DEFAULT_CELL_WIDTH: u32 = 320;

/// Default mosaic cell height in pixels
pub const DEFAULT_CELL_HEIGHT: u32 = 240;

/// Default output frame rate for the composed video track
pub const DEFAULT_FRAME_RATE: u32 = 25;

/// Default output audio sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default number of samples per output audio frame
pub const DEFAULT_AUDIO_FRAME_SAMPLES: usize = 1024;

/// Merge engine configuration options
#[derive(Debug, Clone)]
pub struct MuxConfig {
    /// Width of one mosaic cell
    pub cell_width: u32,

    /// Height of one mosaic cell
    pub cell_height: u32,

    /// How far past the next due output frame sources are buffered
    pub read_ahead: Duration,

    /// Duration of one composed video frame
    pub video_frame_duration: Duration,

    /// Output audio sample rate in Hz
    pub sample_rate: u32,

    /// Samples per output audio frame
    pub audio_frame_samples: usize,

    /// Track id of the composed video track
    pub video_track_id: u32,

    /// Track id of the mixed audio track
    pub audio_track_id: u32,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            cell_width: DEFAULT_CELL_WIDTH,
            cell_height: DEFAULT_CELL_HEIGHT,
            read_ahead: Duration::from_millis(500),
            video_frame_duration: Duration::from_millis(1000 / DEFAULT_FRAME_RATE as u64),
            sample_rate: DEFAULT_SAMPLE_RATE,
            audio_frame_samples: DEFAULT_AUDIO_FRAME_SAMPLES,
            video_track_id: 1,
            audio_track_id: 2,
        }
    }
}

impl MuxConfig {
    /// Set the mosaic cell size
    pub fn cell_size(mut self, width: u32, height: u32) -> Self {
        self.cell_width = width;
        self.cell_height = height;
        self
    }

    /// Set the read-ahead window
    pub fn read_ahead(mut self, window: Duration) -> Self {
        self.read_ahead = window;
        self
    }

    /// Set the output video frame rate
    ///
    /// The frame duration is truncated to whole milliseconds.
    pub fn frame_rate(mut self, fps: u32) -> Self {
        self.video_frame_duration = if fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(1000 / fps as u64)
        };
        self
    }

    /// Set the output video frame duration directly
    pub fn video_frame_duration(mut self, duration: Duration) -> Self {
        self.video_frame_duration = duration;
        self
    }

    /// Set the output audio sample rate
    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Set the number of samples per output audio frame
    pub fn audio_frame_samples(mut self, samples: usize) -> Self {
        self.audio_frame_samples = samples;
        self
    }

    /// Set the output track ids
    pub fn track_ids(mut self, video: u32, audio: u32) -> Self {
        self.video_track_id = video;
        self.audio_track_id = audio;
        self
    }

    /// Read-ahead window in milliseconds
    pub fn read_ahead_ms(&self) -> i64 {
        self.read_ahead.as_millis() as i64
    }

    /// Video frame duration in milliseconds
    pub fn video_frame_ms(&self) -> i64 {
        self.video_frame_duration.as_millis() as i64
    }

    /// Check the configuration for values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cell_width == 0 || self.cell_height == 0 {
            return Err(ConfigError::ZeroCellSize);
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.audio_frame_samples == 0 {
            return Err(ConfigError::ZeroAudioFrameSamples);
        }
        if self.video_frame_ms() == 0 {
            return Err(ConfigError::ZeroVideoFrameDuration);
        }
        if self.video_track_id == self.audio_track_id {
            return Err(ConfigError::DuplicateTrackId(self.video_track_id));
        }
        Ok(())
    }
}
