//! Merge engine and scheduler
//!
//! The engine owns every source buffer and both output clocks. Each call to
//! [`MergeEngine::produce`] is one tick:
//!
//! 1. fill all sources up to `max(video_due, audio_due) + read_ahead`
//! 2. pick the kind that is due first (video wins ties)
//! 3. compose or mix that frame
//!
//! A video tick with no contributing source yields [`MuxOutput::Skip`]; the
//! caller just calls again. The master clock never moves on a skip, but the
//! next tick either serves audio or, when every source's video starts later,
//! the video clock jumps ahead to it. Once every source has ended and every
//! buffer has drained, the engine yields [`MuxOutput::End`] forever.

use crate::bridge::FrameReceiver;
use crate::error::{ConfigError, Result};
use crate::media::{AudioFrame, Track, VideoFrame};
use crate::stats::MuxStats;

use super::buffer::{fill_all, SourceBuffers};
use super::compositor::Compositor;
use super::config::MuxConfig;
use super::grid::MosaicGrid;
use super::mixer::AudioMixer;

/// Result of one scheduling tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxOutput {
    /// A composed mosaic frame
    Video(VideoFrame),
    /// A mixed audio frame
    Audio(AudioFrame),
    /// Nothing to write this tick; call again
    Skip,
    /// All sources are exhausted and drained
    End,
}

/// Receives the merged output
pub trait MuxSink {
    /// Called once with the output tracks before any frame
    fn on_tracks(&mut self, tracks: &[Track]);

    /// Called for each composed video frame
    fn on_video(&mut self, frame: VideoFrame);

    /// Called for each mixed audio frame
    fn on_audio(&mut self, frame: AudioFrame);
}

/// Merges N sources into one mosaic video track and one mono audio track
pub struct MergeEngine {
    config: MuxConfig,
    sources: Vec<SourceBuffers>,
    compositor: Compositor,
    mixer: AudioMixer,
    clock: i64,
    video_done: bool,
    audio_done: bool,
    audio_turn: bool,
    ended: bool,
    counters: MuxStats,
}

impl MergeEngine {
    /// Create an engine reading from one bridge receiver per source
    ///
    /// Receivers are laid out in the mosaic in the order given.
    pub fn new(config: MuxConfig, receivers: Vec<FrameReceiver>) -> Result<Self> {
        config.validate()?;
        if receivers.is_empty() {
            return Err(ConfigError::NoSources.into());
        }

        let grid = MosaicGrid::new(receivers.len(), config.cell_width, config.cell_height);
        let compositor = Compositor::new(grid, config.video_track_id, config.video_frame_ms());
        let mixer = AudioMixer::new(
            config.audio_track_id,
            config.sample_rate,
            config.audio_frame_samples,
        );
        let counters = MuxStats::new(receivers.len());
        let sources = receivers
            .into_iter()
            .enumerate()
            .map(|(index, rx)| SourceBuffers::new(index, rx))
            .collect();

        tracing::info!(
            sources = grid.sources,
            rows = grid.rows,
            columns = grid.columns,
            width = grid.width(),
            height = grid.height(),
            sample_rate = config.sample_rate,
            "Merge engine created"
        );

        Ok(Self {
            config,
            sources,
            compositor,
            mixer,
            clock: 0,
            video_done: false,
            audio_done: false,
            audio_turn: false,
            ended: false,
            counters,
        })
    }

    /// The two output track descriptors: mosaic video, then mono audio
    pub fn output_tracks(&self) -> Vec<Track> {
        let grid = self.compositor.grid();
        vec![
            Track::video(self.config.video_track_id, grid.width(), grid.height()),
            Track::audio(self.config.audio_track_id, 1, self.config.sample_rate),
        ]
    }

    pub fn config(&self) -> &MuxConfig {
        &self.config
    }

    pub fn grid(&self) -> &MosaicGrid {
        self.compositor.grid()
    }

    /// Master clock: the earliest due timecode of the active output kinds
    pub fn clock(&self) -> i64 {
        self.clock
    }

    pub fn next_video_due(&self) -> i64 {
        self.compositor.next_due()
    }

    pub fn next_audio_due(&self) -> i64 {
        self.mixer.next_due()
    }

    /// Buffered state of each source
    pub fn sources(&self) -> &[SourceBuffers] {
        &self.sources
    }

    /// Whether `End` has been produced
    pub fn is_finished(&self) -> bool {
        self.ended
    }

    /// Snapshot of the engine and per-source counters
    pub fn stats(&self) -> MuxStats {
        let mut stats = self.counters.clone();
        stats.sources = self.sources.iter().map(|s| s.stats.clone()).collect();
        stats
    }

    /// Read-ahead horizon for the next fill
    pub fn horizon(&self) -> i64 {
        self.next_video_due().max(self.next_audio_due()) + self.config.read_ahead_ms()
    }

    /// Buffer every source up to the current horizon
    ///
    /// Waits on each source in turn until it delivers a frame past the
    /// horizon or ends. Returns the number of frames pulled.
    pub async fn fill(&mut self) -> usize {
        let horizon = self.horizon();
        let pulled = fill_all(&mut self.sources, horizon).await;
        tracing::trace!(horizon = horizon, pulled = pulled, "Filled source buffers");
        pulled
    }

    /// Run one scheduling tick
    pub async fn produce(&mut self) -> MuxOutput {
        if self.ended {
            return MuxOutput::End;
        }

        self.fill().await;
        self.update_finished();

        if self.video_done && self.audio_done {
            self.ended = true;
            let stats = self.stats();
            tracing::info!(
                video_frames = stats.video_frames_out,
                audio_frames = stats.audio_frames_out,
                frames_in = stats.frames_in(),
                skips = stats.skips,
                dropped = stats.frames_dropped(),
                "Merge finished"
            );
            return MuxOutput::End;
        }

        // After an empty video tick audio gets a turn, so the horizon keeps
        // moving for sources that deliver audio well ahead of video.
        let video_first = !self.video_done
            && (self.audio_done
                || (!self.audio_turn && self.next_video_due() <= self.next_audio_due()));

        let output = if video_first {
            match self.compositor.compose(&mut self.sources) {
                Some(frame) => {
                    self.counters.video_frames_out += 1;
                    MuxOutput::Video(frame)
                }
                None => {
                    self.counters.skips += 1;
                    let caught_up = self.compositor.catch_up(&self.sources);
                    self.audio_turn = !caught_up;
                    // The scan may have drained the last frames of ended sources.
                    self.update_finished();
                    return MuxOutput::Skip;
                }
            }
        } else {
            let (frame, contributors) = self.mixer.mix(&mut self.sources);
            self.counters.audio_frames_out += 1;
            if contributors == 0 {
                self.counters.silent_audio_frames += 1;
            }
            MuxOutput::Audio(frame)
        };

        self.audio_turn = false;
        self.advance_clock();
        output
    }

    /// Drive the engine to completion, handing every frame to `sink`
    ///
    /// Returns the final statistics.
    pub async fn run<S: MuxSink>(&mut self, sink: &mut S) -> MuxStats {
        sink.on_tracks(&self.output_tracks());

        loop {
            match self.produce().await {
                MuxOutput::Video(frame) => sink.on_video(frame),
                MuxOutput::Audio(frame) => sink.on_audio(frame),
                MuxOutput::Skip => continue,
                MuxOutput::End => break,
            }
        }

        self.stats()
    }

    fn update_finished(&mut self) {
        if !self.video_done && self.sources.iter().all(SourceBuffers::video_finished) {
            self.video_done = true;
            tracing::debug!(timecode = self.next_video_due(), "Video output finished");
        }
        if !self.audio_done && self.sources.iter().all(SourceBuffers::audio_finished) {
            self.audio_done = true;
            tracing::debug!(timecode = self.next_audio_due(), "Audio output finished");
        }
    }

    fn advance_clock(&mut self) {
        self.clock = match (self.video_done, self.audio_done) {
            (false, false) => self.next_video_due().min(self.next_audio_due()),
            (false, true) => self.next_video_due(),
            (true, false) => self.next_audio_due(),
            (true, true) => self.clock,
        };
    }
}
