//! Statistics and counters for a merge run
//!
//! Dropped and degraded frames are never errors inside the engine, so they are
//! counted here instead.

/// Per-source counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Video frames pulled from the bridge
    pub video_frames: u64,
    /// Audio frames pulled from the bridge
    pub audio_frames: u64,
    /// Last video timecode pulled
    pub last_video_tc: Option<i64>,
    /// Last audio timecode pulled
    pub last_audio_tc: Option<i64>,
    /// Audio frames dropped because their track was not published
    pub unknown_track_frames: u64,
    /// Audio frames dropped because they ended before the output frame
    pub stale_audio_frames: u64,
    /// Video frames whose pixel buffer did not match their dimensions
    pub malformed_video_frames: u64,
    /// Whether the source has signalled its end
    pub exhausted: bool,
}

impl SourceStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total frames pulled from the bridge
    pub fn frames_pulled(&self) -> u64 {
        self.video_frames + self.audio_frames
    }

    /// Total frames dropped or degraded
    pub fn frames_dropped(&self) -> u64 {
        self.unknown_track_frames + self.stale_audio_frames + self.malformed_video_frames
    }
}

/// Engine-wide counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MuxStats {
    /// Composed video frames emitted
    pub video_frames_out: u64,
    /// Mixed audio frames emitted
    pub audio_frames_out: u64,
    /// Video ticks that had no contribution
    pub skips: u64,
    /// Audio frames emitted with no contributing source
    pub silent_audio_frames: u64,
    /// Per-source counters, index-aligned with the engine's sources
    pub sources: Vec<SourceStats>,
}

impl MuxStats {
    /// Create stats for `sources` inputs
    pub fn new(sources: usize) -> Self {
        Self {
            sources: vec![SourceStats::new(); sources],
            ..Default::default()
        }
    }

    /// Total frames emitted downstream
    pub fn frames_out(&self) -> u64 {
        self.video_frames_out + self.audio_frames_out
    }

    /// Total frames pulled from all sources
    pub fn frames_in(&self) -> u64 {
        self.sources.iter().map(SourceStats::frames_pulled).sum()
    }

    /// Total frames dropped or degraded across all sources
    pub fn frames_dropped(&self) -> u64 {
        self.sources.iter().map(SourceStats::frames_dropped).sum()
    }

    /// Number of sources that have ended
    pub fn sources_exhausted(&self) -> usize {
        self.sources.iter().filter(|s| s.exhausted).count()
    }
}
