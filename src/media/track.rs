//! Track descriptors
//!
//! A track is the static description of one elementary stream. Sources publish
//! their tracks once before the first frame; the engine publishes its two
//! output tracks the same way.

/// Kind of a track along with its kind-specific attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Video track
    Video {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Audio track
    Audio {
        /// Number of interleaved channels
        channels: u16,
        /// Sample rate in Hz
        sample_rate: u32,
    },
}

/// Static descriptor of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Track {
    /// Track id, unique within its source
    pub id: u32,
    /// Kind and geometry/rate
    pub kind: TrackKind,
}

impl Track {
    /// Create a video track descriptor
    pub fn video(id: u32, width: u32, height: u32) -> Self {
        Self {
            id,
            kind: TrackKind::Video { width, height },
        }
    }

    /// Create an audio track descriptor
    pub fn audio(id: u32, channels: u16, sample_rate: u32) -> Self {
        Self {
            id,
            kind: TrackKind::Audio {
                channels,
                sample_rate,
            },
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self.kind, TrackKind::Video { .. })
    }

    pub fn is_audio(&self) -> bool {
        matches!(self.kind, TrackKind::Audio { .. })
    }

    /// Sample rate for audio tracks
    pub fn sample_rate(&self) -> Option<u32> {
        match self.kind {
            TrackKind::Audio { sample_rate, .. } => Some(sample_rate),
            TrackKind::Video { .. } => None,
        }
    }

    /// Frame dimensions for video tracks
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self.kind {
            TrackKind::Video { width, height } => Some((width, height)),
            TrackKind::Audio { .. } => None,
        }
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TrackKind::Video { width, height } => {
                write!(f, "#{} video {}x{}", self.id, width, height)
            }
            TrackKind::Audio {
                channels,
                sample_rate,
            } => write!(f, "#{} audio {}ch {}Hz", self.id, channels, sample_rate),
        }
    }
}
