//! Error types
//!
//! Nothing inside a running merge is fatal: lagging or broken sources degrade
//! to a black cell or silence. Errors are only returned for invalid
//! configuration and for producers delivering into a bridge whose engine is
//! gone.

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid mux configuration
    Config(ConfigError),
    /// Frame handoff failure
    Bridge(BridgeError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Bridge(e) => write!(f, "Bridge error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            Error::Bridge(e) => Some(e),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<BridgeError> for Error {
    fn from(e: BridgeError) -> Self {
        Error::Bridge(e)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The engine was given no sources
    NoSources,
    /// Cell width or height is zero
    ZeroCellSize,
    /// Output sample rate is zero
    ZeroSampleRate,
    /// Output audio frame has no samples
    ZeroAudioFrameSamples,
    /// Output video frame duration is zero
    ZeroVideoFrameDuration,
    /// Video and audio output tracks share an id
    DuplicateTrackId(u32),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoSources => write!(f, "At least one source is required"),
            ConfigError::ZeroCellSize => write!(f, "Cell width and height must be non-zero"),
            ConfigError::ZeroSampleRate => write!(f, "Output sample rate must be non-zero"),
            ConfigError::ZeroAudioFrameSamples => {
                write!(f, "Output audio frame must hold at least one sample")
            }
            ConfigError::ZeroVideoFrameDuration => {
                write!(f, "Output video frame duration must be non-zero")
            }
            ConfigError::DuplicateTrackId(id) => {
                write!(f, "Video and audio output tracks share id {}", id)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Producer-side handoff errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The consuming engine dropped its end of the bridge
    ReceiverDropped,
    /// Tracks were published after the first frame or a second time
    TracksAlreadyPublished,
    /// A delivery was attempted after the end sentinel
    AlreadyEnded,
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::ReceiverDropped => write!(f, "Frame receiver dropped"),
            BridgeError::TracksAlreadyPublished => write!(f, "Tracks already published"),
            BridgeError::AlreadyEnded => write!(f, "Source already ended"),
        }
    }
}

impl std::error::Error for BridgeError {}
