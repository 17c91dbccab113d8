//! Media data model
//!
//! This module provides:
//! - Track descriptors for sources and the merged output
//! - Decoded video and audio frames

pub mod frame;
pub mod track;

pub use frame::{AudioFrame, Frame, FrameType, VideoFrame, RGB24_BYTES_PER_PIXEL};
pub use track::{Track, TrackKind};
