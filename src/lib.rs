//! # mosaic-rs
//!
//! Merges several decoded media streams into a single time-aligned output: a
//! grid ("mosaic") of all video sources plus a downmixed mono audio track.
//!
//! Sources hand frames over through a [`bridge`], one per source. The
//! [`MergeEngine`] buffers each source a bounded distance ahead, composites
//! the video frame or mixes the audio frame that is due next, and hands it to
//! the caller.
//!
//! ```no_run
//! use mosaic_rs::bridge;
//! use mosaic_rs::media::{Track, VideoFrame};
//! use mosaic_rs::{MergeEngine, MuxConfig, MuxOutput};
//!
//! # async fn example() -> mosaic_rs::Result<()> {
//! let (mut tx, rx) = bridge::channel();
//! tokio::spawn(async move {
//!     tx.publish_tracks(vec![Track::video(1, 640, 360)]).await?;
//!     for i in 0..100 {
//!         let frame = VideoFrame::solid(1, i * 40, 640, 360, [0, 128, 255]);
//!         tx.deliver(Some(frame.into())).await?;
//!     }
//!     tx.deliver(None).await
//! });
//!
//! let mut engine = MergeEngine::new(MuxConfig::default(), vec![rx])?;
//! let tracks = engine.output_tracks();
//! loop {
//!     match engine.produce().await {
//!         MuxOutput::Video(frame) => { /* encode */ }
//!         MuxOutput::Audio(frame) => { /* encode */ }
//!         MuxOutput::Skip => continue,
//!         MuxOutput::End => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod error;
pub mod media;
pub mod mux;
pub mod stats;

pub use error::{Error, Result};
pub use mux::{MergeEngine, MuxConfig, MuxOutput, MuxSink};
