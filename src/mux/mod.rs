//! Mosaic merge engine
//!
//! Turns N independently decoded sources into one composed video track and
//! one mono audio track.
//!
//! # Architecture
//!
//! ```text
//!   [source 0]   [source 1]   ...   [source N-1]      producer threads/tasks
//!       │            │                   │
//!   FrameBridge  FrameBridge         FrameBridge       single-slot handoff
//!       │            │                   │
//!       ▼            ▼                   ▼
//!  ┌──────────────────────────────────────────────┐
//!  │ MergeEngine                                  │
//!  │   SourceBuffers { video deque, audio deque } │   fill up to horizon
//!  │        │                      │              │
//!  │        ▼                      ▼              │
//!  │   Compositor             AudioMixer          │   video wins ties
//!  └────────┬──────────────────────┬──────────────┘
//!           ▼                      ▼
//!      MuxOutput::Video       MuxOutput::Audio          → MuxSink
//! ```
//!
//! Everything below the bridges is owned by the engine and needs no locking.

pub mod buffer;
pub mod compositor;
pub mod config;
pub mod engine;
pub mod grid;
pub mod mixer;

pub use buffer::SourceBuffers;
pub use compositor::{select_hold_frame, Compositor};
pub use config::MuxConfig;
pub use engine::{MergeEngine, MuxOutput, MuxSink};
pub use grid::{CellRect, MosaicGrid};
pub use mixer::{downmix, resample, AudioMixer};
