//! Merge statistics

pub mod metrics;

pub use metrics::{MuxStats, SourceStats};
