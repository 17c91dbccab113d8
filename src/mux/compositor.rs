//! Mosaic video compositing
//!
//! Every tick picks, per source, the newest buffered frame at or before the
//! due timecode (the "hold frame") and blits it scaled into the source's grid
//! cell. A source whose buffer does not yet reach past the due timecode is
//! left black for this tick.

use std::collections::VecDeque;

use bytes::Bytes;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb, RgbImage};

use crate::media::VideoFrame;

use super::buffer::SourceBuffers;
use super::grid::{CellRect, MosaicGrid};

/// Scans a source's video buffer for the frame to show at `due`
///
/// Frames at or before `due` are popped; the newest of them is the hold
/// frame. Once a frame past `due` is found, it goes back to the front of the
/// buffer with the hold frame in front of it, so both are still available
/// next tick, and the hold frame is returned.
///
/// If the buffer empties without a frame past `due`, nothing is returned and
/// the popped frames are gone.
pub fn select_hold_frame(buffer: &mut VecDeque<VideoFrame>, due: i64) -> Option<VideoFrame> {
    let mut hold: Option<VideoFrame> = None;

    while let Some(frame) = buffer.pop_front() {
        if frame.timecode <= due {
            hold = Some(frame);
            continue;
        }

        buffer.push_front(frame);
        // Source slower than the output: the same picture covers several ticks
        if let Some(ref hold) = hold {
            buffer.push_front(hold.clone());
        }
        return hold;
    }

    None
}

/// Produces composed mosaic frames on the video clock
#[derive(Debug)]
pub struct Compositor {
    grid: MosaicGrid,
    track_id: u32,
    frame_ms: i64,
    next_due: i64,
    filter: FilterType,
}

impl Compositor {
    pub fn new(grid: MosaicGrid, track_id: u32, frame_ms: i64) -> Self {
        Self {
            grid,
            track_id,
            frame_ms,
            next_due: 0,
            filter: FilterType::Triangle,
        }
    }

    /// Timecode of the next video frame to produce
    pub fn next_due(&self) -> i64 {
        self.next_due
    }

    pub fn grid(&self) -> &MosaicGrid {
        &self.grid
    }

    /// Compose the frame due at `next_due()`
    ///
    /// Returns `None` when no source contributed; the video clock then stays
    /// where it is.
    pub fn compose(&mut self, sources: &mut [SourceBuffers]) -> Option<VideoFrame> {
        let due = self.next_due;

        let contributions: Vec<(usize, VideoFrame)> = sources
            .iter_mut()
            .filter_map(|source| {
                let buffer = source.video.as_mut()?;
                select_hold_frame(buffer, due).map(|frame| (source.index, frame))
            })
            .collect();

        if contributions.is_empty() {
            tracing::debug!(timecode = due, "No video contribution, skipping tick");
            return None;
        }

        // A fresh canvas is zeroed, which is black in RGB24.
        let mut canvas = RgbImage::new(self.grid.width(), self.grid.height());

        for (index, frame) in &contributions {
            let Some(cell) = self.grid.cell(*index) else {
                continue;
            };
            self.blit(&mut canvas, frame, cell);
        }

        tracing::trace!(
            timecode = due,
            contributions = contributions.len(),
            "Composed video frame"
        );

        let frame = VideoFrame::new(
            self.track_id,
            due,
            self.grid.width(),
            self.grid.height(),
            Bytes::from(canvas.into_raw()),
        );
        self.next_due += self.frame_ms;

        Some(frame)
    }

    /// Move the video clock up to the earliest buffered frame after a skip
    ///
    /// After a skipped tick every non-empty buffer starts past the due
    /// timecode. If all sources are late like this, the clock jumps forward
    /// in whole frame steps to the first slot that reaches a buffered frame,
    /// leaving a gap in the output instead of skipping forever. Returns
    /// whether the clock moved.
    pub fn catch_up(&mut self, sources: &[SourceBuffers]) -> bool {
        let earliest = sources
            .iter()
            .filter_map(|s| s.video.as_ref()?.front().map(|f| f.timecode))
            .min();

        let Some(earliest) = earliest else {
            return false;
        };
        if earliest <= self.next_due {
            return false;
        }

        let steps = (earliest - self.next_due + self.frame_ms - 1) / self.frame_ms;
        let from = self.next_due;
        self.next_due += steps * self.frame_ms;

        tracing::debug!(
            from = from,
            to = self.next_due,
            "All sources start late, moving video clock forward"
        );
        true
    }

    /// Scale `frame` to fill `cell` and copy it into the canvas
    fn blit(&self, canvas: &mut RgbImage, frame: &VideoFrame, cell: CellRect) {
        let Some(source) =
            ImageBuffer::<Rgb<u8>, &[u8]>::from_raw(frame.width, frame.height, &frame.data[..])
        else {
            tracing::debug!(
                timecode = frame.timecode,
                "Pixel buffer does not match frame size, leaving cell black"
            );
            return;
        };

        let (x, y) = (i64::from(cell.x), i64::from(cell.y));
        if frame.width == cell.width && frame.height == cell.height {
            imageops::replace(canvas, &source, x, y);
        } else {
            let scaled = imageops::resize(&source, cell.width, cell.height, self.filter);
            imageops::replace(canvas, &scaled, x, y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge;

    fn frame(timecode: i64, rgb: [u8; 3]) -> VideoFrame {
        VideoFrame::solid(1, timecode, 8, 6, rgb)
    }

    fn source_with(index: usize, frames: Vec<VideoFrame>) -> SourceBuffers {
        let (_tx, rx) = bridge::channel();
        let mut source = SourceBuffers::new(index, rx);
        for f in frames {
            source.push(f.into());
        }
        source
    }

    fn timecodes(buffer: &VecDeque<VideoFrame>) -> Vec<i64> {
        buffer.iter().map(|f| f.timecode).collect()
    }

    #[test]
    fn test_hold_frame_is_kept_for_next_tick() {
        let mut buffer: VecDeque<_> = vec![frame(0, [1, 1, 1]), frame(80, [2, 2, 2])].into();

        let hold = select_hold_frame(&mut buffer, 40).unwrap();

        assert_eq!(hold.timecode, 0);
        assert_eq!(timecodes(&buffer), vec![0, 80]);
    }

    #[test]
    fn test_hold_frame_advances_past_older_frames() {
        let mut buffer: VecDeque<_> = (0..5).map(|i| frame(i * 20, [0, 0, 0])).collect();

        let hold = select_hold_frame(&mut buffer, 45).unwrap();

        // 0 and 20 are superseded by 40
        assert_eq!(hold.timecode, 40);
        assert_eq!(timecodes(&buffer), vec![40, 60, 80]);
    }

    #[test]
    fn test_no_hold_frame_when_source_starts_late() {
        let mut buffer: VecDeque<_> = vec![frame(100, [0, 0, 0])].into();

        assert!(select_hold_frame(&mut buffer, 40).is_none());
        assert_eq!(timecodes(&buffer), vec![100]);
    }

    #[test]
    fn test_no_contribution_without_frame_past_due() {
        let mut buffer: VecDeque<_> = vec![frame(0, [0, 0, 0]), frame(40, [0, 0, 0])].into();

        assert!(select_hold_frame(&mut buffer, 40).is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_compose_places_sources_in_cells() {
        let grid = MosaicGrid::new(2, 4, 3);
        let mut compositor = Compositor::new(grid, 1, 40);
        let mut sources = vec![
            source_with(0, vec![frame(0, [255, 0, 0]), frame(40, [255, 0, 0])]),
            source_with(1, vec![frame(0, [0, 0, 255]), frame(40, [0, 0, 255])]),
        ];

        let out = compositor.compose(&mut sources).unwrap();

        assert_eq!((out.width, out.height), (8, 3));
        assert_eq!(out.timecode, 0);
        assert_eq!(out.track_id, 1);
        assert_eq!(out.pixel(0, 0), Some([255, 0, 0]));
        assert_eq!(out.pixel(3, 2), Some([255, 0, 0]));
        assert_eq!(out.pixel(4, 0), Some([0, 0, 255]));
        assert_eq!(out.pixel(7, 2), Some([0, 0, 255]));
        assert_eq!(compositor.next_due(), 40);
    }

    #[test]
    fn test_compose_leaves_lagging_source_black() {
        let grid = MosaicGrid::new(3, 4, 3);
        let mut compositor = Compositor::new(grid, 1, 40);
        let mut sources = vec![
            source_with(0, vec![frame(0, [10, 20, 30]), frame(40, [10, 20, 30])]),
            source_with(1, vec![frame(120, [255, 255, 255])]),
            source_with(2, vec![]),
        ];

        let out = compositor.compose(&mut sources).unwrap();

        assert_eq!((out.width, out.height), (8, 6));
        assert_eq!(out.pixel(1, 1), Some([10, 20, 30]));
        assert_eq!(out.pixel(5, 1), Some([0, 0, 0]));
        assert_eq!(out.pixel(1, 4), Some([0, 0, 0]));
        assert_eq!(out.pixel(6, 5), Some([0, 0, 0]));
    }

    #[test]
    fn test_compose_skips_when_nothing_contributes() {
        let grid = MosaicGrid::new(2, 4, 3);
        let mut compositor = Compositor::new(grid, 1, 40);
        let mut sources = vec![source_with(0, vec![]), source_with(1, vec![])];

        assert!(compositor.compose(&mut sources).is_none());
        assert_eq!(compositor.next_due(), 0);
        assert!(!compositor.catch_up(&sources));
        assert_eq!(compositor.next_due(), 0);
    }

    #[test]
    fn test_catch_up_to_late_sources() {
        let grid = MosaicGrid::new(2, 4, 3);
        let mut compositor = Compositor::new(grid, 1, 40);
        let mut sources = vec![
            source_with(0, vec![frame(130, [9, 9, 9]), frame(170, [9, 9, 9])]),
            source_with(1, vec![frame(300, [0, 0, 0])]),
        ];

        assert!(compositor.compose(&mut sources).is_none());
        assert!(compositor.catch_up(&sources));
        // First 40 ms slot at or after 130
        assert_eq!(compositor.next_due(), 160);

        let out = compositor.compose(&mut sources).unwrap();
        assert_eq!(out.timecode, 160);
        assert_eq!(out.pixel(0, 0), Some([9, 9, 9]));
        assert_eq!(out.pixel(4, 0), Some([0, 0, 0]));
    }
}
