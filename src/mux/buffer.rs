//! Per-source frame buffers
//!
//! Each source owns a bridge receiver plus up to two ordered buffers, one per
//! media kind. A buffer is created on the first frame of its kind, so a source
//! without audio never has an audio buffer at all.

use std::collections::VecDeque;

use crate::bridge::FrameReceiver;
use crate::media::{AudioFrame, Frame, Track, VideoFrame};
use crate::stats::SourceStats;

/// Buffered state of one input source
#[derive(Debug)]
pub struct SourceBuffers {
    /// Position of the source in the mosaic
    pub index: usize,
    /// Consumer half of the source's bridge
    pub bridge: FrameReceiver,
    /// Buffered video frames, oldest first
    pub video: Option<VecDeque<VideoFrame>>,
    /// Buffered audio frames, oldest first
    pub audio: Option<VecDeque<AudioFrame>>,
    /// Counters for this source
    pub stats: SourceStats,
}

impl SourceBuffers {
    pub fn new(index: usize, bridge: FrameReceiver) -> Self {
        Self {
            index,
            bridge,
            video: None,
            audio: None,
            stats: SourceStats::new(),
        }
    }

    /// Pull frames from the bridge until one lands past `horizon` or the
    /// source runs dry.
    ///
    /// The frame that crosses the horizon is still buffered, so every call
    /// that finds a frame available pulls at least one. Returns the number of
    /// frames pulled.
    pub async fn fill(&mut self, horizon: i64) -> usize {
        let mut pulled = 0;

        while self.bridge.has_next().await {
            let Some(frame) = self.bridge.next() else {
                break;
            };
            pulled += 1;

            let timecode = frame.timecode();
            self.push(frame);

            if timecode > horizon {
                break;
            }
        }

        if self.bridge.is_closed() && !self.stats.exhausted {
            self.stats.exhausted = true;
            tracing::info!(
                source = self.index,
                video_frames = self.stats.video_frames,
                audio_frames = self.stats.audio_frames,
                "Source exhausted"
            );
        }

        pulled
    }

    /// Append a frame to the buffer of its kind
    pub fn push(&mut self, frame: Frame) {
        match frame {
            Frame::Video(frame) => {
                self.stats.video_frames += 1;
                if !frame.is_well_formed() {
                    self.stats.malformed_video_frames += 1;
                    tracing::warn!(
                        source = self.index,
                        timecode = frame.timecode,
                        width = frame.width,
                        height = frame.height,
                        len = frame.data.len(),
                        "Dropping video frame with mismatched pixel buffer"
                    );
                    return;
                }
                self.stats.last_video_tc = Some(frame.timecode);
                self.video.get_or_insert_with(VecDeque::new).push_back(frame);
            }
            Frame::Audio(frame) => {
                self.stats.audio_frames += 1;
                self.stats.last_audio_tc = Some(frame.timecode);
                self.audio.get_or_insert_with(VecDeque::new).push_back(frame);
            }
        }
    }

    /// Number of buffered video frames
    pub fn video_len(&self) -> usize {
        self.video.as_ref().map_or(0, VecDeque::len)
    }

    /// Number of buffered audio frames
    pub fn audio_len(&self) -> usize {
        self.audio.as_ref().map_or(0, VecDeque::len)
    }

    /// Whether this source can never contribute video again
    ///
    /// True once the buffer is drained and either the source has ended or
    /// its published tracks carry no video.
    pub fn video_finished(&self) -> bool {
        self.video_len() == 0 && (self.bridge.is_closed() || self.lacks_track(|t| t.is_video()))
    }

    /// Whether this source can never contribute audio again
    pub fn audio_finished(&self) -> bool {
        self.audio_len() == 0 && (self.bridge.is_closed() || self.lacks_track(|t| t.is_audio()))
    }

    fn lacks_track(&self, is_kind: impl Fn(&Track) -> bool) -> bool {
        let tracks = self.bridge.tracks();
        !tracks.is_empty() && !tracks.iter().any(is_kind)
    }
}

/// Pull every source up to `horizon`, in source order
///
/// Returns the total number of frames pulled.
pub async fn fill_all(sources: &mut [SourceBuffers], horizon: i64) -> usize {
    let mut pulled = 0;
    for source in sources.iter_mut() {
        pulled += source.fill(horizon).await;
    }
    pulled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge;

    fn spawn_video_source(timecodes: Vec<i64>) -> FrameReceiver {
        let (mut tx, rx) = bridge::channel();
        tokio::spawn(async move {
            tx.publish_tracks(vec![Track::video(1, 2, 2)]).await.unwrap();
            for tc in timecodes {
                let frame = VideoFrame::solid(1, tc, 2, 2, [255, 255, 255]);
                if tx.deliver(Some(frame.into())).await.is_err() {
                    return;
                }
            }
            let _ = tx.deliver(None).await;
        });
        rx
    }

    #[tokio::test]
    async fn test_fill_stops_after_one_frame_past_horizon() {
        let timecodes = (0..40).map(|i| i * 40).collect();
        let mut source = SourceBuffers::new(0, spawn_video_source(timecodes));

        let pulled = source.fill(500).await;

        // 0..=480 are within the horizon, 520 is the one overshooting frame
        assert_eq!(pulled, 14);
        let buffered: Vec<i64> = source
            .video
            .as_ref()
            .unwrap()
            .iter()
            .map(|f| f.timecode)
            .collect();
        assert_eq!(buffered.last(), Some(&520));
        assert_eq!(buffered.iter().filter(|&&tc| tc > 500).count(), 1);
        assert!(source.audio.is_none());
    }

    #[tokio::test]
    async fn test_fill_pulls_one_frame_when_already_past_horizon() {
        let timecodes = (0..40).map(|i| i * 40).collect();
        let mut source = SourceBuffers::new(0, spawn_video_source(timecodes));

        source.fill(500).await;
        let before = source.video_len();

        // Horizon unchanged: only the next triggering frame is pulled
        assert_eq!(source.fill(500).await, 1);
        assert_eq!(source.video_len(), before + 1);
    }

    #[tokio::test]
    async fn test_fill_until_exhausted() {
        let mut source = SourceBuffers::new(3, spawn_video_source(vec![0, 40, 80]));

        assert_eq!(source.fill(500).await, 3);
        assert!(source.stats.exhausted);
        assert!(!source.video_finished());

        source.video.as_mut().unwrap().clear();
        assert!(source.video_finished());
        assert!(source.audio_finished());

        // Nothing more to pull after the end
        assert_eq!(source.fill(10_000).await, 0);
    }

    #[tokio::test]
    async fn test_video_only_source_never_has_audio() {
        let (mut tx, rx) = bridge::channel();
        let mut source = SourceBuffers::new(0, rx);

        tokio::spawn(async move {
            tx.publish_tracks(vec![Track::video(1, 2, 2)]).await.unwrap();
            tx.deliver(Some(VideoFrame::solid(1, 600, 2, 2, [0, 0, 0]).into()))
                .await
                .unwrap();
            // Keep the source open
            std::future::pending::<()>().await;
        });

        source.fill(500).await;
        assert!(source.audio_finished());
        assert!(!source.video_finished());
    }

    #[tokio::test]
    async fn test_push_routes_by_kind() {
        let (_tx, rx) = bridge::channel();
        let mut source = SourceBuffers::new(0, rx);

        source.push(AudioFrame::new(2, 0, vec![0; 10]).into());
        source.push(VideoFrame::solid(1, 0, 1, 1, [0, 0, 0]).into());
        source.push(AudioFrame::new(2, 10, vec![0; 10]).into());

        assert_eq!(source.audio_len(), 2);
        assert_eq!(source.video_len(), 1);
        assert_eq!(source.stats.last_audio_tc, Some(10));
    }

    #[tokio::test]
    async fn test_push_drops_malformed_video() {
        let (_tx, rx) = bridge::channel();
        let mut source = SourceBuffers::new(0, rx);

        source.push(VideoFrame::new(1, 0, 4, 4, bytes::Bytes::from_static(&[1, 2, 3])).into());

        assert_eq!(source.video_len(), 0);
        assert_eq!(source.stats.malformed_video_frames, 1);
        assert_eq!(source.stats.video_frames, 1);
    }
}
