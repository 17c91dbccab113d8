//! Single-slot frame handoff between a decode source and the merge engine
//!
//! Each source gets one bridge. The producer side may live on a plain OS
//! thread (`blocking_*` methods) or in a tokio task (async methods); the
//! consumer side is owned by the merge engine.
//!
//! # Slot protocol
//!
//! ```text
//!   FrameSender                                   FrameReceiver
//!   ───────────                                   ─────────────
//!   wait slot token ◄────── slot_free (cap 1) ◄─── next() returns token
//!        │
//!        └── send item ───► data (cap 1) ────────► has_next() fills slot
//! ```
//!
//! The producer must hold the single slot token before it sends, and the
//! consumer only hands the token back once it has taken the item out of the
//! slot. At most one item is ever in flight, and items arrive in the order
//! they were delivered.
//!
//! Track descriptors travel through the same slot ahead of the first frame,
//! so a receiver always knows its source's tracks before it sees a frame.

use tokio::sync::mpsc;

use crate::error::BridgeError;
use crate::media::{Frame, Track};

/// Item carried through the bridge
#[derive(Debug)]
enum Message {
    Tracks(Vec<Track>),
    Frame(Frame),
    End,
}

/// Observable state of a bridge slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// No item held; the producer may deliver
    Empty,
    /// A frame is held and waiting for `next()`
    Filled,
    /// The source has ended; terminal
    Closed,
}

/// Create a connected sender/receiver pair
pub fn channel() -> (FrameSender, FrameReceiver) {
    let (data_tx, data_rx) = mpsc::channel(1);
    let (slot_tx, slot_rx) = mpsc::channel(1);

    // The slot starts out free.
    let _ = slot_tx.try_send(());

    let sender = FrameSender {
        data: data_tx,
        slot_free: slot_rx,
        tracks_published: false,
        frames_sent: false,
        ended: false,
    };
    let receiver = FrameReceiver {
        data: data_rx,
        slot_free: slot_tx,
        slot: None,
        closed: false,
        tracks: Vec::new(),
        received: 0,
    };

    (sender, receiver)
}

/// Producer half of a bridge
///
/// Dropping the sender closes the bridge just like delivering the end
/// sentinel.
#[derive(Debug)]
pub struct FrameSender {
    data: mpsc::Sender<Message>,
    slot_free: mpsc::Receiver<()>,
    tracks_published: bool,
    frames_sent: bool,
    ended: bool,
}

impl FrameSender {
    /// Publish the source's track list. Must happen once, before any frame.
    pub async fn publish_tracks(&mut self, tracks: Vec<Track>) -> Result<(), BridgeError> {
        self.check_tracks()?;
        self.send_in_slot(Message::Tracks(tracks)).await?;
        self.tracks_published = true;
        Ok(())
    }

    /// Blocking variant of [`publish_tracks`](Self::publish_tracks) for producer threads.
    ///
    /// Panics if called from within an async runtime.
    pub fn blocking_publish_tracks(&mut self, tracks: Vec<Track>) -> Result<(), BridgeError> {
        self.check_tracks()?;
        self.blocking_acquire_slot()?;
        self.blocking_send(Message::Tracks(tracks))?;
        self.tracks_published = true;
        Ok(())
    }

    /// Deliver a frame, or the end sentinel when `frame` is `None`.
    ///
    /// Waits until the previously delivered item has been consumed.
    ///
    /// # Cancel safety
    ///
    /// Dropping the future before it completes delivers nothing and leaves
    /// the bridge as it was; the same item can be delivered again.
    pub async fn deliver(&mut self, frame: Option<Frame>) -> Result<(), BridgeError> {
        let message = self.prepare(frame)?;
        let ends = matches!(message, Message::End);
        self.send_in_slot(message).await?;
        self.record_sent(ends);
        Ok(())
    }

    /// Blocking variant of [`deliver`](Self::deliver) for producer threads.
    ///
    /// Panics if called from within an async runtime.
    pub fn blocking_deliver(&mut self, frame: Option<Frame>) -> Result<(), BridgeError> {
        let message = self.prepare(frame)?;
        let ends = matches!(message, Message::End);
        self.blocking_acquire_slot()?;
        self.blocking_send(message)?;
        self.record_sent(ends);
        Ok(())
    }

    fn check_tracks(&self) -> Result<(), BridgeError> {
        if self.ended {
            return Err(BridgeError::AlreadyEnded);
        }
        if self.tracks_published || self.frames_sent {
            return Err(BridgeError::TracksAlreadyPublished);
        }
        Ok(())
    }

    fn prepare(&self, frame: Option<Frame>) -> Result<Message, BridgeError> {
        if self.ended {
            return Err(BridgeError::AlreadyEnded);
        }
        Ok(frame.map_or(Message::End, Message::Frame))
    }

    fn record_sent(&mut self, ends: bool) {
        if ends {
            self.ended = true;
        } else {
            self.frames_sent = true;
        }
    }

    /// Wait for the slot and hand `message` over
    ///
    /// Channel capacity is reserved before the slot token is taken, and the
    /// send itself cannot wait, so the token is never held across an await.
    async fn send_in_slot(&mut self, message: Message) -> Result<(), BridgeError> {
        let permit = self
            .data
            .reserve()
            .await
            .map_err(|_| BridgeError::ReceiverDropped)?;
        self.slot_free
            .recv()
            .await
            .ok_or(BridgeError::ReceiverDropped)?;
        permit.send(message);
        Ok(())
    }

    fn blocking_acquire_slot(&mut self) -> Result<(), BridgeError> {
        self.slot_free
            .blocking_recv()
            .ok_or(BridgeError::ReceiverDropped)
    }

    fn blocking_send(&self, message: Message) -> Result<(), BridgeError> {
        self.data
            .blocking_send(message)
            .map_err(|_| BridgeError::ReceiverDropped)
    }
}

/// Consumer half of a bridge, owned by the merge engine
#[derive(Debug)]
pub struct FrameReceiver {
    data: mpsc::Receiver<Message>,
    slot_free: mpsc::Sender<()>,
    slot: Option<Frame>,
    closed: bool,
    tracks: Vec<Track>,
    received: u64,
}

impl FrameReceiver {
    /// Wait until a frame is available or the source has ended.
    ///
    /// Returns `true` if `next()` will yield a frame, `false` once the end
    /// sentinel has been observed. After `false` it never waits again.
    pub async fn has_next(&mut self) -> bool {
        loop {
            if self.slot.is_some() {
                return true;
            }
            if self.closed {
                return false;
            }

            match self.data.recv().await {
                Some(Message::Frame(frame)) => {
                    self.received += 1;
                    self.slot = Some(frame);
                }
                Some(Message::Tracks(tracks)) => {
                    tracing::debug!(tracks = tracks.len(), "Source tracks published");
                    self.tracks = tracks;
                    self.release_slot();
                }
                Some(Message::End) | None => {
                    tracing::debug!(frames = self.received, "Source ended");
                    self.closed = true;
                    self.data.close();
                }
            }
        }
    }

    /// Take the held frame and free the slot for the producer.
    ///
    /// Returns `None` if no frame is held; call `has_next()` first.
    pub fn next(&mut self) -> Option<Frame> {
        let frame = self.slot.take()?;
        self.release_slot();
        Some(frame)
    }

    /// Current slot state
    pub fn state(&self) -> BridgeState {
        if self.slot.is_some() {
            BridgeState::Filled
        } else if self.closed {
            BridgeState::Closed
        } else {
            BridgeState::Empty
        }
    }

    /// Whether the end sentinel has been observed
    pub fn is_closed(&self) -> bool {
        self.closed && self.slot.is_none()
    }

    /// Tracks published by the source (empty until published)
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Look up a published track by id
    pub fn track(&self, id: u32) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Number of frames received so far
    pub fn frames_received(&self) -> u64 {
        self.received
    }

    fn release_slot(&self) {
        // The producer took the only token before sending, so there is room.
        let _ = self.slot_free.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::media::{AudioFrame, VideoFrame};

    fn video(timecode: i64) -> Frame {
        VideoFrame::solid(1, timecode, 2, 2, [0, 0, 0]).into()
    }

    #[tokio::test]
    async fn test_in_order_no_loss() {
        let (mut tx, mut rx) = channel();

        let producer = tokio::spawn(async move {
            for tc in 0..50 {
                tx.deliver(Some(video(tc * 40))).await.unwrap();
            }
            tx.deliver(None).await.unwrap();
        });

        let mut seen = Vec::new();
        while rx.has_next().await {
            assert_eq!(rx.state(), BridgeState::Filled);
            seen.push(rx.next().unwrap().timecode());
            assert_ne!(rx.state(), BridgeState::Filled);
        }
        producer.await.unwrap();

        let expected: Vec<i64> = (0..50).map(|tc| tc * 40).collect();
        assert_eq!(seen, expected);
        assert_eq!(rx.state(), BridgeState::Closed);
        assert_eq!(rx.frames_received(), 50);
    }

    #[tokio::test]
    async fn test_single_slot_backpressure() {
        let (mut tx, mut rx) = channel();

        tx.deliver(Some(video(0))).await.unwrap();

        // Second delivery must wait until the first item is taken.
        let blocked = tokio::time::timeout(Duration::from_millis(50), tx.deliver(Some(video(40))));
        assert!(blocked.await.is_err());

        assert!(rx.has_next().await);
        assert_eq!(rx.next().unwrap().timecode(), 0);

        tokio::time::timeout(Duration::from_millis(500), tx.deliver(Some(video(80))))
            .await
            .expect("slot should be free")
            .unwrap();
        assert!(rx.has_next().await);
        assert_eq!(rx.next().unwrap().timecode(), 80);
    }

    #[test]
    fn test_deliver_wakes_when_slot_freed() {
        use tokio_test::{assert_pending, assert_ready_eq, assert_ready_ok, task};

        let (mut tx, mut rx) = channel();
        {
            let mut first = task::spawn(tx.deliver(Some(video(0))));
            assert_ready_ok!(first.poll());
        }

        let mut second = task::spawn(tx.deliver(Some(video(40))));
        assert_pending!(second.poll());

        {
            let mut has_next = task::spawn(rx.has_next());
            assert_ready_eq!(has_next.poll(), true);
        }
        assert_eq!(rx.next().map(|f| f.timecode()), Some(0));

        assert!(second.is_woken());
        assert_ready_ok!(second.poll());
    }

    #[test]
    fn test_abandoned_deliver_leaves_bridge_usable() {
        use tokio_test::{assert_pending, assert_ready_eq, assert_ready_ok, task};

        let (mut tx, mut rx) = channel();
        {
            let mut first = task::spawn(tx.deliver(Some(video(0))));
            assert_ready_ok!(first.poll());
        }
        {
            // Slot still full, so the end sentinel waits and is then given up
            let mut end = task::spawn(tx.deliver(None));
            assert_pending!(end.poll());
        }

        {
            let mut has_next = task::spawn(rx.has_next());
            assert_ready_eq!(has_next.poll(), true);
        }
        assert_eq!(rx.next().map(|f| f.timecode()), Some(0));

        {
            let mut second = task::spawn(tx.deliver(Some(video(40))));
            assert_ready_ok!(second.poll());
        }
        {
            let mut has_next = task::spawn(rx.has_next());
            assert_ready_eq!(has_next.poll(), true);
        }
        assert_eq!(rx.next().map(|f| f.timecode()), Some(40));
        assert_eq!(rx.state(), BridgeState::Empty);
    }

    #[tokio::test]
    async fn test_next_without_item() {
        let (_tx, mut rx) = channel();

        assert_eq!(rx.state(), BridgeState::Empty);
        assert!(rx.next().is_none());
    }

    #[tokio::test]
    async fn test_tracks_arrive_before_frames() {
        let (mut tx, mut rx) = channel();

        let producer = tokio::spawn(async move {
            tx.publish_tracks(vec![Track::audio(5, 1, 48000)]).await.unwrap();
            tx.deliver(Some(AudioFrame::new(5, 0, vec![1; 480]).into()))
                .await
                .unwrap();
            assert_eq!(
                tx.publish_tracks(vec![]).await,
                Err(BridgeError::TracksAlreadyPublished)
            );
            tx.deliver(None).await.unwrap();
            assert_eq!(tx.deliver(None).await, Err(BridgeError::AlreadyEnded));
        });

        assert!(rx.has_next().await);
        assert_eq!(rx.track(5).and_then(|t| t.sample_rate()), Some(48000));
        assert!(rx.next().is_some());
        assert!(!rx.has_next().await);
        assert!(rx.is_closed());

        producer.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_sender_closes() {
        let (tx, mut rx) = channel();
        drop(tx);

        assert!(!rx.has_next().await);
        assert_eq!(rx.state(), BridgeState::Closed);
        // Terminal: asking again does not wait
        assert!(!rx.has_next().await);
    }

    #[test]
    fn test_blocking_producer_thread() {
        let (mut tx, mut rx) = channel();

        let producer = std::thread::spawn(move || {
            tx.blocking_publish_tracks(vec![Track::video(1, 2, 2)]).unwrap();
            for tc in 0..10 {
                tx.blocking_deliver(Some(video(tc))).unwrap();
            }
            tx.blocking_deliver(None).unwrap();
        });

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let seen = runtime.block_on(async move {
            let mut seen = Vec::new();
            while rx.has_next().await {
                seen.push(rx.next().unwrap().timecode());
            }
            seen
        });

        producer.join().unwrap();
        assert_eq!(seen, (0..10).collect::<Vec<i64>>());
    }

    #[test]
    fn test_receiver_dropped() {
        let (mut tx, rx) = channel();
        drop(rx);

        assert_eq!(
            tx.blocking_deliver(Some(video(0))),
            Err(BridgeError::ReceiverDropped)
        );
    }
}
