//! Mosaic merge demo with synthetic sources
//!
//! Run with: cargo run --example mosaic_demo [SOURCES] [SECONDS]
//!
//! Examples:
//!   cargo run --example mosaic_demo            # 4 sources, 5 seconds
//!   cargo run --example mosaic_demo 7 2        # 7 sources, 2 seconds
//!
//! Each source runs on its own OS thread and produces solid-colour video at a
//! different frame rate plus a sine tone at a different sample rate. Odd
//! sources have no audio track. Set `RUST_LOG=mosaic_rs=debug` to see the
//! scheduler's decisions.

use std::f64::consts::PI;
use std::thread;

use mosaic_rs::bridge::{self, FrameSender};
use mosaic_rs::media::{AudioFrame, Track, VideoFrame};
use mosaic_rs::{MergeEngine, MuxConfig, MuxSink};

const SOURCE_WIDTH: u32 = 640;
const SOURCE_HEIGHT: u32 = 360;

/// Sink that only counts and logs what it receives
#[derive(Default)]
struct SummarySink {
    video_frames: u64,
    audio_frames: u64,
    peak_amplitude: i32,
}

impl MuxSink for SummarySink {
    fn on_tracks(&mut self, tracks: &[Track]) {
        for track in tracks {
            tracing::info!(track = %track, "Output track");
        }
    }

    fn on_video(&mut self, frame: VideoFrame) {
        self.video_frames += 1;
        if self.video_frames % 25 == 0 {
            tracing::info!(
                timecode = frame.timecode,
                bytes = frame.data.len(),
                "Video frame"
            );
        }
    }

    fn on_audio(&mut self, frame: AudioFrame) {
        self.audio_frames += 1;
        let peak = frame.samples.iter().map(|s| s.saturating_abs()).max();
        self.peak_amplitude = self.peak_amplitude.max(peak.unwrap_or(0));
    }
}

fn run_source(index: usize, seconds: i64, mut tx: FrameSender) {
    let fps = [25, 30, 24, 50][index % 4] as i64;
    let sample_rate = [44100, 48000, 32000, 22050][index % 4];
    let has_audio = index % 2 == 0;
    let color = [(index * 60 % 256) as u8, (index * 110 % 256) as u8, 200];

    let mut tracks = vec![Track::video(1, SOURCE_WIDTH, SOURCE_HEIGHT)];
    if has_audio {
        tracks.push(Track::audio(2, 1, sample_rate));
    }
    if tx.blocking_publish_tracks(tracks).is_err() {
        return;
    }

    let audio_chunk = sample_rate as usize / 50; // 20 ms
    let tone = 220.0 * (index + 1) as f64;
    let mut audio_tc = 0i64;
    let mut sample_pos = 0usize;

    for n in 0..seconds * fps {
        let video_tc = n * 1000 / fps;

        // Audio up to the picture's timecode goes first to keep timecodes ordered
        while has_audio && audio_tc <= video_tc {
            let samples = (0..audio_chunk)
                .map(|i| {
                    let t = (sample_pos + i) as f64 / sample_rate as f64;
                    ((2.0 * PI * tone * t).sin() * 4000.0) as i32
                })
                .collect();
            sample_pos += audio_chunk;
            let frame = AudioFrame::new(2, audio_tc, samples);
            if tx.blocking_deliver(Some(frame.into())).is_err() {
                return;
            }
            audio_tc += 20;
        }

        let frame = VideoFrame::solid(1, video_tc, SOURCE_WIDTH, SOURCE_HEIGHT, color);
        if tx.blocking_deliver(Some(frame.into())).is_err() {
            return;
        }
    }

    let _ = tx.blocking_deliver(None);
}

#[tokio::main]
async fn main() -> mosaic_rs::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mosaic_rs=info,mosaic_demo=info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let sources: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(4);
    let seconds: i64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(5);

    let mut receivers = Vec::with_capacity(sources);
    let mut producers = Vec::with_capacity(sources);
    for index in 0..sources {
        let (tx, rx) = bridge::channel();
        receivers.push(rx);
        producers.push(
            thread::Builder::new()
                .name(format!("source-{}", index))
                .spawn(move || run_source(index, seconds, tx))
                .expect("failed to spawn source thread"),
        );
    }

    let mut engine = MergeEngine::new(MuxConfig::default(), receivers)?;
    let mut sink = SummarySink::default();
    let stats = engine.run(&mut sink).await;

    for producer in producers {
        let _ = producer.join();
    }

    println!(
        "video frames: {}, audio frames: {}, total: {}, skips: {}, dropped: {}, sources ended: {}, peak: {}",
        sink.video_frames,
        sink.audio_frames,
        stats.frames_out(),
        stats.skips,
        stats.frames_dropped(),
        stats.sources_exhausted(),
        sink.peak_amplitude
    );

    Ok(())
}
