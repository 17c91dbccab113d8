//! Audio mixing and resampling
//!
//! Each tick produces one fixed-size mono frame on the audio clock. Source
//! frames are downmixed to mono, resampled to the output rate and summed in
//! at their offset relative to the output frame. Positions are counted in
//! output samples; milliseconds only appear in emitted timecodes.
//!
//! ```text
//! output frame      |<------------ frame_samples ------------>|
//!                   due                                       end
//! source frame A  |======|                                     offset > 0, head clipped
//! source frame B           |=========|                         offset < 0
//! source frame C                                   |===========|===|  kept for next tick
//! ```
//!
//! Samples are summed, not averaged, and saturate at the `i32` range. There
//! is no limiter.

use crate::media::{AudioFrame, TrackKind};

use super::buffer::SourceBuffers;

/// Resample `samples` from `from_rate` to `to_rate` by linear interpolation
///
/// Equal rates return the input unchanged. The output length is the input
/// length scaled by the rate ratio, rounded to the nearest sample.
pub fn resample(samples: &[i32], from_rate: u32, to_rate: u32) -> Vec<i32> {
    if from_rate == to_rate || from_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let len = samples.len();
    let out_len = resampled_len(len, from_rate, to_rate);
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let position = len as f64 * i as f64 / out_len as f64;
        let left = position.floor() as usize;
        let right = (position.ceil() as usize).min(len - 1);
        let right_weight = position - left as f64;
        let left_weight = 1.0 - right_weight;

        let value = samples[left] as f64 * left_weight + samples[right] as f64 * right_weight;
        out.push(value.round() as i32);
    }

    out
}

/// Length of `len` samples after resampling from `from_rate` to `to_rate`
fn resampled_len(len: usize, from_rate: u32, to_rate: u32) -> usize {
    if from_rate == to_rate || from_rate == 0 {
        return len;
    }
    ((len as u64 * to_rate as u64 + from_rate as u64 / 2) / from_rate as u64) as usize
}

/// Average interleaved channels down to one
pub fn downmix(samples: &[i32], channels: u16) -> Vec<i32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels as usize)
        .map(|frame| {
            let sum: i64 = frame.iter().map(|&s| s as i64).sum();
            (sum / frame.len() as i64) as i32
        })
        .collect()
}

/// Produces mixed mono frames on the audio clock
#[derive(Debug)]
pub struct AudioMixer {
    track_id: u32,
    sample_rate: u32,
    frame_samples: usize,
    samples_emitted: u64,
}

impl AudioMixer {
    pub fn new(track_id: u32, sample_rate: u32, frame_samples: usize) -> Self {
        Self {
            track_id,
            sample_rate,
            frame_samples,
            samples_emitted: 0,
        }
    }

    /// Timecode of the next audio frame to produce
    pub fn next_due(&self) -> i64 {
        (self.samples_emitted * 1000 / self.sample_rate as u64) as i64
    }

    /// Output sample position of a source timecode
    fn position_of(&self, timecode: i64) -> i64 {
        timecode * self.sample_rate as i64 / 1000
    }

    /// Mix the frame due at `next_due()`
    ///
    /// Always produces a frame. Returns it together with the number of
    /// sources that contributed samples.
    pub fn mix(&mut self, sources: &mut [SourceBuffers]) -> (AudioFrame, usize) {
        let due = self.next_due();
        let start = self.samples_emitted as i64;
        let end = start + self.frame_samples as i64;
        let mut out = vec![0i32; self.frame_samples];
        let mut contributors = 0;

        for source in sources.iter_mut() {
            let Some(buffer) = source.audio.as_mut() else {
                continue;
            };
            let mut contributed = false;

            while let Some(frame) = buffer.pop_front() {
                let track = source.bridge.track(frame.track_id).copied();
                let (channels, rate) = match track.map(|t| t.kind) {
                    Some(TrackKind::Audio {
                        channels,
                        sample_rate,
                    }) if sample_rate > 0 => (channels.max(1), sample_rate),
                    _ => {
                        source.stats.unknown_track_frames += 1;
                        tracing::warn!(
                            source = source.index,
                            track_id = frame.track_id,
                            timecode = frame.timecode,
                            "Dropping audio frame for unknown track"
                        );
                        continue;
                    }
                };

                let mono_len = frame.samples.len() / channels as usize;
                let frame_start = self.position_of(frame.timecode);
                let frame_end = frame_start + resampled_len(mono_len, rate, self.sample_rate) as i64;

                if frame_end <= start {
                    source.stats.stale_audio_frames += 1;
                    tracing::debug!(
                        source = source.index,
                        timecode = frame.timecode,
                        due = due,
                        "Dropping stale audio frame"
                    );
                    continue;
                }

                let mono = downmix(&frame.samples, channels);
                let resampled = resample(&mono, rate, self.sample_rate);

                contributed |= add_at_offset(&mut out, &resampled, start - frame_start);

                if frame_end > end {
                    buffer.push_front(frame);
                    break;
                }
            }

            if contributed {
                contributors += 1;
            }
        }

        let frame = AudioFrame::new(self.track_id, due, out);
        self.samples_emitted += self.frame_samples as u64;

        tracing::trace!(
            timecode = due,
            contributors = contributors,
            "Mixed audio frame"
        );

        (frame, contributors)
    }
}

/// Sum `samples` into `out`, where `samples[offset]` lines up with `out[0]`
///
/// Returns whether any sample overlapped the output.
fn add_at_offset(out: &mut [i32], samples: &[i32], offset: i64) -> bool {
    let mut overlapped = false;

    for (j, slot) in out.iter_mut().enumerate() {
        let src = j as i64 + offset;
        if src < 0 {
            continue;
        }
        let Some(&sample) = samples.get(src as usize) else {
            break;
        };
        *slot = slot.saturating_add(sample);
        overlapped = true;
    }

    overlapped
}
