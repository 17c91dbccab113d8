//! Decoded media frames
//!
//! Frames carry already-decoded media: packed RGB24 pixels for video and
//! signed PCM amplitudes for audio. Video pixel data is held in `bytes::Bytes`
//! so that keeping a hold frame buffered while also compositing it is only a
//! reference count bump.

use bytes::Bytes;

/// Bytes per packed RGB24 pixel
pub const RGB24_BYTES_PER_PIXEL: usize = 3;

/// Kind of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Video,
    Audio,
}

/// A decoded video picture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Owning track id
    pub track_id: u32,
    /// Timestamp in milliseconds since source start
    pub timecode: i64,
    /// Picture width in pixels
    pub width: u32,
    /// Picture height in pixels
    pub height: u32,
    /// Packed RGB24 rows, top to bottom
    pub data: Bytes,
}

impl VideoFrame {
    pub fn new(track_id: u32, timecode: i64, width: u32, height: u32, data: Bytes) -> Self {
        Self {
            track_id,
            timecode,
            width,
            height,
            data,
        }
    }

    /// Create a frame filled with a single color
    pub fn solid(track_id: u32, timecode: i64, width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * RGB24_BYTES_PER_PIXEL);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self::new(track_id, timecode, width, height, Bytes::from(data))
    }

    /// Expected pixel buffer length for the frame's dimensions
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * RGB24_BYTES_PER_PIXEL
    }

    /// Whether the pixel buffer matches the declared dimensions
    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.expected_len()
    }

    /// RGB value at (x, y), if in bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height || !self.is_well_formed() {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * RGB24_BYTES_PER_PIXEL;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }
}

/// A block of decoded audio samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Owning track id
    pub track_id: u32,
    /// Timestamp in milliseconds since source start
    pub timecode: i64,
    /// Sample amplitudes at the owning track's sample rate
    pub samples: Vec<i32>,
}

impl AudioFrame {
    pub fn new(track_id: u32, timecode: i64, samples: Vec<i32>) -> Self {
        Self {
            track_id,
            timecode,
            samples,
        }
    }

    /// Whether every sample is zero
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0)
    }
}

/// A decoded frame of either kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Video(VideoFrame),
    Audio(AudioFrame),
}

impl Frame {
    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::Video(_) => FrameType::Video,
            Frame::Audio(_) => FrameType::Audio,
        }
    }

    pub fn timecode(&self) -> i64 {
        match self {
            Frame::Video(f) => f.timecode,
            Frame::Audio(f) => f.timecode,
        }
    }

    pub fn track_id(&self) -> u32 {
        match self {
            Frame::Video(f) => f.track_id,
            Frame::Audio(f) => f.track_id,
        }
    }
}

impl From<VideoFrame> for Frame {
    fn from(frame: VideoFrame) -> Self {
        Frame::Video(frame)
    }
}

impl From<AudioFrame> for Frame {
    fn from(frame: AudioFrame) -> Self {
        Frame::Audio(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_video_frame() {
        let frame = VideoFrame::solid(1, 40, 4, 2, [10, 20, 30]);

        assert!(frame.is_well_formed());
        assert_eq!(frame.data.len(), 4 * 2 * 3);
        assert_eq!(frame.pixel(3, 1), Some([10, 20, 30]));
        assert_eq!(frame.pixel(4, 0), None);
    }

    #[test]
    fn test_malformed_video_frame() {
        let frame = VideoFrame::new(1, 0, 4, 4, Bytes::from_static(&[0, 0, 0]));

        assert!(!frame.is_well_formed());
        assert_eq!(frame.pixel(0, 0), None);
    }

    #[test]
    fn test_audio_silence() {
        let frame = AudioFrame::new(2, 0, vec![0; 480]);
        assert!(frame.is_silent());

        let frame = AudioFrame::new(2, 0, vec![0, 0, -1]);
        assert!(!frame.is_silent());
    }

    #[test]
    fn test_frame_accessors() {
        let frame: Frame = AudioFrame::new(7, 120, vec![1, 2]).into();

        assert_eq!(frame.frame_type(), FrameType::Audio);
        assert_eq!(frame.timecode(), 120);
        assert_eq!(frame.track_id(), 7);
    }
}
