//! Video frames and the capture device abstraction.

use crate::{landmarks::LandmarkTrace, Result};
use log::info;

/// One frame handed from the capture device to the inference worker.
///
/// Ownership of the pixel buffer moves into the worker with the request, so
/// the render side never touches an in-flight buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// Presentation timestamp of the frame in milliseconds
    pub timestamp_ms: f64,
    pub width: u32,
    pub height: u32,
    /// Packed RGB pixels; may be empty for sources that replay detections
    pub pixels: Vec<u8>,
}

impl VideoFrame {
    /// Frame without pixel data
    #[must_use]
    pub fn new(timestamp_ms: f64, width: u32, height: u32) -> Self {
        Self {
            timestamp_ms,
            width,
            height,
            pixels: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_pixels(mut self, pixels: Vec<u8>) -> Self {
        self.pixels = pixels;
        self
    }
}

/// A capture device. Frame acquisition and permissions live behind it.
pub trait VideoSource {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Latest available frame, or `None` once the source has ended.
    ///
    /// A stalled device may return the same timestamp repeatedly.
    ///
    /// # Errors
    ///
    /// Returns an error if the device fails.
    fn current_frame(&mut self) -> Result<Option<VideoFrame>>;

    /// Stop the device. Called exactly once on teardown.
    fn release(&mut self) {}
}

/// Replays the timestamps of a recorded landmark trace as video frames
pub struct TraceVideoSource {
    width: u32,
    height: u32,
    timestamps: Vec<f64>,
    cursor: usize,
    released: bool,
}

impl TraceVideoSource {
    #[must_use]
    pub fn new(trace: &LandmarkTrace) -> Self {
        Self {
            width: trace.width,
            height: trace.height,
            timestamps: trace.frames.iter().map(|f| f.timestamp_ms).collect(),
            cursor: 0,
            released: false,
        }
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl VideoSource for TraceVideoSource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn current_frame(&mut self) -> Result<Option<VideoFrame>> {
        if self.released {
            return Ok(None);
        }
        let Some(&timestamp_ms) = self.timestamps.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        Ok(Some(VideoFrame::new(timestamp_ms, self.width, self.height)))
    }

    fn release(&mut self) {
        if !self.released {
            info!("Releasing trace video source after {} frames", self.cursor);
            self.released = true;
        }
    }
}
