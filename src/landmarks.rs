//! Face landmark frames and the iris clusters derived from them.
//!
//! The landmark detector itself is an external collaborator. It is modelled
//! by the [`LandmarkSource`] trait: given a video frame it returns either one
//! [`LandmarkFrame`] (normalized image coordinates in `[0, 1]`) or `None`
//! when no face was found.

use crate::{
    capture::VideoFrame,
    constants::{IRIS_EDGE_COUNT, LEFT_IRIS_INDEX, RIGHT_IRIS_INDEX},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A 2D point in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point2D {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point2D> for [f64; 2] {
    fn from(p: Point2D) -> Self {
        [p.x, p.y]
    }
}

/// Which eye an iris belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EyeSide {
    Left,
    Right,
}

impl EyeSide {
    /// Index of this eye's iris center in the landmark layout
    #[must_use]
    pub const fn center_index(self) -> usize {
        match self {
            Self::Left => LEFT_IRIS_INDEX,
            Self::Right => RIGHT_IRIS_INDEX,
        }
    }
}

/// Iris center plus the four edge points around it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Iris {
    pub center: Point2D,
    pub edges: [Point2D; IRIS_EDGE_COUNT],
}

/// Landmarks for exactly one detected face, tagged with the video timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    points: Vec<Point2D>,
    timestamp_ms: f64,
}

impl LandmarkFrame {
    /// Wrap a landmark set produced by the detector.
    ///
    /// # Errors
    ///
    /// Returns an error if any coordinate is not finite.
    pub fn new(points: Vec<Point2D>, timestamp_ms: f64) -> Result<Self> {
        if let Some(i) = points.iter().position(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(Error::InvalidInput(format!("Landmark {i} has a non-finite coordinate")));
        }
        Ok(Self { points, timestamp_ms })
    }

    #[must_use]
    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    #[must_use]
    pub fn timestamp_ms(&self) -> f64 {
        self.timestamp_ms
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Extract one eye's iris cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is too short to contain the center or
    /// any of its four edge points.
    pub fn iris(&self, side: EyeSide) -> Result<Iris> {
        let center_idx = side.center_index();
        let last_idx = center_idx + IRIS_EDGE_COUNT;
        if last_idx >= self.points.len() {
            return Err(Error::InvalidInput(format!(
                "{side:?} iris needs landmark {last_idx}, frame has {} points",
                self.points.len()
            )));
        }

        let mut edges = [Point2D::new(0.0, 0.0); IRIS_EDGE_COUNT];
        for (i, edge) in edges.iter_mut().enumerate() {
            *edge = self.points[center_idx + 1 + i];
        }

        Ok(Iris {
            center: self.points[center_idx],
            edges,
        })
    }

    /// Both irises, or an error if either is incomplete
    ///
    /// # Errors
    ///
    /// See [`LandmarkFrame::iris`].
    pub fn iris_pair(&self) -> Result<(Iris, Iris)> {
        Ok((self.iris(EyeSide::Left)?, self.iris(EyeSide::Right)?))
    }
}

/// Pretrained landmark model invoked as an opaque black box
pub trait LandmarkSource: Send {
    /// Source name for logging
    fn name(&self) -> &str;

    /// Load the model. Called once on the inference worker before any frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceUnavailable`] if the model cannot be loaded.
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Detect at most one face in `frame`
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails. The scheduler treats this as a
    /// frame without a face.
    fn detect(&mut self, frame: &VideoFrame) -> Result<Option<LandmarkFrame>>;
}

/// One recorded detection in a landmark trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub timestamp_ms: f64,
    #[serde(default)]
    pub landmarks: Option<Vec<Point2D>>,
}

/// A recorded session of detector output, replayable without a camera
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkTrace {
    pub width: u32,
    pub height: u32,
    pub frames: Vec<TraceEntry>,
}

impl LandmarkTrace {
    /// Load a trace from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::IoError(format!("Failed to read trace {}: {e}", path.as_ref().display()))
        })?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Save a trace to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

/// Video timestamps are matched at millisecond resolution
fn trace_key(timestamp_ms: f64) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    let key = timestamp_ms.round() as i64;
    key
}

/// [`LandmarkSource`] that answers from a recorded trace
pub struct ReplaySource {
    detections: HashMap<i64, Option<Vec<Point2D>>>,
}

impl ReplaySource {
    #[must_use]
    pub fn new(trace: &LandmarkTrace) -> Self {
        let detections = trace
            .frames
            .iter()
            .map(|entry| (trace_key(entry.timestamp_ms), entry.landmarks.clone()))
            .collect();
        Self { detections }
    }
}

impl LandmarkSource for ReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    fn detect(&mut self, frame: &VideoFrame) -> Result<Option<LandmarkFrame>> {
        match self.detections.get(&trace_key(frame.timestamp_ms)) {
            Some(Some(points)) => Ok(Some(LandmarkFrame::new(points.clone(), frame.timestamp_ms)?)),
            _ => Ok(None),
        }
    }
}
