//! Tracking session: the only owner of mutable tracking state.
//!
//! A [`TrackingSession`] lives on the inference side and is the single
//! writer of eye position, smoothed distances and the face-hidden counter.
//! Every processed detection produces a fresh immutable
//! [`TrackingSnapshot`] that is swapped in as a whole, so the render side,
//! holding a [`TrackingHandle`], never sees a half-applied update.

use crate::{
    constants::DEFAULT_LOST_THRESHOLD,
    estimation::{EyePosition, GeometricEstimator, Orientation},
    filters::{EyeDistanceSmoother, SmoothedDistance},
    landmarks::LandmarkFrame,
};
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Detection continuity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingStatus {
    /// No frame has been processed yet
    Initializing,
    /// The last processed frame contained a face
    Tracking,
    /// The last processed frame had no face
    Lost,
    /// The landmark source failed to start; parallax is disabled for good
    Unavailable,
}

/// Immutable view of the tracking state after one processed frame
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSnapshot {
    /// Latest eye position, `None` until the first successful estimate
    pub eye_position: Option<EyePosition>,
    pub smoothed_distance: Option<SmoothedDistance>,
    /// Consecutive processed frames without a face
    pub frames_face_hidden: u32,
    pub status: TrackingStatus,
    pub lost_threshold: u32,
    /// Video timestamp of the last processed frame
    pub last_frame_ms: Option<f64>,
    /// Number of frames processed so far
    pub sequence: u64,
}

impl TrackingSnapshot {
    #[must_use]
    pub fn initial(lost_threshold: u32) -> Self {
        Self {
            eye_position: None,
            smoothed_distance: None,
            frames_face_hidden: 0,
            status: TrackingStatus::Initializing,
            lost_threshold,
            last_frame_ms: None,
            sequence: 0,
        }
    }

    /// The user-visible "can't find user" signal.
    ///
    /// Raised only once the counter exceeds the threshold, so single
    /// dropped detections do not flicker it on.
    #[must_use]
    pub fn is_face_hidden(&self) -> bool {
        self.frames_face_hidden > self.lost_threshold
    }

    /// Eye position to drive parallax with, if tracking is usable at all
    #[must_use]
    pub fn parallax_eye(&self) -> Option<&EyePosition> {
        match self.status {
            TrackingStatus::Unavailable => None,
            _ => self.eye_position.as_ref(),
        }
    }
}

/// Read side of a session, shared with the render loop
#[derive(Clone)]
pub struct TrackingHandle {
    snapshot: Arc<RwLock<Arc<TrackingSnapshot>>>,
    portrait: Arc<AtomicBool>,
}

impl TrackingHandle {
    /// Most recently published snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<TrackingSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Orientation used for the vertical bias of subsequent estimates
    pub fn set_orientation(&self, orientation: Orientation) {
        self.portrait
            .store(orientation == Orientation::Portrait, Ordering::Relaxed);
    }

    #[must_use]
    pub fn orientation(&self) -> Orientation {
        if self.portrait.load(Ordering::Relaxed) {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

/// Write side: estimator, smoother and the working state
pub struct TrackingSession {
    estimator: GeometricEstimator,
    smoother: EyeDistanceSmoother,
    current: TrackingSnapshot,
    handle: TrackingHandle,
}

impl TrackingSession {
    #[must_use]
    pub fn new(estimator: GeometricEstimator, smoother: EyeDistanceSmoother, lost_threshold: u32) -> Self {
        let current = TrackingSnapshot::initial(lost_threshold);
        let handle = TrackingHandle {
            snapshot: Arc::new(RwLock::new(Arc::new(current.clone()))),
            portrait: Arc::new(AtomicBool::new(false)),
        };
        Self {
            estimator,
            smoother,
            current,
            handle,
        }
    }

    /// Session with the default smoother and lost threshold
    #[must_use]
    pub fn with_defaults(estimator: GeometricEstimator) -> Self {
        Self::new(estimator, EyeDistanceSmoother::default(), DEFAULT_LOST_THRESHOLD)
    }

    #[must_use]
    pub fn handle(&self) -> TrackingHandle {
        self.handle.clone()
    }

    #[must_use]
    pub fn estimator(&self) -> &GeometricEstimator {
        &self.estimator
    }

    /// Apply the detection result for the video frame at `timestamp_ms`
    /// and publish the new snapshot.
    ///
    /// `None` means the detector found no face in the frame. The smoothing
    /// clock advances on every processed frame, face or not, so a reacquired
    /// face decays over the last frame gap only.
    pub fn process(&mut self, timestamp_ms: f64, detection: Option<&LandmarkFrame>) -> Arc<TrackingSnapshot> {
        if self.current.status == TrackingStatus::Unavailable {
            return self.handle.snapshot();
        }

        let mut next = self.current.clone();
        next.sequence += 1;
        next.last_frame_ms = Some(timestamp_ms);

        let irises = detection.and_then(|frame| match frame.iris_pair() {
            Ok(pair) => Some(pair),
            Err(e) => {
                warn!("Discarding landmark frame at {timestamp_ms} ms: {e}");
                None
            }
        });

        match irises {
            Some((left, right)) => {
                if next.status == TrackingStatus::Lost {
                    info!(
                        "Face reacquired after {} hidden frames",
                        next.frames_face_hidden
                    );
                }
                next.status = TrackingStatus::Tracking;
                next.frames_face_hidden = 0;

                let left_cm = self.estimator.iris_distance_cm(&left);
                let right_cm = self.estimator.iris_distance_cm(&right);
                if let Some(smoothed) = self.smoother.update(left_cm, right_cm, timestamp_ms) {
                    next.smoothed_distance = Some(smoothed);
                    next.eye_position = Some(self.estimator.eye_position(
                        &left,
                        &right,
                        smoothed.left_cm,
                        smoothed.right_cm,
                        self.handle.orientation(),
                    ));
                }
            }
            None => {
                self.smoother.advance_clock(timestamp_ms);
                next.frames_face_hidden = next.frames_face_hidden.saturating_add(1);
                if next.status != TrackingStatus::Lost {
                    debug!("Face lost");
                }
                next.status = TrackingStatus::Lost;
                if next.is_face_hidden() && !self.current.is_face_hidden() {
                    info!("No face for {} frames", next.frames_face_hidden);
                }
            }
        }

        self.publish(next)
    }

    /// Enter the terminal state after the landmark source failed to start
    pub fn mark_unavailable(&mut self, reason: &str) -> Arc<TrackingSnapshot> {
        warn!("Tracking unavailable, falling back to a static camera: {reason}");
        let mut next = self.current.clone();
        next.status = TrackingStatus::Unavailable;
        self.publish(next)
    }

    fn publish(&mut self, next: TrackingSnapshot) -> Arc<TrackingSnapshot> {
        let published = Arc::new(next.clone());
        self.current = next;
        *self.handle.snapshot.write() = Arc::clone(&published);
        published
    }
}
