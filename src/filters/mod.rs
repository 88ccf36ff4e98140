//! Temporal smoothing of per-eye distance estimates.
//!
//! Raw iris distances jitter by several centimeters from frame to frame.
//! Each eye gets its own [`DistanceFilter`]; [`EyeDistanceSmoother`] drives
//! both from the timestamps of successive detections.

/// Time-aware exponential decay toward the latest estimate
pub mod time_decay;

use crate::{constants::DEFAULT_DECAY_BASE, Result};

/// Trait for all distance filters
pub trait DistanceFilter: Send + Sync {
    /// Feed a new target observed `dt_ms` after the previous one and return
    /// the smoothed value
    fn apply(&mut self, target: f64, dt_ms: f64) -> f64;

    /// Current smoothed value, `None` before the first sample
    fn value(&self) -> Option<f64>;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// No-op filter that passes through values unchanged
#[derive(Default)]
pub struct NoFilter {
    last: Option<f64>,
}

impl DistanceFilter for NoFilter {
    fn apply(&mut self, target: f64, _dt_ms: f64) -> f64 {
        self.last = Some(target);
        target
    }

    fn value(&self) -> Option<f64> {
        self.last
    }

    fn reset(&mut self) {
        self.last = None;
    }

    fn name(&self) -> &str {
        "NoFilter"
    }
}

/// Create a distance filter by type name
///
/// # Errors
///
/// Returns an error for an unknown filter type or a decay base outside (0, 1).
pub fn create_filter(filter_type: &str, decay_base: f64) -> Result<Box<dyn DistanceFilter>> {
    match filter_type.to_lowercase().as_str() {
        "none" | "nofilter" => Ok(Box::new(NoFilter::default())),
        "time_decay" | "timedecay" | "decay" => {
            if !(decay_base > 0.0 && decay_base < 1.0) {
                return Err(crate::Error::ConfigError(format!(
                    "Decay base must be in (0, 1), got {decay_base}"
                )));
            }
            Ok(Box::new(time_decay::TimeDecayFilter::new(decay_base)))
        }
        _ => Err(crate::Error::ConfigError(format!("Unknown filter type: {filter_type}"))),
    }
}

/// Smoothed left/right distances in centimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedDistance {
    pub left_cm: f64,
    pub right_cm: f64,
}

impl SmoothedDistance {
    /// The closer eye's distance
    #[must_use]
    pub fn min_cm(&self) -> f64 {
        self.left_cm.min(self.right_cm)
    }
}

/// Per-eye smoothing state for one tracking session
pub struct EyeDistanceSmoother {
    left: Box<dyn DistanceFilter>,
    right: Box<dyn DistanceFilter>,
    last_timestamp_ms: Option<f64>,
}

impl Default for EyeDistanceSmoother {
    fn default() -> Self {
        Self::new(
            Box::new(time_decay::TimeDecayFilter::new(DEFAULT_DECAY_BASE)),
            Box::new(time_decay::TimeDecayFilter::new(DEFAULT_DECAY_BASE)),
        )
    }
}

impl EyeDistanceSmoother {
    #[must_use]
    pub fn new(left: Box<dyn DistanceFilter>, right: Box<dyn DistanceFilter>) -> Self {
        Self {
            left,
            right,
            last_timestamp_ms: None,
        }
    }

    /// Smoother whose eyes both use `filter_type`
    ///
    /// # Errors
    ///
    /// See [`create_filter`].
    pub fn from_kind(filter_type: &str, decay_base: f64) -> Result<Self> {
        Ok(Self::new(
            create_filter(filter_type, decay_base)?,
            create_filter(filter_type, decay_base)?,
        ))
    }

    /// Feed the raw distances of one detection.
    ///
    /// An eye whose raw estimate is `None` keeps its previous value. Returns
    /// `None` until both eyes have been observed at least once.
    pub fn update(
        &mut self,
        left_target: Option<f64>,
        right_target: Option<f64>,
        timestamp_ms: f64,
    ) -> Option<SmoothedDistance> {
        let dt_ms = self.last_timestamp_ms.map_or(0.0, |last| timestamp_ms - last);
        self.last_timestamp_ms = Some(timestamp_ms);

        if let Some(target) = left_target {
            self.left.apply(target, dt_ms);
        }
        if let Some(target) = right_target {
            self.right.apply(target, dt_ms);
        }

        self.current()
    }

    /// Record a processed frame without a distance for either eye.
    ///
    /// Smoothed values are left as they are; the next update decays over
    /// the gap from this timestamp.
    pub fn advance_clock(&mut self, timestamp_ms: f64) {
        self.last_timestamp_ms = Some(timestamp_ms);
    }

    #[must_use]
    pub fn current(&self) -> Option<SmoothedDistance> {
        Some(SmoothedDistance {
            left_cm: self.left.value()?,
            right_cm: self.right.value()?,
        })
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.last_timestamp_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filter() {
        let mut filter = NoFilter::default();
        assert_eq!(filter.value(), None);
        assert_eq!(filter.apply(42.0, 16.0), 42.0);
        assert_eq!(filter.apply(40.0, 16.0), 40.0);
        filter.reset();
        assert_eq!(filter.value(), None);
    }

    #[test]
    fn test_create_filter() {
        assert!(create_filter("none", 0.99).is_ok());
        assert!(create_filter("time_decay", 0.99).is_ok());
        assert!(create_filter("time_decay", 1.0).is_err());
        assert!(create_filter("time_decay", 0.0).is_err());
        assert!(create_filter("kalman", 0.99).is_err());
    }

    #[test]
    fn test_smoother_waits_for_both_eyes() {
        let mut smoother = EyeDistanceSmoother::default();
        assert!(smoother.update(Some(50.0), None, 0.0).is_none());

        let d = smoother.update(None, Some(48.0), 16.0).unwrap();
        assert_eq!(d.left_cm, 50.0);
        assert_eq!(d.right_cm, 48.0);
        assert_eq!(d.min_cm(), 48.0);
    }

    #[test]
    fn test_smoother_first_sample_is_exact() {
        let mut smoother = EyeDistanceSmoother::default();
        let d = smoother.update(Some(61.5), Some(58.25), 1000.0).unwrap();
        assert_eq!(d, SmoothedDistance { left_cm: 61.5, right_cm: 58.25 });
    }

    #[test]
    fn test_smoother_ignores_clock_going_backwards() {
        let mut smoother = EyeDistanceSmoother::default();
        smoother.update(Some(50.0), Some(50.0), 100.0);

        let d = smoother.update(Some(80.0), Some(80.0), 100.0).unwrap();
        assert_eq!(d.left_cm, 50.0);

        let d = smoother.update(Some(80.0), Some(80.0), 40.0).unwrap();
        assert_eq!(d.right_cm, 50.0);

        // Resumes once time moves forward again
        let d = smoother.update(Some(80.0), Some(80.0), 50.0).unwrap();
        assert!(d.left_cm > 50.0 && d.left_cm < 80.0);
    }

    #[test]
    fn test_advance_clock_shortens_next_gap() {
        let mut smoother = EyeDistanceSmoother::default();
        smoother.update(Some(50.0), Some(50.0), 0.0);
        smoother.advance_clock(990.0);
        assert_eq!(smoother.current().unwrap().left_cm, 50.0);

        // Decays over 10 ms, not the full 1000 ms
        let d = smoother.update(Some(60.0), Some(60.0), 1000.0).unwrap();
        let expected = 50.0 + 10.0 * (1.0 - 0.99_f64.powf(10.0));
        assert!((d.left_cm - expected).abs() < 1e-9);
    }

    #[test]
    fn test_smoother_reset() {
        let mut smoother = EyeDistanceSmoother::from_kind("none", 0.99).unwrap();
        smoother.update(Some(50.0), Some(50.0), 0.0);
        smoother.reset();
        assert!(smoother.current().is_none());
    }
}
