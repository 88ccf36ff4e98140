use super::DistanceFilter;

/// Exponential decay calibrated per millisecond:
/// `value += (target - value) * (1 - base^dt)`
pub struct TimeDecayFilter {
    base: f64,
    value: Option<f64>,
}

impl TimeDecayFilter {
    pub fn new(base: f64) -> Self {
        assert!(base > 0.0 && base < 1.0, "Decay base must be in (0, 1)");
        Self { base, value: None }
    }

    /// Fraction of the remaining gap closed after `dt_ms`.
    ///
    /// Zero, negative or NaN elapsed time closes nothing.
    #[must_use]
    pub fn decay_factor(&self, dt_ms: f64) -> f64 {
        if dt_ms > 0.0 {
            1.0 - self.base.powf(dt_ms)
        } else {
            0.0
        }
    }

    /// Time for the gap to halve, in milliseconds
    #[must_use]
    pub fn half_life_ms(&self) -> f64 {
        0.5_f64.ln() / self.base.ln()
    }
}

impl DistanceFilter for TimeDecayFilter {
    fn apply(&mut self, target: f64, dt_ms: f64) -> f64 {
        let next = match self.value {
            Some(current) => current + (target - current) * self.decay_factor(dt_ms),
            None => target,
        };
        self.value = Some(next);
        next
    }

    fn value(&self) -> Option<f64> {
        self.value
    }

    fn reset(&mut self) {
        self.value = None;
    }

    fn name(&self) -> &str {
        "TimeDecayFilter"
    }
}
