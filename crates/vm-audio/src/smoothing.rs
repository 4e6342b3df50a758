/// Exponential moving average over successive level readings.
///
/// `factor` is the weight kept from the previous value: 0.8 keeps 80% of the
/// history and takes 20% of the new reading.
///
/// # Example
/// ```
/// use vm_audio::smoothing::LevelSmoother;
/// let mut smoother = LevelSmoother::new(0.8);
/// let v = smoother.smooth(1.0);
/// assert!((v - 0.2).abs() < 1e-12);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct LevelSmoother {
    factor: f64,
    value: f64,
}

impl LevelSmoother {
    /// Create a smoother starting at 0.
    ///
    /// `factor` is clamped to [0, 1]; 0 passes readings through unchanged.
    #[must_use]
    pub fn new(factor: f64) -> Self {
        Self {
            factor: factor.clamp(0.0, 1.0),
            value: 0.0,
        }
    }

    /// Fold a new reading into the average and return the updated value.
    #[inline(always)]
    pub fn smooth(&mut self, current: f64) -> f64 {
        self.value = self.factor * self.value + (1.0 - self.factor) * current;
        self.value
    }

    /// Current smoothed value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_factor_is_passthrough() {
        let mut s = LevelSmoother::new(0.0);
        assert!((s.smooth(0.7) - 0.7).abs() < f64::EPSILON);
        assert!((s.smooth(0.1) - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn stays_between_history_and_reading() {
        let mut s = LevelSmoother::new(0.8);
        s.smooth(1.0);
        let before = s.value();
        let after = s.smooth(0.0);
        assert!(after < before);
        assert!(after > 0.0);
    }
}
