//! Exponential low-pass smoothing of the torque signal.

/// Single-pole EMA over scalar torque readings. The only persistent state is
/// the previous filtered value; the gain arrives fresh each update so it can
/// be retuned while the loop runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TorqueFilter {
    filtered: Option<f64>,
}

impl TorqueFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `alpha` in [0, 1]: 1 follows the raw signal, 0 freezes the output.
    /// The first sample seeds the filter to avoid startup bias.
    pub fn update(&mut self, raw: f64, alpha: f64) -> f64 {
        let next = match self.filtered {
            None => raw,
            Some(prev) => alpha * raw + (1.0 - alpha) * prev,
        };
        self.filtered = Some(next);
        next
    }

    /// Previous output, if any; the loop reuses this when a sensor frame
    /// is lost.
    pub fn last(&self) -> Option<f64> {
        self.filtered
    }

    pub fn reset(&mut self) {
        self.filtered = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_seeds_output() {
        let mut f = TorqueFilter::new();
        assert_eq!(f.update(3.5, 0.1), 3.5);
        assert_eq!(f.last(), Some(3.5));
    }

    #[test]
    fn alpha_one_tracks_raw_alpha_zero_freezes() {
        let mut f = TorqueFilter::new();
        f.update(1.0, 1.0);
        assert_eq!(f.update(9.0, 1.0), 9.0);
        assert_eq!(f.update(-4.0, 0.0), 9.0);
    }

    #[test]
    fn reset_reseeds_on_next_sample() {
        let mut f = TorqueFilter::new();
        f.update(5.0, 0.5);
        f.reset();
        assert_eq!(f.last(), None);
        assert_eq!(f.update(1.0, 0.5), 1.0);
    }
}
