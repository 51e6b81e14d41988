//! Bollinger Bands.
//!
//! - mid = SMA(period)
//! - upper = mid + multiplier * stddev
//! - lower = mid - multiplier * stddev
//!
//! stddev is the population standard deviation (divide by N), matching the
//! usual charting convention.

use super::{window_mean, window_stddev};
use crate::error::LineError;
use crate::graph::{BatchInput, LineOp, StepInput};

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        assert!(multiplier >= 0.0, "Bollinger multiplier must be >= 0");
        Self { period, multiplier }
    }

    #[inline]
    fn bands(&self, window: &[f64]) -> [f64; 3] {
        let mid = window_mean(window);
        let width = self.multiplier * window_stddev(window, mid);
        [mid, mid + width, mid - width]
    }
}

impl LineOp for Bollinger {
    fn kind(&self) -> &str {
        "bollinger"
    }

    fn min_period(&self) -> usize {
        self.period
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["mid", "upper", "lower"]
    }

    fn compute_step(&self, input: &StepInput<'_>, out: &mut [f64]) -> Result<(), LineError> {
        out.copy_from_slice(&self.bands(input.window(0)));
        Ok(())
    }

    fn compute_batch(
        &self,
        input: &BatchInput<'_>,
        out: &mut [Vec<f64>],
    ) -> Option<Result<(), LineError>> {
        for j in 0..input.len() {
            let bands = self.bands(input.window(0, j));
            for (series, value) in out.iter_mut().zip(bands) {
                series[j] = value;
            }
        }
        Some(Ok(()))
    }
}
