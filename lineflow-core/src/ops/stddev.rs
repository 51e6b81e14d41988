//! Rolling population standard deviation.

use super::{window_mean, window_stddev};
use crate::error::LineError;
use crate::graph::{BatchInput, LineOp, StepInput};

#[derive(Debug, Clone)]
pub struct StdDev {
    period: usize,
}

impl StdDev {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "StdDev period must be >= 1");
        Self { period }
    }
}

#[inline]
fn deviation(window: &[f64]) -> f64 {
    window_stddev(window, window_mean(window))
}

impl LineOp for StdDev {
    fn kind(&self) -> &str {
        "stddev"
    }

    fn min_period(&self) -> usize {
        self.period
    }

    fn compute_step(&self, input: &StepInput<'_>, out: &mut [f64]) -> Result<(), LineError> {
        out[0] = deviation(input.window(0));
        Ok(())
    }

    fn compute_batch(
        &self,
        input: &BatchInput<'_>,
        out: &mut [Vec<f64>],
    ) -> Option<Result<(), LineError>> {
        for (j, slot) in out[0].iter_mut().enumerate() {
            *slot = deviation(input.window(0, j));
        }
        Some(Ok(()))
    }
}
