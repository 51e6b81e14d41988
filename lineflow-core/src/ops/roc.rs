//! Rate of Change (ROC), in percent.
//!
//! roc[t] = (x[t] - x[t-period]) / x[t-period] * 100
//! NaN when the reference sample is NaN or zero.

use crate::error::LineError;
use crate::graph::{BatchInput, LineOp, StepInput};

#[derive(Debug, Clone)]
pub struct Roc {
    period: usize,
}

impl Roc {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ROC period must be >= 1");
        Self { period }
    }
}

#[inline]
fn rate(window: &[f64]) -> f64 {
    let prev = window[0];
    let curr = window[window.len() - 1];
    if prev.is_nan() || curr.is_nan() || prev == 0.0 {
        f64::NAN
    } else {
        (curr - prev) / prev * 100.0
    }
}

impl LineOp for Roc {
    fn kind(&self) -> &str {
        "roc"
    }

    fn min_period(&self) -> usize {
        self.period + 1
    }

    fn compute_step(&self, input: &StepInput<'_>, out: &mut [f64]) -> Result<(), LineError> {
        out[0] = rate(input.window(0));
        Ok(())
    }

    fn compute_batch(
        &self,
        input: &BatchInput<'_>,
        out: &mut [Vec<f64>],
    ) -> Option<Result<(), LineError>> {
        for (j, slot) in out[0].iter_mut().enumerate() {
            *slot = rate(input.window(0, j));
        }
        Some(Ok(()))
    }
}
