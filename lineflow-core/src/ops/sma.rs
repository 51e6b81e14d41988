//! Simple Moving Average (SMA).
//!
//! Mean of the last `period` samples. First valid value at position
//! `period - 1`. Any NaN in the window yields NaN.

use super::window_mean;
use crate::error::LineError;
use crate::graph::{BatchInput, LineOp, StepInput};

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl LineOp for Sma {
    fn kind(&self) -> &str {
        "sma"
    }

    fn min_period(&self) -> usize {
        self.period
    }

    fn compute_step(&self, input: &StepInput<'_>, out: &mut [f64]) -> Result<(), LineError> {
        out[0] = window_mean(input.window(0));
        Ok(())
    }

    fn compute_batch(
        &self,
        input: &BatchInput<'_>,
        out: &mut [Vec<f64>],
    ) -> Option<Result<(), LineError>> {
        // Each window is summed from scratch; a rolling sum would drift from
        // the step path by rounding.
        for (j, slot) in out[0].iter_mut().enumerate() {
            *slot = window_mean(input.window(0, j));
        }
        Some(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{assert_approx, assert_same_series, run_batch, run_steps, DEFAULT_EPSILON};

    #[test]
    fn sma_3_basic() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        let result = run_steps(&Sma::new(3), &[&data]);
        assert!(result[0][0].is_nan());
        assert!(result[0][1].is_nan());
        assert_approx(result[0][2], 2.0, DEFAULT_EPSILON);
        assert_approx(result[0][3], 3.0, DEFAULT_EPSILON);
        assert_approx(result[0][4], 4.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_1_is_identity() {
        let data = [100.0, 200.0, 300.0];
        let result = run_steps(&Sma::new(1), &[&data]);
        assert_eq!(result[0], vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn sma_nan_in_window() {
        let data = [1.0, f64::NAN, 3.0, 4.0, 5.0, 6.0];
        let result = run_steps(&Sma::new(3), &[&data]);
        assert!(result[0][2].is_nan());
        assert!(result[0][3].is_nan());
        assert_approx(result[0][4], 4.0, DEFAULT_EPSILON);
        assert_approx(result[0][5], 5.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_batch_matches_steps() {
        let data: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.37).sin() * 7.3).collect();
        let op = Sma::new(7);
        let steps = run_steps(&op, &[&data]);
        let batch = run_batch(&op, &[&data]);
        assert_same_series(&steps[0], &batch[0]);
    }

    #[test]
    fn sma_short_input_all_nan() {
        let data = [1.0, 2.0];
        let result = run_batch(&Sma::new(5), &[&data]);
        assert!(result[0].iter().all(|v| v.is_nan()));
    }

    #[test]
    #[should_panic(expected = "period must be >= 1")]
    fn sma_zero_period_panics() {
        Sma::new(0);
    }
}
