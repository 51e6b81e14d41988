//! Momentum: difference against the sample `period` steps back.
//!
//! momentum[t] = x[t] - x[t-period]

use crate::error::LineError;
use crate::graph::{BatchInput, LineOp, StepInput};

#[derive(Debug, Clone)]
pub struct Momentum {
    period: usize,
}

impl Momentum {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Momentum period must be >= 1");
        Self { period }
    }
}

#[inline]
fn delta(window: &[f64]) -> f64 {
    window[window.len() - 1] - window[0]
}

impl LineOp for Momentum {
    fn kind(&self) -> &str {
        "momentum"
    }

    fn min_period(&self) -> usize {
        self.period + 1
    }

    fn compute_step(&self, input: &StepInput<'_>, out: &mut [f64]) -> Result<(), LineError> {
        out[0] = delta(input.window(0));
        Ok(())
    }

    fn compute_batch(
        &self,
        input: &BatchInput<'_>,
        out: &mut [Vec<f64>],
    ) -> Option<Result<(), LineError>> {
        for (j, slot) in out[0].iter_mut().enumerate() {
            *slot = delta(input.window(0, j));
        }
        Some(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{assert_approx, assert_same_series, run_batch, run_steps, DEFAULT_EPSILON};

    #[test]
    fn momentum_basic() {
        let data = [100.0, 110.0, 105.0, 115.0];
        let result = run_steps(&Momentum::new(2), &[&data]);
        assert!(result[0][0].is_nan());
        assert!(result[0][1].is_nan());
        assert_approx(result[0][2], 5.0, DEFAULT_EPSILON);
        assert_approx(result[0][3], 5.0, DEFAULT_EPSILON);
    }

    #[test]
    fn momentum_negative() {
        let data = [100.0, 90.0];
        let result = run_steps(&Momentum::new(1), &[&data]);
        assert_approx(result[0][1], -10.0, DEFAULT_EPSILON);
    }

    #[test]
    fn momentum_batch_matches_steps() {
        let data: Vec<f64> = (0..40).map(|i| (i as f64).sqrt() * 3.3).collect();
        let op = Momentum::new(4);
        assert_same_series(&run_steps(&op, &[&data])[0], &run_batch(&op, &[&data])[0]);
    }
}
