//! Price channel: highest and lowest value over a window.
//!
//! Two outputs, `upper` and `lower`. A NaN anywhere in the window makes both
//! bands NaN.

use crate::error::LineError;
use crate::graph::{BatchInput, LineOp, StepInput};

#[derive(Debug, Clone)]
pub struct Channel {
    period: usize,
}

impl Channel {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Channel period must be >= 1");
        Self { period }
    }
}

fn bands(window: &[f64]) -> (f64, f64) {
    let mut upper = f64::NEG_INFINITY;
    let mut lower = f64::INFINITY;
    for &v in window {
        if v.is_nan() {
            return (f64::NAN, f64::NAN);
        }
        upper = upper.max(v);
        lower = lower.min(v);
    }
    (upper, lower)
}

impl LineOp for Channel {
    fn kind(&self) -> &str {
        "channel"
    }

    fn min_period(&self) -> usize {
        self.period
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["upper", "lower"]
    }

    fn compute_step(&self, input: &StepInput<'_>, out: &mut [f64]) -> Result<(), LineError> {
        (out[0], out[1]) = bands(input.window(0));
        Ok(())
    }

    fn compute_batch(
        &self,
        input: &BatchInput<'_>,
        out: &mut [Vec<f64>],
    ) -> Option<Result<(), LineError>> {
        let (upper, lower) = out.split_at_mut(1);
        for j in 0..input.len() {
            (upper[0][j], lower[0][j]) = bands(input.window(0, j));
        }
        Some(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{assert_same_series, run_batch, run_steps};

    #[test]
    fn channel_basic() {
        let data = [10.0, 12.0, 11.0, 9.0, 13.0];
        let result = run_steps(&Channel::new(3), &[&data]);
        assert!(result[0][1].is_nan());
        assert_eq!(result[0][2], 12.0);
        assert_eq!(result[1][2], 10.0);
        assert_eq!(result[0][3], 12.0);
        assert_eq!(result[1][3], 9.0);
        assert_eq!(result[0][4], 13.0);
        assert_eq!(result[1][4], 9.0);
    }

    #[test]
    fn channel_nan_window() {
        let data = [1.0, f64::NAN, 3.0, 4.0];
        let result = run_steps(&Channel::new(2), &[&data]);
        assert!(result[0][1].is_nan());
        assert!(result[1][2].is_nan());
        assert_eq!(result[0][3], 4.0);
        assert_eq!(result[1][3], 3.0);
    }

    #[test]
    fn channel_batch_matches_steps() {
        let data: Vec<f64> = (0..60).map(|i| ((i * 7919) % 101) as f64).collect();
        let op = Channel::new(5);
        let steps = run_steps(&op, &[&data]);
        let batch = run_batch(&op, &[&data]);
        assert_same_series(&steps[0], &batch[0]);
        assert_same_series(&steps[1], &batch[1]);
    }
}
