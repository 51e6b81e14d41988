//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1).
//! Seed: when there is no previous value (first valid position, or after a
//! NaN broke the chain) the EMA restarts from the mean of the current window.

use super::window_mean;
use crate::error::LineError;
use crate::graph::{BatchInput, LineOp, StepInput};

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[inline]
    fn next(&self, window: &[f64], current: f64, prev: f64) -> f64 {
        if prev.is_nan() {
            window_mean(window)
        } else {
            self.alpha * current + (1.0 - self.alpha) * prev
        }
    }
}

impl LineOp for Ema {
    fn kind(&self) -> &str {
        "ema"
    }

    fn min_period(&self) -> usize {
        self.period
    }

    fn compute_step(&self, input: &StepInput<'_>, out: &mut [f64]) -> Result<(), LineError> {
        out[0] = self.next(input.window(0), input.current(0), input.prev(0));
        Ok(())
    }

    fn compute_batch(
        &self,
        input: &BatchInput<'_>,
        out: &mut [Vec<f64>],
    ) -> Option<Result<(), LineError>> {
        let mut prev = input.prev(0);
        for (j, slot) in out[0].iter_mut().enumerate() {
            prev = self.next(input.window(0, j), input.current(0, j), prev);
            *slot = prev;
        }
        Some(Ok(()))
    }
}
