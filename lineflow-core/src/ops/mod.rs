//! Concrete operators.
//!
//! Every operator implements [`LineOp`](crate::graph::LineOp) with a
//! `compute_step` and, except for [`FnOp`], a `compute_batch` kernel. Both
//! paths call the same window helpers below so floating-point accumulation
//! order is identical and batch results match incremental results bit for
//! bit.
//!
//! Multi-output operators ([`Channel`], [`Bollinger`]) expose one output line
//! per band.

pub mod arith;
pub mod bollinger;
pub mod channel;
pub mod closure;
pub mod ema;
pub mod factory;
pub mod momentum;
pub mod roc;
pub mod sma;
pub mod stddev;

pub use arith::{Arith, ArithKind};
pub use bollinger::Bollinger;
pub use channel::Channel;
pub use closure::FnOp;
pub use ema::Ema;
pub use factory::{create_op, FactoryError};
pub use momentum::Momentum;
pub use roc::Roc;
pub use sma::Sma;
pub use stddev::StdDev;

/// Sum of a window, oldest to newest.
#[inline]
pub(crate) fn window_sum(window: &[f64]) -> f64 {
    let mut sum = 0.0;
    for &v in window {
        sum += v;
    }
    sum
}

#[inline]
pub(crate) fn window_mean(window: &[f64]) -> f64 {
    window_sum(window) / window.len() as f64
}

/// Population standard deviation around `mean`.
#[inline]
pub(crate) fn window_stddev(window: &[f64], mean: f64) -> f64 {
    let mut acc = 0.0;
    for &v in window {
        let diff = v - mean;
        acc += diff * diff;
    }
    (acc / window.len() as f64).sqrt()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for operator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Evaluate `op` over source series the way the incremental scheduler does.
#[cfg(test)]
pub fn run_steps(op: &dyn crate::graph::LineOp, inputs: &[&[f64]]) -> Vec<Vec<f64>> {
    use crate::graph::StepInput;

    let n = inputs.first().map(|s| s.len()).unwrap_or(0);
    let period = op.min_period();
    let outputs = op.outputs().len();
    let mut result = vec![vec![f64::NAN; n]; outputs];

    for t in (period - 1)..n {
        let windows: Vec<f64> = inputs
            .iter()
            .flat_map(|s| s[t + 1 - period..=t].iter().copied())
            .collect();
        let prev: Vec<f64> = (0..outputs)
            .map(|k| if t == 0 { f64::NAN } else { result[k][t - 1] })
            .collect();
        let mut out = vec![f64::NAN; outputs];
        op.compute_step(&StepInput::new(t, period, &windows, &prev), &mut out)
            .expect("step failed");
        for k in 0..outputs {
            result[k][t] = out[k];
        }
    }
    result
}

/// Evaluate `op` over source series through its batch kernel.
#[cfg(test)]
pub fn run_batch(op: &dyn crate::graph::LineOp, inputs: &[&[f64]]) -> Vec<Vec<f64>> {
    use crate::graph::BatchInput;

    let n = inputs.first().map(|s| s.len()).unwrap_or(0);
    let period = op.min_period();
    let outputs = op.outputs().len();
    let start = period - 1;
    let len = n.saturating_sub(start);
    let prev = vec![f64::NAN; outputs];
    let mut computed = vec![vec![f64::NAN; len]; outputs];
    if len > 0 {
        let input = BatchInput::new(start, len, period, inputs, &prev);
        op.compute_batch(&input, &mut computed)
            .expect("operator has no batch kernel")
            .expect("batch failed");
    }
    computed
        .into_iter()
        .map(|c| {
            let mut full = vec![f64::NAN; n - len];
            full.extend(c);
            full
        })
        .collect()
}

/// Bitwise equality, treating NaN == NaN.
#[cfg(test)]
pub fn assert_same_series(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len(), "length mismatch");
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!(
            x.to_bits() == y.to_bits() || (x.is_nan() && y.is_nan()),
            "mismatch at {i}: {x} vs {y}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_helpers() {
        assert_eq!(window_sum(&[1.0, 2.0, 3.0]), 6.0);
        assert_eq!(window_mean(&[1.0, 2.0, 3.0]), 2.0);
        assert_approx(
            window_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 5.0),
            2.0,
            DEFAULT_EPSILON,
        );
        assert!(window_sum(&[1.0, f64::NAN]).is_nan());
    }
}
