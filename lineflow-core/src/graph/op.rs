//! Operator trait: the computation carried by a graph node.
//!
//! An operator is a pure function of its input windows. Recursive operators
//! (EMA and friends) may also read their own previous output through
//! [`StepInput::prev`]; that is self-history, not an edge, so it never creates
//! a cycle.
//!
//! # Look-ahead guard
//! The value at position `t` may only depend on input positions `<= t`. The
//! scheduler enforces this by construction: windows end at the current
//! position shifted by the (non-positive) input offset.

use crate::error::LineError;

/// Inputs of one incremental evaluation.
#[derive(Debug, Clone, Copy)]
pub struct StepInput<'a> {
    position: usize,
    period: usize,
    windows: &'a [f64],
    prev: &'a [f64],
}

impl<'a> StepInput<'a> {
    /// `windows` holds `period` values per input, input-major, oldest first.
    /// `prev` holds the previous value of each output (NaN when none).
    pub fn new(position: usize, period: usize, windows: &'a [f64], prev: &'a [f64]) -> Self {
        debug_assert!(period > 0 && windows.len() % period == 0);
        Self {
            position,
            period,
            windows,
            prev,
        }
    }

    /// Absolute position being computed.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// The last `period` values of input `index`, oldest first.
    pub fn window(&self, index: usize) -> &'a [f64] {
        let start = index * self.period;
        &self.windows[start..start + self.period]
    }

    /// Newest value of input `index`.
    pub fn current(&self, index: usize) -> f64 {
        self.windows[(index + 1) * self.period - 1]
    }

    /// Previous value of output `index`, NaN on the first valid step.
    pub fn prev(&self, index: usize) -> f64 {
        self.prev.get(index).copied().unwrap_or(f64::NAN)
    }
}

/// Inputs of one whole-range evaluation over `len` consecutive positions.
///
/// Each input series holds `len + period - 1` values: output `j` (absolute
/// position `start + j`) is aligned with series entries `j..j + period`.
#[derive(Debug, Clone, Copy)]
pub struct BatchInput<'a> {
    start: usize,
    len: usize,
    period: usize,
    series: &'a [&'a [f64]],
    prev: &'a [f64],
}

impl<'a> BatchInput<'a> {
    pub fn new(
        start: usize,
        len: usize,
        period: usize,
        series: &'a [&'a [f64]],
        prev: &'a [f64],
    ) -> Self {
        debug_assert!(series.iter().all(|s| s.len() == len + period - 1));
        Self {
            start,
            len,
            period,
            series,
            prev,
        }
    }

    /// Absolute position of the first output.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn arity(&self) -> usize {
        self.series.len()
    }

    /// Full aligned series of input `index`.
    pub fn series(&self, index: usize) -> &'a [f64] {
        self.series[index]
    }

    /// Window of input `index` for output `j`, oldest first.
    pub fn window(&self, index: usize, j: usize) -> &'a [f64] {
        &self.series[index][j..j + self.period]
    }

    /// Newest value of input `index` for output `j`.
    pub fn current(&self, index: usize, j: usize) -> f64 {
        self.series[index][j + self.period - 1]
    }

    /// Value of output `index` just before `start` (NaN when none).
    pub fn prev(&self, index: usize) -> f64 {
        self.prev.get(index).copied().unwrap_or(f64::NAN)
    }
}

/// Computation carried by a graph node.
///
/// Implementations must be deterministic: `compute_batch`, when provided, has
/// to produce bit-identical values to repeated `compute_step` calls, including
/// floating-point accumulation order.
pub trait LineOp: Send + Sync {
    /// Operator kind (e.g. "sma"). Used in logs and error messages.
    fn kind(&self) -> &str;

    /// Input samples needed (including the current one) before the first
    /// valid output.
    fn min_period(&self) -> usize;

    /// Number of input lines.
    fn arity(&self) -> usize {
        1
    }

    /// Suffixes of the output lines. A single empty suffix means one output
    /// named after the node; otherwise outputs are named `node.suffix`.
    fn outputs(&self) -> &'static [&'static str] {
        &[""]
    }

    /// Compute one value per output for `input.position()`.
    fn compute_step(&self, input: &StepInput<'_>, out: &mut [f64]) -> Result<(), LineError>;

    /// Whole-range equivalent of `compute_step`, bit-identical to it at every
    /// position. Each `out[k]` has `input.len()` slots. Kernels walk the range
    /// in one pass over contiguous slices but still reduce each window on its
    /// own, so windowed operators cost O(len * period). `None` means no batch kernel: the scheduler loops
    /// `compute_step` instead.
    fn compute_batch(
        &self,
        _input: &BatchInput<'_>,
        _out: &mut [Vec<f64>],
    ) -> Option<Result<(), LineError>> {
        None
    }
}
