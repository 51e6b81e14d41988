//! Operator backed by a user closure.

use std::fmt;

use crate::error::LineError;
use crate::graph::{LineOp, StepInput};

type StepFn = dyn Fn(&StepInput<'_>) -> f64 + Send + Sync;

/// Single-output operator computing each value with a closure.
///
/// There is no batch kernel; the batch scheduler loops the closure.
pub struct FnOp {
    arity: usize,
    min_period: usize,
    f: Box<StepFn>,
}

impl FnOp {
    pub fn new<F>(arity: usize, min_period: usize, f: F) -> Self
    where
        F: Fn(&StepInput<'_>) -> f64 + Send + Sync + 'static,
    {
        Self {
            arity,
            min_period,
            f: Box::new(f),
        }
    }
}

impl fmt::Debug for FnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOp")
            .field("arity", &self.arity)
            .field("min_period", &self.min_period)
            .finish_non_exhaustive()
    }
}

impl LineOp for FnOp {
    fn kind(&self) -> &str {
        "fn"
    }

    fn min_period(&self) -> usize {
        self.min_period
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn compute_step(&self, input: &StepInput<'_>, out: &mut [f64]) -> Result<(), LineError> {
        out[0] = (self.f)(input);
        Ok(())
    }
}
