//! Element-wise arithmetic between two lines.
//!
//! `Div` treats a zero divisor as an operator failure; `SafeDiv` yields NaN
//! instead. Combine with input offsets to build spreads and ratios against
//! past values (`close / close@-1`).

use crate::error::LineError;
use crate::graph::{BatchInput, LineOp, StepInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithKind {
    Add,
    Sub,
    Mul,
    Div,
    SafeDiv,
}

impl ArithKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::SafeDiv => "safe_div",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Arith {
    kind: ArithKind,
}

impl Arith {
    pub fn new(kind: ArithKind) -> Self {
        Self { kind }
    }

    pub fn add() -> Self {
        Self::new(ArithKind::Add)
    }

    pub fn sub() -> Self {
        Self::new(ArithKind::Sub)
    }

    pub fn mul() -> Self {
        Self::new(ArithKind::Mul)
    }

    pub fn div() -> Self {
        Self::new(ArithKind::Div)
    }

    pub fn safe_div() -> Self {
        Self::new(ArithKind::SafeDiv)
    }

    fn apply(&self, a: f64, b: f64) -> Result<f64, LineError> {
        Ok(match self.kind {
            ArithKind::Add => a + b,
            ArithKind::Sub => a - b,
            ArithKind::Mul => a * b,
            ArithKind::Div => {
                if b == 0.0 {
                    return Err(LineError::compute(self.kind.name(), "division by zero"));
                }
                a / b
            }
            ArithKind::SafeDiv => {
                if b == 0.0 {
                    f64::NAN
                } else {
                    a / b
                }
            }
        })
    }
}

impl LineOp for Arith {
    fn kind(&self) -> &str {
        self.kind.name()
    }

    fn min_period(&self) -> usize {
        1
    }

    fn arity(&self) -> usize {
        2
    }

    fn compute_step(&self, input: &StepInput<'_>, out: &mut [f64]) -> Result<(), LineError> {
        out[0] = self.apply(input.current(0), input.current(1))?;
        Ok(())
    }

    fn compute_batch(
        &self,
        input: &BatchInput<'_>,
        out: &mut [Vec<f64>],
    ) -> Option<Result<(), LineError>> {
        let (a, b) = (input.series(0), input.series(1));
        for (j, slot) in out[0].iter_mut().enumerate() {
            match self.apply(a[j], b[j]) {
                Ok(v) => *slot = v,
                Err(e) => return Some(Err(e)),
            }
        }
        Some(Ok(()))
    }
}
