//! Factory: builds operators from a kind string and numeric parameters.
//!
//! Used by [`GraphSpec`](crate::config::GraphSpec) to turn `[[node]]` tables
//! into boxed [`LineOp`]s. Missing parameters fall back to defaults; an
//! out-of-range period is rejected here rather than panicking in the
//! operator constructor.

use std::collections::BTreeMap;

use super::{Arith, Bollinger, Channel, Ema, Momentum, Roc, Sma, StdDev};
use crate::graph::LineOp;

// ─── Error type ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FactoryError {
    #[error("Unknown operator kind: {0}")]
    UnknownKind(String),
    #[error("Invalid parameter '{name}' for {kind}: {value}")]
    InvalidParam {
        kind: String,
        name: String,
        value: f64,
    },
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Extract a named f64 parameter, falling back to `default`.
fn param(params: &BTreeMap<String, f64>, name: &str, default: f64) -> f64 {
    params.get(name).copied().unwrap_or(default)
}

/// Extract a window length; must be a whole number >= `min`.
/// Longest window a configured operator may request.
const MAX_PERIOD: usize = 1 << 20;

fn param_period(
    kind: &str,
    params: &BTreeMap<String, f64>,
    name: &str,
    default: usize,
    min: usize,
) -> Result<usize, FactoryError> {
    let value = param(params, name, default as f64);
    if !value.is_finite()
        || value.fract() != 0.0
        || value < min as f64
        || value > MAX_PERIOD as f64
    {
        return Err(FactoryError::InvalidParam {
            kind: kind.to_string(),
            name: name.to_string(),
            value,
        });
    }
    Ok(value as usize)
}

// ─── Operator factory ────────────────────────────────────────────────

/// Create an operator from its kind and parameters.
pub fn create_op(
    kind: &str,
    params: &BTreeMap<String, f64>,
) -> Result<Box<dyn LineOp>, FactoryError> {
    match kind {
        "sma" => {
            let period = param_period(kind, params, "period", 20, 1)?;
            Ok(Box::new(Sma::new(period)))
        }
        "ema" => {
            let period = param_period(kind, params, "period", 20, 1)?;
            Ok(Box::new(Ema::new(period)))
        }
        "momentum" | "delta" => {
            let period = param_period(kind, params, "period", 1, 1)?;
            Ok(Box::new(Momentum::new(period)))
        }
        "roc" => {
            let period = param_period(kind, params, "period", 12, 1)?;
            Ok(Box::new(Roc::new(period)))
        }
        "channel" => {
            let period = param_period(kind, params, "period", 20, 1)?;
            Ok(Box::new(Channel::new(period)))
        }
        "stddev" => {
            let period = param_period(kind, params, "period", 20, 1)?;
            Ok(Box::new(StdDev::new(period)))
        }
        "bollinger" => {
            let period = param_period(kind, params, "period", 20, 1)?;
            let multiplier = param(params, "multiplier", 2.0);
            if !(multiplier >= 0.0 && multiplier.is_finite()) {
                return Err(FactoryError::InvalidParam {
                    kind: kind.to_string(),
                    name: "multiplier".to_string(),
                    value: multiplier,
                });
            }
            Ok(Box::new(Bollinger::new(period, multiplier)))
        }
        "add" => Ok(Box::new(Arith::add())),
        "sub" => Ok(Box::new(Arith::sub())),
        "mul" => Ok(Box::new(Arith::mul())),
        "div" => Ok(Box::new(Arith::div())),
        "safe_div" => Ok(Box::new(Arith::safe_div())),
        other => Err(FactoryError::UnknownKind(other.to_string())),
    }
}
