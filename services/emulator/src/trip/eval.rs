//! AST evaluation against the data-point table.
//!
//! Type discipline follows the point, not the expression: boolean points
//! compare with `==`/`!=` only, integer points compare exactly, float
//! points compare with an epsilon equality. A path that has never been
//! seen evaluates its comparison to `false`: "never seen" means "not
//! asserted", not an error.

use super::parser::{CmpOp, Expr, LogicOp};
use std::collections::HashMap;
use thiserror::Error;
use types::PointValue;

/// Equality tolerance for floating-point data points.
pub const FLOAT_EQ_EPSILON: f64 = 1e-6;

/// Runtime evaluation failures. These are not parse errors: the
/// expression was well-formed, the live data disagreed with it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("path '{path}' is boolean: operator '{op}' not applicable (use == or !=)")]
    BooleanOrdering { path: String, op: CmpOp },

    #[error("value '{value}' does not parse as {expected} for path '{path}'")]
    ValueType {
        path: String,
        value: String,
        expected: &'static str,
    },
}

/// Evaluate an expression against the current points.
pub fn eval(expr: &Expr, points: &HashMap<String, PointValue>) -> Result<bool, EvalError> {
    match expr {
        Expr::Binary { op, lhs, rhs } => {
            let l = eval(lhs, points)?;
            // No short-circuit: the right side is evaluated too so a type
            // mismatch there surfaces regardless of the left value.
            let r = eval(rhs, points)?;
            Ok(match op {
                LogicOp::And => l && r,
                LogicOp::Or => l || r,
            })
        }
        Expr::Not(inner) => Ok(!eval(inner, points)?),
        Expr::Compare { path, op, value } => match points.get(path) {
            None => Ok(false),
            Some(PointValue::Bool(actual)) => compare_bool(path, *actual, *op, value),
            Some(PointValue::Int(actual)) => compare_int(path, *actual, *op, value),
            Some(PointValue::Float(actual)) => compare_float(path, *actual, *op, value),
        },
    }
}

fn compare_bool(path: &str, actual: bool, op: CmpOp, value: &str) -> Result<bool, EvalError> {
    let expected = match value {
        "true" | "1" => true,
        "false" | "0" => false,
        _ => {
            return Err(EvalError::ValueType {
                path: path.to_string(),
                value: value.to_string(),
                expected: "boolean",
            })
        }
    };
    match op {
        CmpOp::Eq => Ok(actual == expected),
        CmpOp::Ne => Ok(actual != expected),
        other => Err(EvalError::BooleanOrdering {
            path: path.to_string(),
            op: other,
        }),
    }
}

fn compare_int(path: &str, actual: i64, op: CmpOp, value: &str) -> Result<bool, EvalError> {
    let expected: i64 = value.parse().map_err(|_| EvalError::ValueType {
        path: path.to_string(),
        value: value.to_string(),
        expected: "integer",
    })?;
    Ok(match op {
        CmpOp::Eq => actual == expected,
        CmpOp::Ne => actual != expected,
        CmpOp::Gt => actual > expected,
        CmpOp::Lt => actual < expected,
        CmpOp::Ge => actual >= expected,
        CmpOp::Le => actual <= expected,
    })
}

fn compare_float(path: &str, actual: f64, op: CmpOp, value: &str) -> Result<bool, EvalError> {
    let expected: f64 = value.parse().map_err(|_| EvalError::ValueType {
        path: path.to_string(),
        value: value.to_string(),
        expected: "float",
    })?;
    let eq = (actual - expected).abs() < FLOAT_EQ_EPSILON;
    Ok(match op {
        CmpOp::Eq => eq,
        CmpOp::Ne => !eq,
        CmpOp::Gt => actual > expected,
        CmpOp::Lt => actual < expected,
        CmpOp::Ge => actual >= expected || eq,
        CmpOp::Le => actual <= expected || eq,
    })
}
