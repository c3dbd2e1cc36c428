//! Sandboxed arithmetic for derived values
//!
//! Expressions support integer and decimal literals, `+ - * /`, unary minus,
//! parentheses, `int()`, `float()` and the placeholder `x`. Nothing else is
//! reachable from template text.

mod format;
mod parser;

pub use format::{format_message, format_value, FormatArg};
pub use parser::{parse, BinaryOp, Expr, Func};

use std::fmt;

use tracing::warn;

use crate::error::{ConvertError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{:.1}", v)
            }
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}

fn overflow() -> ConvertError {
    ConvertError::Expression("integer overflow".to_string())
}

fn binary(op: BinaryOp, left: Number, right: Number) -> Result<Number> {
    match (left, right) {
        (Number::Int(a), Number::Int(b)) => {
            let value = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div => {
                    if b == 0 {
                        return Err(ConvertError::Expression("division by zero".to_string()));
                    }
                    // floor division, rounding toward negative infinity
                    let quotient = a.checked_div(b).ok_or_else(overflow)?;
                    Some(if (a % b != 0) && ((a < 0) != (b < 0)) { quotient - 1 } else { quotient })
                }
            };
            value.map(Number::Int).ok_or_else(overflow)
        }
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            let value = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => {
                    if b == 0.0 {
                        return Err(ConvertError::Expression("division by zero".to_string()));
                    }
                    a / b
                }
            };
            Ok(Number::Float(value))
        }
    }
}

/// Evaluate a parsed expression with `x` bound to `placeholder`
pub fn eval(expr: &Expr, placeholder: Option<Number>) -> Result<Number> {
    match expr {
        Expr::Literal(n) => Ok(*n),
        Expr::Placeholder => placeholder
            .ok_or_else(|| ConvertError::Expression("placeholder 'x' is not bound".to_string())),
        Expr::Negate(inner) => match eval(inner, placeholder)? {
            Number::Int(i) => i.checked_neg().map(Number::Int).ok_or_else(overflow),
            Number::Float(f) => Ok(Number::Float(-f)),
        },
        Expr::Binary { op, left, right } => {
            binary(*op, eval(left, placeholder)?, eval(right, placeholder)?)
        }
        Expr::Call { func: Func::Int, arg } => match eval(arg, placeholder)? {
            Number::Int(i) => Ok(Number::Int(i)),
            Number::Float(f) if f.is_finite() && f.abs() < i64::MAX as f64 => {
                Ok(Number::Int(f.trunc() as i64))
            }
            Number::Float(f) => Err(ConvertError::Expression(format!("cannot convert {} to int", f))),
        },
        Expr::Call { func: Func::Float, arg } => {
            Ok(Number::Float(eval(arg, placeholder)?.as_f64()))
        }
    }
}

/// Parse and evaluate `input` with no placeholder bound
pub fn evaluate(input: &str) -> Result<Number> {
    eval(&parse(input)?, None)
}

/// Evaluate `value`, then `math` with `x` bound to it, then apply `format`
///
/// Empty `math` skips the second step; empty `format` renders naturally.
pub fn compute(value: &str, math: &str, format: &str) -> Result<String> {
    let mut number = evaluate(value)?;
    if !math.is_empty() {
        number = eval(&parse(math)?, Some(number))?;
    }
    format_value(&FormatArg::Number(number), format)
}

/// Best-effort [`compute`]: on any failure `value` is returned unchanged
pub fn apply_math(value: &str, math: &str, format: &str) -> String {
    compute(value, math, format).unwrap_or_else(|e| {
        warn!("Error in math '{}', format '{}' for value '{}': {}", math, format, value, e);
        value.to_string()
    })
}
