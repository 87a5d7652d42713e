//! Operator semantics over [`Value`]: arithmetic promotion, division and
//! power upcasting, integer division, comparisons, logical and bitwise
//! operators.

use std::fmt;
use thiserror::Error;

use crate::value::{Kind, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    IntDivide,
    Remainder,
    Power,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::IntDivide => "%%",
            BinaryOp::Remainder => "%",
            BinaryOp::Power => "**",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Negate,
    Not,
    BitInvert,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericError {
    #[error("operation '{op}' not defined between types ({left}) ({right})")]
    Mismatch { op: BinaryOp, left: Kind, right: Kind },
    #[error("expecting a numeric value, found {0}")]
    ExpectingNumeric(Kind),
    #[error("expecting boolean operands, found ({0}) ({1})")]
    ExpectingBoolean(Kind, Kind),
    #[error("expecting a boolean value, found {0}")]
    ExpectingBooleanValue(Kind),
    #[error("expecting integer types, found ({0}) ({1})")]
    ExpectingInteger(Kind, Kind),
    #[error("expecting an integer value, found {0}")]
    ExpectingIntegerValue(Kind),
    #[error("'{0}' between floating point numbers is not a valid operation; use an epsilon comparison instead")]
    FloatEquality(BinaryOp),
    #[error("integer division by zero")]
    DivisionByZero,
    #[error("cannot perform implicit cast from {from} to {to}")]
    ImplicitCast { from: Kind, to: Kind },
}

/// Widens the narrower operand along byte -> int -> int64 -> float -> double.
/// Two bools pass through unchanged; a bool mixed with a number does not
/// promote.
pub fn promote(left: Value, right: Value, op: BinaryOp) -> Result<(Value, Value), NumericError> {
    let (lk, rk) = (left.kind(), right.kind());
    if lk == rk {
        return Ok((left, right));
    }
    match (lk.rank(), rk.rank()) {
        (Some(l), Some(r)) if l < r => Ok((left.cast_explicit(rk), right)),
        (Some(_), Some(_)) => Ok((left, right.cast_explicit(lk))),
        _ => Err(NumericError::Mismatch {
            op,
            left: lk,
            right: rk,
        }),
    }
}

macro_rules! arithmetic {
    ($op:expr, $left:expr, $right:expr, $wrapping:ident, $float:tt) => {
        match promote($left, $right, $op)? {
            (Value::Byte(a), Value::Byte(b)) => Ok(Value::Byte(a.$wrapping(b))),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.$wrapping(b))),
            (Value::Int64(a), Value::Int64(b)) => Ok(Value::Int64(a.$wrapping(b))),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a $float b)),
            (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a $float b)),
            (l, r) => Err(NumericError::Mismatch {
                op: $op,
                left: l.kind(),
                right: r.kind(),
            }),
        }
    };
}

macro_rules! relational {
    ($op:expr, $left:expr, $right:expr, $cmp:tt) => {
        match promote($left, $right, $op)? {
            (Value::Byte(a), Value::Byte(b)) => Ok(Value::Bool(a $cmp b)),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a $cmp b)),
            (Value::Int64(a), Value::Int64(b)) => Ok(Value::Bool(a $cmp b)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Bool(a $cmp b)),
            (Value::Double(a), Value::Double(b)) => Ok(Value::Bool(a $cmp b)),
            (l, r) => Err(NumericError::Mismatch {
                op: $op,
                left: l.kind(),
                right: r.kind(),
            }),
        }
    };
}

macro_rules! bitwise {
    ($op:expr, $left:expr, $right:expr, $bit:tt) => {
        match integer_operands($left, $right)? {
            (Value::Byte(a), Value::Byte(b)) => Ok(Value::Byte(a $bit b)),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a $bit b)),
            (Value::Int64(a), Value::Int64(b)) => Ok(Value::Int64(a $bit b)),
            (l, r) => Err(NumericError::Mismatch {
                op: $op,
                left: l.kind(),
                right: r.kind(),
            }),
        }
    };
}

macro_rules! shift {
    ($left:expr, $right:expr, $wrapping:ident) => {
        match integer_operands($left, $right)? {
            (Value::Byte(a), Value::Byte(b)) => Ok(Value::Byte(a.$wrapping(b as u32))),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.$wrapping(b as u32))),
            (Value::Int64(a), Value::Int64(b)) => Ok(Value::Int64(a.$wrapping(b as u32))),
            (l, r) => Err(NumericError::ExpectingInteger(l.kind(), r.kind())),
        }
    };
}

fn integer_operands(left: Value, right: Value) -> Result<(Value, Value), NumericError> {
    let (lk, rk) = (left.kind(), right.kind());
    if !lk.is_integer() || !rk.is_integer() {
        return Err(NumericError::ExpectingInteger(lk, rk));
    }
    promote(left, right, BinaryOp::BitAnd)
}

/// Result kind shared by `/` and `**`: double wins, then float, and two
/// integers give double.
fn floating_kind(left: Value, right: Value, op: BinaryOp) -> Result<Kind, NumericError> {
    let (lk, rk) = (left.kind(), right.kind());
    if !lk.is_numeric() || !rk.is_numeric() {
        return Err(NumericError::Mismatch {
            op,
            left: lk,
            right: rk,
        });
    }
    if lk == Kind::Double || rk == Kind::Double {
        Ok(Kind::Double)
    } else if lk == Kind::Float || rk == Kind::Float {
        Ok(Kind::Float)
    } else {
        Ok(Kind::Double)
    }
}

fn truncated_operands(left: Value, right: Value, op: BinaryOp) -> Result<(i64, i64), NumericError> {
    let (lk, rk) = (left.kind(), right.kind());
    if !lk.is_numeric() || !rk.is_numeric() {
        return Err(NumericError::Mismatch {
            op,
            left: lk,
            right: rk,
        });
    }
    Ok((left.as_i64(), right.as_i64()))
}

pub fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, NumericError> {
    match op {
        BinaryOp::Add => arithmetic!(op, left, right, wrapping_add, +),
        BinaryOp::Subtract => arithmetic!(op, left, right, wrapping_sub, -),
        BinaryOp::Multiply => arithmetic!(op, left, right, wrapping_mul, *),
        BinaryOp::Divide => match floating_kind(left, right, op)? {
            Kind::Float => Ok(Value::Float(left.as_f32() / right.as_f32())),
            _ => Ok(Value::Double(left.as_double() / right.as_double())),
        },
        BinaryOp::Power => {
            let result = left.as_double().powf(right.as_double());
            match floating_kind(left, right, op)? {
                Kind::Float => Ok(Value::Float(result as f32)),
                _ => Ok(Value::Double(result)),
            }
        }
        BinaryOp::IntDivide => {
            let (a, b) = truncated_operands(left, right, op)?;
            if b == 0 {
                return Err(NumericError::DivisionByZero);
            }
            Ok(Value::Int(a.wrapping_div(b) as i32))
        }
        BinaryOp::Remainder => {
            let (a, b) = truncated_operands(left, right, op)?;
            if b == 0 {
                return Err(NumericError::DivisionByZero);
            }
            Ok(Value::Int(a.wrapping_rem(b) as i32))
        }
        BinaryOp::Equal | BinaryOp::NotEqual => {
            let equal = match promote(left, right, op)? {
                (Value::Bool(a), Value::Bool(b)) => a == b,
                (Value::Byte(a), Value::Byte(b)) => a == b,
                (Value::Int(a), Value::Int(b)) => a == b,
                (Value::Int64(a), Value::Int64(b)) => a == b,
                (Value::Float(_), Value::Float(_)) | (Value::Double(_), Value::Double(_)) => {
                    return Err(NumericError::FloatEquality(op));
                }
                (l, r) => {
                    return Err(NumericError::Mismatch {
                        op,
                        left: l.kind(),
                        right: r.kind(),
                    })
                }
            };
            Ok(Value::Bool(if op == BinaryOp::Equal { equal } else { !equal }))
        }
        BinaryOp::Less => relational!(op, left, right, <),
        BinaryOp::LessEqual => relational!(op, left, right, <=),
        BinaryOp::Greater => relational!(op, left, right, >),
        BinaryOp::GreaterEqual => relational!(op, left, right, >=),
        BinaryOp::And | BinaryOp::Or => match (left, right) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == BinaryOp::And {
                a && b
            } else {
                a || b
            })),
            (l, r) => Err(NumericError::ExpectingBoolean(l.kind(), r.kind())),
        },
        BinaryOp::BitAnd => bitwise!(op, left, right, &),
        BinaryOp::BitOr => bitwise!(op, left, right, |),
        BinaryOp::BitXor => bitwise!(op, left, right, ^),
        BinaryOp::ShiftLeft => shift!(left, right, wrapping_shl),
        BinaryOp::ShiftRight => shift!(left, right, wrapping_shr),
    }
}

pub fn unary(op: UnaryOp, operand: Value) -> Result<Value, NumericError> {
    match op {
        UnaryOp::Plus => {
            if operand.kind().is_numeric() {
                Ok(operand)
            } else {
                Err(NumericError::ExpectingNumeric(operand.kind()))
            }
        }
        UnaryOp::Negate => match operand {
            Value::Byte(n) => Ok(Value::Byte(n.wrapping_neg())),
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            Value::Int64(n) => Ok(Value::Int64(n.wrapping_neg())),
            Value::Float(n) => Ok(Value::Float(-n)),
            Value::Double(n) => Ok(Value::Double(-n)),
            Value::Bool(_) => Err(NumericError::ExpectingNumeric(Kind::Bool)),
        },
        UnaryOp::Not => match operand {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(NumericError::ExpectingBooleanValue(other.kind())),
        },
        UnaryOp::BitInvert => match operand {
            Value::Byte(n) => Ok(Value::Byte(!n)),
            Value::Int(n) => Ok(Value::Int(!n)),
            Value::Int64(n) => Ok(Value::Int64(!n)),
            other => Err(NumericError::ExpectingIntegerValue(other.kind())),
        },
    }
}
