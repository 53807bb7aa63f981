use banana_syntax::ast::{BinOp, UnaryOp};

use crate::{
    error::Fault,
    types::{List, Value},
};

/// Applies a binary operator to two evaluated operands. `and`/`or` land here
/// only once both sides are known; the evaluator short-circuits them.
pub fn binary(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, Fault> {
    match op {
        BinOp::Plus => add(lhs, rhs),
        BinOp::Minus => subtract(lhs, rhs),
        BinOp::Star => multiply(lhs, rhs),
        BinOp::Slash => divide(lhs, rhs),
        BinOp::Caret => power(lhs, rhs),
        BinOp::EqualEqual => Ok(Value::Boolean(lhs == rhs)),
        BinOp::BangEqual => Ok(Value::Boolean(lhs != rhs)),
        BinOp::Less | BinOp::Greater | BinOp::LessEqual | BinOp::GreaterEqual => {
            compare(op, lhs, rhs)
        }
        BinOp::And => Ok(Value::Boolean(lhs.is_truthy() && rhs.is_truthy())),
        BinOp::Or => Ok(Value::Boolean(lhs.is_truthy() || rhs.is_truthy())),
    }
}

pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value, Fault> {
    match (op, operand) {
        (UnaryOp::Not, v) => Ok(Value::Boolean(!v.is_truthy())),
        (UnaryOp::Minus, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOp::Plus, Value::Number(n)) => Ok(Value::Number(*n)),
        (UnaryOp::Minus | UnaryOp::Plus, Value::Null) => Ok(Value::Number(0.0)),
        (_, v) => Err(illegal(v)),
    }
}

pub fn add(lhs: &Value, rhs: &Value) -> Result<Value, Fault> {
    match (lhs, rhs) {
        (Value::Number(m), Value::Number(n)) => Ok(Value::Number(m + n)),
        (Value::Number(n), Value::Null) | (Value::Null, Value::Number(n)) => {
            Ok(Value::Number(*n))
        }
        (Value::Str(s), other) => Ok(Value::Str(format!("{s}{other}"))),
        (Value::Number(_) | Value::Boolean(_) | Value::Null, Value::Str(s)) => {
            Ok(Value::Str(format!("{lhs}{s}")))
        }
        (Value::List(list), other) => {
            let list = list.duplicate();
            list.borrow_mut().push(other.clone());
            Ok(Value::List(list))
        }
        _ => Err(illegal(rhs)),
    }
}

pub fn subtract(lhs: &Value, rhs: &Value) -> Result<Value, Fault> {
    match (lhs, rhs) {
        (Value::Number(m), Value::Number(n)) => Ok(Value::Number(m - n)),
        (Value::Number(n), Value::Null) => Ok(Value::Number(*n)),
        (Value::Null, Value::Number(n)) => Ok(Value::Number(-n)),
        (Value::List(list), Value::Number(n)) => {
            let list = list.duplicate();
            let index = list_index(*n, list.len()).ok_or(Fault::IndexOutOfBounds {
                index: *n,
                action: "removed from list",
            })?;
            list.borrow_mut().remove(index);
            Ok(Value::List(list))
        }
        _ => Err(illegal(rhs)),
    }
}

pub fn multiply(lhs: &Value, rhs: &Value) -> Result<Value, Fault> {
    match (lhs, rhs) {
        (Value::Number(m), Value::Number(n)) => Ok(Value::Number(m * n)),
        (Value::Number(_), Value::Null) | (Value::Null, Value::Number(_)) => {
            Ok(Value::Number(0.0))
        }
        (Value::Str(s), Value::Number(n)) => repeat(s, *n).ok_or_else(|| illegal(rhs)),
        (Value::List(m), Value::List(n)) => {
            let list = m.duplicate();
            let tail = n.borrow().clone();
            list.borrow_mut().extend(tail);
            Ok(Value::List(list))
        }
        _ => Err(illegal(rhs)),
    }
}

/// A null divisor is always an error; a null dividend counts as zero.
pub fn divide(lhs: &Value, rhs: &Value) -> Result<Value, Fault> {
    match (lhs, rhs) {
        (Value::Number(_) | Value::Null, Value::Number(n)) if *n == 0.0 => {
            Err(Fault::DivisionByZero)
        }
        (Value::Number(_) | Value::Null, Value::Null) => Err(Fault::DivisionByNull),
        (Value::Number(m), Value::Number(n)) => Ok(Value::Number(m / n)),
        (Value::Null, Value::Number(n)) => Ok(Value::Number(0.0 / n)),
        (Value::List(list), Value::Number(n)) => list_index(*n, list.len())
            .and_then(|index| list.get(index))
            .ok_or(Fault::IndexOutOfBounds {
                index: *n,
                action: "retrieved from list",
            }),
        _ => Err(illegal(rhs)),
    }
}

pub fn power(lhs: &Value, rhs: &Value) -> Result<Value, Fault> {
    match (lhs, rhs) {
        (Value::Number(m), Value::Number(n)) => Ok(Value::Number(m.powf(*n))),
        (Value::Number(_), Value::Null) => Ok(Value::Number(1.0)),
        (Value::Null, Value::Number(n)) => Ok(Value::Number(0f64.powf(*n))),
        _ => Err(illegal(rhs)),
    }
}

fn compare(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, Fault> {
    let (Value::Number(m), Value::Number(n)) = (lhs, rhs) else {
        let culprit = if matches!(lhs, Value::Number(_)) {
            rhs
        } else {
            lhs
        };
        return Err(illegal(culprit));
    };
    Ok(Value::Boolean(match op {
        BinOp::Less => m < n,
        BinOp::Greater => m > n,
        BinOp::LessEqual => m <= n,
        BinOp::GreaterEqual => m >= n,
        _ => unreachable!("non-comparison operators cannot be passed to this function"),
    }))
}

/// Longest string, in bytes, that `String * Number` may build.
pub const MAX_REPEAT_LEN: usize = 1 << 30;

fn repeat(s: &str, times: f64) -> Option<Value> {
    if !times.is_finite() || times < 0.0 || times.fract() != 0.0 || times > usize::MAX as f64 {
        return None;
    }
    if s.is_empty() {
        return Some(Value::Str(String::default()));
    }
    let times = times as usize;
    let len = s
        .len()
        .checked_mul(times)
        .filter(|len| *len <= MAX_REPEAT_LEN)?;
    let mut out = String::default();
    out.try_reserve_exact(len).ok()?;
    for _ in 0..times {
        out.push_str(s);
    }
    Some(Value::Str(out))
}

/// Resolves a numeric index against a length. Negative indices count from
/// the end; fractional or out of range indices resolve to `None`.
pub fn list_index(index: f64, len: usize) -> Option<usize> {
    if !index.is_finite() || index.fract() != 0.0 {
        return None;
    }
    let resolved = if index < 0.0 {
        len as f64 + index
    } else {
        index
    };
    (resolved >= 0.0 && resolved < len as f64).then_some(resolved as usize)
}

fn illegal(operand: &Value) -> Fault {
    Fault::IllegalOperation(operand.type_name())
}

/// Builds a list value; shared by the evaluator and the built-ins.
pub fn list_of(values: Vec<Value>) -> Value {
    Value::List(List::new(values))
}
