//! Arithmetic operators with the language's operand coercions.
//!
//! Every operand pair is reduced to a few canonical forms before the actual
//! operation runs:
//!
//! ```text
//!   bool      -> int, with a warning when mixed with other types
//!   array     -> its count, with a warning
//!   object    -> 1, with a warning
//!   array or object against bool, array or object in `/` -> unsupported
//!   string    -> its numeric prefix
//!   null      -> 0
//! ```
//!
//! Typed operands go through [`ScriptType::to_var`], so a statically typed
//! `i64` and a `Var` holding one follow the same rules.

use crate::compare;
use crate::convert::ScriptType;
use crate::diagnostics::warning;
use crate::numeric::Numeric;
use crate::string::KString;
use crate::var::{int_of_len, Var};

/// Which side of a binary operator a value is on.
#[derive(Clone, Copy)]
enum Side {
    First,
    Second,
}

impl Side {
    fn name(self) -> &'static str {
        match self {
            Side::First => "First",
            Side::Second => "Second",
        }
    }
}

fn unsupported(op: &str, lhs: &Var, rhs: &Var) {
    warning(&format!(
        "Unsupported operand types for operator '{op}' {} and {}",
        short_type_name(lhs),
        short_type_name(rhs)
    ));
}

/// Type names as operator warnings spell them.
fn short_type_name(value: &Var) -> &'static str {
    match value {
        Var::Bool(_) => "bool",
        Var::Array(_) => "array",
        Var::Object(_) => "object",
        other => other.type_name(),
    }
}

// ── Division ────────────────────────────────────────────────────────────

/// `lhs / rhs`, always a float.
pub fn divide<A: ScriptType, B: ScriptType>(lhs: &A, rhs: &B) -> f64 {
    divide_vars(&lhs.to_var(), &rhs.to_var())
}

fn divide_vars(lhs: &Var, rhs: &Var) -> f64 {
    match (lhs, rhs) {
        (Var::Bool(a), Var::Bool(b)) => {
            warning("Both arguments of operator '/' are bool");
            divide_floats(f64::from(u8::from(*a)), f64::from(u8::from(*b)))
        }
        (Var::Bool(_), Var::Array(_) | Var::Object(_))
        | (Var::Array(_) | Var::Object(_), Var::Bool(_) | Var::Array(_) | Var::Object(_)) => {
            unsupported("/", lhs, rhs);
            0.0
        }
        (Var::Bool(a), _) => {
            warning("First argument of operator '/' is bool");
            divide_vars(&Var::Int(i64::from(*a)), rhs)
        }
        (_, Var::Bool(b)) => {
            warning("Second argument of operator '/' is bool");
            divide_vars(lhs, &Var::Int(i64::from(*b)))
        }
        (Var::Array(a), _) => {
            warning("First argument of operator '/' is array");
            divide_vars(&Var::Int(int_of_len(a.count())), rhs)
        }
        (_, Var::Array(b)) => {
            warning("Second argument of operator '/' is array");
            divide_vars(lhs, &Var::Int(int_of_len(b.count())))
        }
        (Var::Object(_), _) => {
            warning("First argument of operator '/' is object");
            divide_vars(&Var::Float(1.0), rhs)
        }
        (_, Var::Object(_)) => {
            warning("Second argument of operator '/' is object");
            lhs.to_float()
        }
        _ => divide_floats(lhs.to_float(), rhs.to_float()),
    }
}

fn divide_floats(lhs: f64, rhs: f64) -> f64 {
    if rhs == 0.0 {
        warning("Float division by zero");
    }
    lhs / rhs
}

// ── Modulo ──────────────────────────────────────────────────────────────

/// `lhs % rhs` on integers. Division by zero warns and yields 0.
pub fn modulo<A: ScriptType, B: ScriptType>(lhs: &A, rhs: &B) -> i64 {
    let (lhs, rhs) = (lhs.to_var(), rhs.to_var());
    if let (Var::Int(a), Var::Int(b)) = (&lhs, &rhs) {
        return modulo_ints(*a, *b);
    }
    let (a, b) = (lhs.to_int(), rhs.to_int());
    if !compare::eq(&a, &lhs) {
        warning("First parameter of operator % is not an integer");
    }
    if !compare::eq(&b, &rhs) {
        warning("Second parameter of operator % is not an integer");
    }
    modulo_ints(a, b)
}

fn modulo_ints(lhs: i64, rhs: i64) -> i64 {
    if rhs == 0 {
        warning("Modulo by zero");
        return 0;
    }
    lhs.wrapping_rem(rhs)
}

// ── Power ───────────────────────────────────────────────────────────────

/// `base ** exp`.
///
/// Int base and non-negative int exponent stay integral (wrapping on
/// overflow); everything else is a float.
pub fn power<A: ScriptType, B: ScriptType>(base: &A, exp: &B) -> Var {
    let (base, exp) = (base.to_var(), exp.to_var());
    if let (Var::Int(b), Var::Int(e)) = (&base, &exp) {
        if let Ok(e) = u64::try_from(*e) {
            return Var::Int(int_power(*b, e));
        }
    }
    let float_base = base.to_float();
    if let Var::Int(e) = exp {
        return Var::Float(match i32::try_from(e) {
            Ok(e) => float_base.powi(e),
            Err(_) => float_base.powf(e as f64),
        });
    }
    let float_exp = exp.to_float();
    if float_exp == float_exp.trunc() {
        return Var::Float(float_base.powf(float_exp));
    }
    if float_base < 0.0 {
        warning("Calculating pow with negative base and double exp will produce zero");
        return Var::Float(0.0);
    }
    Var::Float(float_base.powf(float_exp))
}

/// Exponentiation by squaring with two's-complement wrapping.
pub fn int_power(mut base: i64, mut exp: u64) -> i64 {
    let mut result: i64 = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    result
}

// ── Additive and multiplicative operators ───────────────────────────────

/// An operand of `+`, `-`, `*` as a number.
fn numeric_operand(value: &Var, side: Side, op: &str) -> Numeric {
    match value {
        Var::Array(a) => {
            warning(&format!(
                "{} argument of operator '{op}' is array",
                side.name()
            ));
            Numeric::Int(int_of_len(a.count()))
        }
        Var::Object(_) => {
            warning(&format!(
                "{} argument of operator '{op}' is object",
                side.name()
            ));
            Numeric::Int(1)
        }
        other => other.to_numeric(),
    }
}

/// Apply an int operation, promoting to float when it overflows.
fn binary_numeric(
    lhs: Numeric,
    rhs: Numeric,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Var {
    match (lhs, rhs) {
        (Numeric::Int(a), Numeric::Int(b)) => int_op(a, b).map_or_else(
            || Var::Float(float_op(a as f64, b as f64)),
            Var::Int,
        ),
        _ => Var::Float(float_op(lhs.as_f64(), rhs.as_f64())),
    }
}

fn arithmetic(
    lhs: &Var,
    rhs: &Var,
    op: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Var {
    let a = numeric_operand(lhs, Side::First, op);
    let b = numeric_operand(rhs, Side::Second, op);
    binary_numeric(a, b, int_op, float_op)
}

/// `lhs + rhs`. Two arrays give their union, left entries winning.
pub fn add<A: ScriptType, B: ScriptType>(lhs: &A, rhs: &B) -> Var {
    let (lhs, rhs) = (lhs.to_var(), rhs.to_var());
    match (&lhs, &rhs) {
        (Var::Array(a), Var::Array(b)) => {
            let mut union = a.clone();
            union.union_with(b);
            Var::Array(union)
        }
        _ => arithmetic(&lhs, &rhs, "+", i64::checked_add, |a, b| a + b),
    }
}

/// `lhs - rhs`.
pub fn sub<A: ScriptType, B: ScriptType>(lhs: &A, rhs: &B) -> Var {
    arithmetic(&lhs.to_var(), &rhs.to_var(), "-", i64::checked_sub, |a, b| a - b)
}

/// `lhs * rhs`.
pub fn mul<A: ScriptType, B: ScriptType>(lhs: &A, rhs: &B) -> Var {
    arithmetic(&lhs.to_var(), &rhs.to_var(), "*", i64::checked_mul, |a, b| a * b)
}

/// Unary `-`.
pub fn negate<T: ScriptType>(value: &T) -> Var {
    match numeric_operand(&value.to_var(), Side::First, "-") {
        Numeric::Int(i) => i.checked_neg().map_or(Var::Float(-(i as f64)), Var::Int),
        Numeric::Float(f) => Var::Float(-f),
    }
}

// ── Concatenation ───────────────────────────────────────────────────────

/// `dest .= from`. A non-string `dest` is converted to a string first.
pub fn append<T: ScriptType>(dest: &mut Var, from: &T) {
    let suffix = from.strval();
    if !dest.is_string() {
        *dest = Var::String(dest.to_string());
    }
    if let Var::String(s) = dest {
        s.append(suffix.as_bytes());
    }
}

/// `dest .= from` on a typed string.
pub fn append_to<T: ScriptType>(dest: &mut KString, from: &T) {
    let suffix = from.strval();
    dest.append(suffix.as_bytes());
}

#[cfg(test)]
mod tests;
