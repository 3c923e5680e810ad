//! Loose and strict comparison.
//!
//! [`compare`] implements the loose ordering between two dynamic values.
//! `None` means the pair is unordered: NaN on either side, or arrays with the
//! same count whose keys differ. Every loose operator derives from it, so
//! `lt`, `gt` and `eq` are all false for an unordered pair.
//!
//! Operand pairs are resolved in this order, symmetrically:
//!
//! | Pair                    | Compared as                              |
//! |-------------------------|------------------------------------------|
//! | null, string            | `""` against the string, bytewise        |
//! | bool or null, any       | both as bool                             |
//! | number, number          | numbers (int/float mixes as float)       |
//! | string, string          | numbers if both numeric, else bytewise   |
//! | number, string          | the string's numeric prefix              |
//! | object, object          | identity, then address                   |
//! | object, any             | the object is greater                    |
//! | array, array            | count, then entry by entry in lhs order  |
//! | array, any              | the array is greater                     |

use std::cmp::Ordering;

use crate::array::Array;
use crate::convert::ScriptType;
use crate::numeric::Numeric;
use crate::stack::ensure_sufficient_stack;
use crate::string::KString;
use crate::var::Var;

/// Loose ordering of two values; `None` when unordered.
pub fn compare(lhs: &Var, rhs: &Var) -> Option<Ordering> {
    use Var::{Array, Bool, Float, Int, Null, Object, String};

    match (lhs, rhs) {
        (Null, Null) => Some(Ordering::Equal),
        (Null, String(s)) => Some(b"".as_slice().cmp(s.as_bytes())),
        (String(s), Null) => Some(s.as_bytes().cmp(b"".as_slice())),
        (Bool(_) | Null, _) | (_, Bool(_) | Null) => Some(lhs.to_bool().cmp(&rhs.to_bool())),
        (Int(a), Int(b)) => Some(a.cmp(b)),
        (Int(_) | Float(_), Int(_) | Float(_)) => {
            compare_numbers(lhs.to_numeric(), rhs.to_numeric())
        }
        (String(a), String(b)) => compare_strings(a, b),
        (Int(_) | Float(_), String(s)) => compare_numbers(lhs.to_numeric(), s.to_numeric_prefix()),
        (String(s), Int(_) | Float(_)) => compare_numbers(s.to_numeric_prefix(), rhs.to_numeric()),
        (Object(a), Object(b)) if a.ptr_eq(b) => Some(Ordering::Equal),
        (Object(a), Object(b)) => Some(a.addr().cmp(&b.addr())),
        (Object(_), _) => Some(Ordering::Greater),
        (_, Object(_)) => Some(Ordering::Less),
        (Array(a), Array(b)) => compare_arrays(a, b),
        (Array(_), _) => Some(Ordering::Greater),
        (_, Array(_)) => Some(Ordering::Less),
    }
}

fn compare_numbers(lhs: Numeric, rhs: Numeric) -> Option<Ordering> {
    match (lhs, rhs) {
        (Numeric::Int(a), Numeric::Int(b)) => Some(a.cmp(&b)),
        _ => lhs.as_f64().partial_cmp(&rhs.as_f64()),
    }
}

fn compare_strings(lhs: &KString, rhs: &KString) -> Option<Ordering> {
    match (lhs.to_numeric(), rhs.to_numeric()) {
        (Some(a), Some(b)) => compare_numbers(a, b),
        _ => Some(lhs.as_bytes().cmp(rhs.as_bytes())),
    }
}

fn compare_arrays(lhs: &Array<Var>, rhs: &Array<Var>) -> Option<Ordering> {
    match lhs.count().cmp(&rhs.count()) {
        Ordering::Equal => {}
        unequal => return Some(unequal),
    }
    ensure_sufficient_stack(|| {
        for (key, value) in lhs {
            let other = rhs.get_by_key(&key)?;
            match compare(value, other)? {
                Ordering::Equal => {}
                unequal => return Some(unequal),
            }
        }
        Some(Ordering::Equal)
    })
}

// ── Operators ───────────────────────────────────────────────────────────

/// `lhs < rhs`.
pub fn lt<A: ScriptType, B: ScriptType>(lhs: &A, rhs: &B) -> bool {
    compare(&lhs.to_var(), &rhs.to_var()) == Some(Ordering::Less)
}

/// `lhs > rhs`.
pub fn gt<A: ScriptType, B: ScriptType>(lhs: &A, rhs: &B) -> bool {
    compare(&lhs.to_var(), &rhs.to_var()) == Some(Ordering::Greater)
}

pub fn leq<A: ScriptType, B: ScriptType>(lhs: &A, rhs: &B) -> bool {
    matches!(
        compare(&lhs.to_var(), &rhs.to_var()),
        Some(Ordering::Less | Ordering::Equal)
    )
}

pub fn geq<A: ScriptType, B: ScriptType>(lhs: &A, rhs: &B) -> bool {
    matches!(
        compare(&lhs.to_var(), &rhs.to_var()),
        Some(Ordering::Greater | Ordering::Equal)
    )
}

/// `lhs == rhs`.
pub fn eq<A: ScriptType, B: ScriptType>(lhs: &A, rhs: &B) -> bool {
    compare(&lhs.to_var(), &rhs.to_var()) == Some(Ordering::Equal)
}

/// `lhs != rhs`.
pub fn neq<A: ScriptType, B: ScriptType>(lhs: &A, rhs: &B) -> bool {
    !eq(lhs, rhs)
}

/// `lhs === rhs`.
pub fn strict_eq<A: ScriptType, B: ScriptType>(lhs: &A, rhs: &B) -> bool {
    lhs.to_var() == rhs.to_var()
}

/// `lhs <=> rhs`: -1 if less, 1 if greater, 0 otherwise.
pub fn spaceship<A: ScriptType, B: ScriptType>(lhs: &A, rhs: &B) -> i64 {
    match compare(&lhs.to_var(), &rhs.to_var()) {
        Some(Ordering::Less) => -1,
        Some(Ordering::Greater) => 1,
        Some(Ordering::Equal) | None => 0,
    }
}

#[cfg(test)]
mod tests;
