//! Array keys and their normalization.

use std::fmt;

use crate::string::KString;

/// Key of an array entry.
///
/// String keys that spell a canonical integer are stored as [`ArrayKey::Int`],
/// so `"5"` and `5` address the same slot. Use the `From` impls (or
/// [`ArrayKey::from_bytes`]) to build keys; constructing `Str` directly skips
/// normalization.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArrayKey {
    Int(i64),
    Str(KString),
}

impl ArrayKey {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match canonical_int(bytes) {
            Some(i) => ArrayKey::Int(i),
            None => ArrayKey::Str(KString::from_bytes(bytes)),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArrayKey::Int(i) => Some(*i),
            ArrayKey::Str(_) => None,
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, ArrayKey::Int(_))
    }

    /// The key as a string value.
    pub fn to_kstring(&self) -> KString {
        match self {
            ArrayKey::Int(i) => KString::from_int(*i),
            ArrayKey::Str(s) => s.clone(),
        }
    }
}

/// `Some(n)` when `bytes` is exactly how `n` prints: no sign other than a
/// leading `-`, no leading zeros, no `-0`, and within `i64`.
pub fn canonical_int(bytes: &[u8]) -> Option<i64> {
    let digits = match bytes {
        [b'-', rest @ ..] => rest,
        _ => bytes,
    };
    match digits {
        [] => return None,
        [b'0'] => return (digits.len() == bytes.len()).then_some(0),
        [b'0', ..] => return None,
        _ => {}
    }
    if digits.len() > 19 || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

impl From<i64> for ArrayKey {
    fn from(i: i64) -> Self {
        ArrayKey::Int(i)
    }
}

impl From<i32> for ArrayKey {
    fn from(i: i32) -> Self {
        ArrayKey::Int(i64::from(i))
    }
}

impl From<usize> for ArrayKey {
    fn from(i: usize) -> Self {
        ArrayKey::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<bool> for ArrayKey {
    fn from(b: bool) -> Self {
        ArrayKey::Int(i64::from(b))
    }
}

/// Floats truncate toward zero.
impl From<f64> for ArrayKey {
    fn from(f: f64) -> Self {
        ArrayKey::Int(crate::convert::float_to_int(f))
    }
}

impl From<&str> for ArrayKey {
    fn from(s: &str) -> Self {
        ArrayKey::from_bytes(s.as_bytes())
    }
}

impl From<&[u8]> for ArrayKey {
    fn from(bytes: &[u8]) -> Self {
        ArrayKey::from_bytes(bytes)
    }
}

impl From<KString> for ArrayKey {
    fn from(s: KString) -> Self {
        match canonical_int(s.as_bytes()) {
            Some(i) => ArrayKey::Int(i),
            None => ArrayKey::Str(s),
        }
    }
}

impl From<&KString> for ArrayKey {
    fn from(s: &KString) -> Self {
        ArrayKey::from(s.clone())
    }
}

impl From<&ArrayKey> for ArrayKey {
    fn from(key: &ArrayKey) -> Self {
        key.clone()
    }
}

impl fmt::Debug for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKey::Int(i) => write!(f, "{i}"),
            ArrayKey::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl fmt::Display for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKey::Int(i) => write!(f, "{i}"),
            ArrayKey::Str(s) => write!(f, "{s}"),
        }
    }
}
