//! Copy-on-write byte string.

use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use crate::numeric::{self, Numeric};

/// Reference-counted byte string with value semantics.
///
/// Cloning shares the buffer. Every mutating method first makes the buffer
/// unique (copying it when other owners exist), so no other owner ever
/// observes the change.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KString(Rc<Vec<u8>>);

impl KString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        KString(Rc::new(Vec::with_capacity(capacity)))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        KString(Rc::new(bytes.to_vec()))
    }

    pub fn from_int(value: i64) -> Self {
        KString::from(value.to_string())
    }

    /// `%.14G`-style text of a float.
    pub fn from_float(value: f64) -> Self {
        KString::from(numeric::format_float(value))
    }

    // ── Reading (never copies) ──────────────────────────────────────────

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.0.capacity()
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.0.get(index).copied()
    }

    pub fn slice(&self, range: Range<usize>) -> Option<&[u8]> {
        self.0.get(range)
    }

    /// Number of owners of the buffer.
    pub fn get_reference_counter(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn is_shared(&self) -> bool {
        self.get_reference_counter() > 1
    }

    pub fn ptr_eq(&self, other: &KString) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ── Writing (copy on write) ─────────────────────────────────────────

    fn bytes_mut(&mut self) -> &mut Vec<u8> {
        Rc::make_mut(&mut self.0)
    }

    pub fn append(&mut self, bytes: &[u8]) -> &mut Self {
        if self.is_shared() {
            let mut fresh = Vec::with_capacity(self.len() + bytes.len());
            fresh.extend_from_slice(&self.0);
            fresh.extend_from_slice(bytes);
            self.0 = Rc::new(fresh);
        } else {
            self.bytes_mut().extend_from_slice(bytes);
        }
        self
    }

    pub fn push(&mut self, byte: u8) {
        self.append(&[byte]);
    }

    /// Overwrite one byte. Returns `false` when `index` is out of range.
    pub fn set(&mut self, index: usize, byte: u8) -> bool {
        if index >= self.len() {
            return false;
        }
        self.bytes_mut()[index] = byte;
        true
    }

    pub fn truncate(&mut self, len: usize) {
        if len < self.len() {
            self.bytes_mut().truncate(len);
        }
    }

    pub fn clear(&mut self) {
        if self.is_shared() {
            self.0 = Rc::default();
        } else {
            self.bytes_mut().clear();
        }
    }

    // ── Coercions ───────────────────────────────────────────────────────

    /// Only `""` and `"0"` are false.
    pub fn to_bool(&self) -> bool {
        !(self.is_empty() || self.as_bytes() == b"0")
    }

    pub fn to_int(&self) -> i64 {
        numeric::parse_int_prefix(self.as_bytes())
    }

    pub fn to_float(&self) -> f64 {
        numeric::parse_float_prefix(self.as_bytes())
    }

    pub fn is_numeric(&self) -> bool {
        numeric::is_numeric(self.as_bytes())
    }

    /// Whole-string numeric value, if the string is numeric.
    pub fn to_numeric(&self) -> Option<Numeric> {
        numeric::parse_numeric(self.as_bytes())
    }

    /// Value of the numeric prefix, used when a string meets a number.
    pub fn to_numeric_prefix(&self) -> Numeric {
        numeric::parse_numeric_prefix(self.as_bytes())
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}

impl From<&str> for KString {
    fn from(s: &str) -> Self {
        KString::from_bytes(s.as_bytes())
    }
}

impl From<String> for KString {
    fn from(s: String) -> Self {
        KString(Rc::new(s.into_bytes()))
    }
}

impl From<&[u8]> for KString {
    fn from(bytes: &[u8]) -> Self {
        KString::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for KString {
    fn from(bytes: Vec<u8>) -> Self {
        KString(Rc::new(bytes))
    }
}

impl PartialEq<str> for KString {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for KString {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Display for KString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for KString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.as_bytes()))
    }
}
