//! The dynamic value type.

use crate::array::{Array, ArrayKey};
use crate::class::{ClassInstance, ObjectRef};
use crate::convert::float_to_int;
use crate::diagnostics::warning;
use crate::numeric::Numeric;
use crate::optional::{Optional, OptionalState};
use crate::string::KString;

/// A value of any script type.
///
/// `==` on `Var` is the strict comparison (`===`): same type and same value,
/// arrays entry by entry in order, objects by identity. Loose comparison lives
/// in [`crate::compare`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Var {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(KString),
    Array(Array<Var>),
    Object(ObjectRef),
}

/// `len` as a script integer.
pub(crate) fn int_of_len(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

impl Var {
    pub fn new_array() -> Self {
        Var::Array(Array::new())
    }

    // ── Type predicates ─────────────────────────────────────────────────

    pub fn is_null(&self) -> bool {
        matches!(self, Var::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Var::Bool(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Var::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Var::Float(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Var::String(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Var::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Var::Object(_))
    }

    /// Ints, floats, and strings that are entirely a number.
    pub fn is_numeric(&self) -> bool {
        match self {
            Var::Int(_) | Var::Float(_) => true,
            Var::String(s) => s.is_numeric(),
            _ => false,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Var::Bool(_) | Var::Int(_) | Var::Float(_) | Var::String(_)
        )
    }

    /// The name `gettype` reports.
    pub fn type_name(&self) -> &'static str {
        match self {
            Var::Null => "NULL",
            Var::Bool(_) => "boolean",
            Var::Int(_) => "integer",
            Var::Float(_) => "double",
            Var::String(_) => "string",
            Var::Array(_) => "array",
            Var::Object(_) => "object",
        }
    }

    // ── Borrowing accessors ─────────────────────────────────────────────

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Var::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Var::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Var::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&KString> {
        match self {
            Var::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array<Var>> {
        match self {
            Var::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array<Var>> {
        match self {
            Var::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Var::Object(o) => Some(o),
            _ => None,
        }
    }

    // ── Conversions ─────────────────────────────────────────────────────

    pub fn to_bool(&self) -> bool {
        match self {
            Var::Null => false,
            Var::Bool(b) => *b,
            Var::Int(i) => *i != 0,
            Var::Float(f) => *f != 0.0,
            Var::String(s) => s.to_bool(),
            Var::Array(a) => !a.is_empty(),
            Var::Object(_) => true,
        }
    }

    pub fn to_int(&self) -> i64 {
        match self {
            Var::Null => 0,
            Var::Bool(b) => i64::from(*b),
            Var::Int(i) => *i,
            Var::Float(f) => float_to_int(*f),
            Var::String(s) => s.to_int(),
            Var::Array(a) => {
                warning("Wrong convertion from array to int");
                i64::from(!a.is_empty())
            }
            Var::Object(_) => {
                warning("Wrong convertion from object to int");
                1
            }
        }
    }

    pub fn to_float(&self) -> f64 {
        match self {
            Var::Null => 0.0,
            Var::Bool(b) => f64::from(u8::from(*b)),
            Var::Int(i) => *i as f64,
            Var::Float(f) => *f,
            Var::String(s) => s.to_float(),
            Var::Array(a) => {
                warning("Wrong convertion from array to float");
                f64::from(u8::from(!a.is_empty()))
            }
            Var::Object(_) => {
                warning("Wrong convertion from object to float");
                1.0
            }
        }
    }

    pub fn to_string(&self) -> KString {
        match self {
            Var::Null | Var::Bool(false) => KString::new(),
            Var::Bool(true) => KString::from("1"),
            Var::Int(i) => KString::from_int(*i),
            Var::Float(f) => KString::from_float(*f),
            Var::String(s) => s.clone(),
            Var::Array(_) => {
                warning("Convertion from array to string");
                KString::from("Array")
            }
            Var::Object(o) => KString::from(o.class_name()),
        }
    }

    pub fn to_array(&self) -> Array<Var> {
        match self {
            Var::Null => Array::new(),
            Var::Array(a) => a.clone(),
            Var::Object(_) => {
                warning("Can not convert class instance to array");
                Array::new()
            }
            scalar => Array::from_vec(vec![scalar.clone()]),
        }
    }

    /// Number used when the value meets an arithmetic operator; arrays and
    /// objects are the caller's business.
    pub(crate) fn to_numeric(&self) -> Numeric {
        match self {
            Var::Float(f) => Numeric::Float(*f),
            Var::String(s) => s.to_numeric_prefix(),
            other => Numeric::Int(other.to_int()),
        }
    }

    // ── In-place conversions ────────────────────────────────────────────

    /// Warn that `function` got a value of the wrong type.
    fn wrong_parameter(&self, function: &str, expected: &str) {
        warning(&format!(
            "{function}() expects parameter to be {expected}, {} is given",
            self.type_name()
        ));
    }

    /// Convert to bool in place and return the payload.
    pub fn make_bool(&mut self, function: &str) -> &mut bool {
        if !self.is_bool() {
            let value = match &*self {
                Var::Array(_) | Var::Object(_) => {
                    self.wrong_parameter(function, "bool");
                    false
                }
                other => other.to_bool(),
            };
            *self = Var::Bool(value);
        }
        match self {
            Var::Bool(b) => b,
            _ => unreachable!("converted to bool above"),
        }
    }

    /// Convert to int in place and return the payload.
    pub fn make_int(&mut self, function: &str) -> &mut i64 {
        if !self.is_int() {
            let value = match &*self {
                Var::Array(_) | Var::Object(_) => {
                    self.wrong_parameter(function, "int");
                    0
                }
                other => other.to_int(),
            };
            *self = Var::Int(value);
        }
        match self {
            Var::Int(i) => i,
            _ => unreachable!("converted to int above"),
        }
    }

    /// Convert to float in place and return the payload.
    pub fn make_float(&mut self, function: &str) -> &mut f64 {
        if !self.is_float() {
            let value = match &*self {
                Var::Array(_) | Var::Object(_) => {
                    self.wrong_parameter(function, "float");
                    0.0
                }
                other => other.to_float(),
            };
            *self = Var::Float(value);
        }
        match self {
            Var::Float(f) => f,
            _ => unreachable!("converted to float above"),
        }
    }

    /// Convert to string in place and return the payload.
    pub fn make_string(&mut self, function: &str) -> &mut KString {
        if !self.is_string() {
            let value = match &*self {
                Var::Array(_) | Var::Object(_) => {
                    self.wrong_parameter(function, "string");
                    KString::new()
                }
                other => other.to_string(),
            };
            *self = Var::String(value);
        }
        match self {
            Var::String(s) => s,
            _ => unreachable!("converted to string above"),
        }
    }

    /// Convert to array in place and return the payload.
    pub fn make_array(&mut self, function: &str) -> &mut Array<Var> {
        if !self.is_array() {
            self.wrong_parameter(function, "array");
            *self = Var::new_array();
        }
        match self {
            Var::Array(a) => a,
            _ => unreachable!("converted to array above"),
        }
    }

    // ── Container access ────────────────────────────────────────────────

    /// Number of elements. Null counts as 0, other non-arrays as 1.
    pub fn count(&self) -> i64 {
        match self {
            Var::Array(a) => int_of_len(a.count()),
            Var::Null => 0,
            _ => {
                warning("Count on non-array");
                1
            }
        }
    }

    /// Owners of the payload buffer; 0 for unboxed values.
    pub fn get_reference_counter(&self) -> usize {
        match self {
            Var::String(s) => s.get_reference_counter(),
            Var::Array(a) => a.get_reference_counter(),
            Var::Object(o) => o.strong_count(),
            Var::Null | Var::Bool(_) | Var::Int(_) | Var::Float(_) => 0,
        }
    }

    /// Key this value addresses when used as an array offset.
    ///
    /// Arrays and objects are illegal offsets: a warning is reported and
    /// `None` returned.
    pub fn to_array_key(&self) -> Option<ArrayKey> {
        match self {
            Var::Null => Some(ArrayKey::Str(KString::new())),
            Var::Bool(b) => Some(ArrayKey::from(*b)),
            Var::Int(i) => Some(ArrayKey::Int(*i)),
            Var::Float(f) => Some(ArrayKey::from(*f)),
            Var::String(s) => Some(ArrayKey::from(s)),
            Var::Array(_) | Var::Object(_) => {
                warning("Illegal offset type");
                None
            }
        }
    }

    /// `$v[key]` as an rvalue.
    ///
    /// Missing keys and non-container values read as null. A string yields
    /// the one-byte string at an in-range int offset.
    pub fn get_value(&self, key: &Var) -> Var {
        match self {
            Var::Array(a) => key
                .to_array_key()
                .and_then(|k| a.get_by_key(&k).cloned())
                .unwrap_or_default(),
            Var::String(s) => {
                let byte = usize::try_from(key.to_int()).ok().and_then(|i| s.get(i));
                Var::String(byte.map_or_else(KString::new, |b| KString::from_bytes(&[b])))
            }
            _ => Var::Null,
        }
    }

    /// `$v[key] = value`. Null and false become an empty array first; other
    /// scalars refuse with a warning.
    pub fn set_value(&mut self, key: &Var, value: Var) {
        let Some(array) = self.vivify_array() else {
            return;
        };
        if let Some(key) = key.to_array_key() {
            array.set(key, value);
        }
    }

    /// `$v[] = value`.
    pub fn push_back(&mut self, value: Var) {
        if let Some(array) = self.vivify_array() {
            array.push_back(value);
        }
    }

    /// `unset($v[key])`.
    pub fn unset_value(&mut self, key: &Var) {
        if let Var::Array(a) = self {
            if let Some(key) = key.to_array_key() {
                a.erase(key);
            }
        }
    }

    pub fn has_key(&self, key: &Var) -> bool {
        match self {
            Var::Array(a) => key.to_array_key().is_some_and(|k| a.get_by_key(&k).is_some()),
            _ => false,
        }
    }

    fn vivify_array(&mut self) -> Option<&mut Array<Var>> {
        if matches!(self, Var::Null | Var::Bool(false)) {
            *self = Var::new_array();
        }
        match self {
            Var::Array(a) => Some(a),
            _ => {
                warning("Cannot use a scalar value as an array");
                None
            }
        }
    }
}

impl From<bool> for Var {
    fn from(b: bool) -> Self {
        Var::Bool(b)
    }
}

impl From<i64> for Var {
    fn from(i: i64) -> Self {
        Var::Int(i)
    }
}

impl From<i32> for Var {
    fn from(i: i32) -> Self {
        Var::Int(i64::from(i))
    }
}

impl From<f64> for Var {
    fn from(f: f64) -> Self {
        Var::Float(f)
    }
}

impl From<KString> for Var {
    fn from(s: KString) -> Self {
        Var::String(s)
    }
}

impl From<&str> for Var {
    fn from(s: &str) -> Self {
        Var::String(KString::from(s))
    }
}

impl From<String> for Var {
    fn from(s: String) -> Self {
        Var::String(KString::from(s))
    }
}

impl From<Array<Var>> for Var {
    fn from(array: Array<Var>) -> Self {
        Var::Array(array)
    }
}

impl From<ObjectRef> for Var {
    fn from(object: ObjectRef) -> Self {
        Var::Object(object)
    }
}

/// A null handle becomes null.
impl<C> From<ClassInstance<C>> for Var {
    fn from(instance: ClassInstance<C>) -> Self {
        instance.into_object().map_or(Var::Null, Var::Object)
    }
}

/// The sentinels become `false` and null.
impl<T: Into<Var> + Default> From<Optional<T>> for Var {
    fn from(mut optional: Optional<T>) -> Self {
        let state = optional.value_state();
        match optional.take() {
            Some(value) => value.into(),
            None if state == OptionalState::FalseValue => Var::Bool(false),
            None => Var::Null,
        }
    }
}
