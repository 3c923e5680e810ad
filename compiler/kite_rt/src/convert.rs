//! Conversion builtins over every script type.
//!
//! Values whose type the compiler knows statically are plain Rust types
//! (`bool`, `i64`, `f64`, [`KString`], [`Array<T>`], [`Optional<T>`],
//! [`ClassInstance<C>`]); everything else is a [`Var`]. [`ScriptType`] gives
//! all of them the same conversion surface, so the builtins below are written
//! once and apply the same rules whichever representation a value has.

use crate::array::Array;
use crate::class::{ClassInstance, ScriptClass};
use crate::diagnostics::warning;
use crate::optional::{Optional, OptionalState};
use crate::string::KString;
use crate::var::{int_of_len, Var};

/// Truncate toward zero. NaN becomes 0; out-of-range values saturate.
pub fn float_to_int(value: f64) -> i64 {
    value as i64
}

/// A value the script can hold.
pub trait ScriptType: Clone {
    /// Whether the type can represent `false`, so that `(array) false` has an
    /// element to hold.
    const CAN_HOLD_FALSE: bool = false;

    /// `gettype` name.
    fn type_name(&self) -> &'static str;

    fn boolval(&self) -> bool;
    fn intval(&self) -> i64;
    fn floatval(&self) -> f64;
    fn strval(&self) -> KString;
    fn to_var(&self) -> Var;

    /// `arrayval` result for types whose array element type is `Var`.
    fn arrayval(&self) -> Array<Var> {
        self.to_var().to_array()
    }

    fn is_null(&self) -> bool {
        false
    }

    fn is_bool(&self) -> bool {
        false
    }

    fn is_int(&self) -> bool {
        false
    }

    fn is_float(&self) -> bool {
        false
    }

    fn is_string(&self) -> bool {
        false
    }

    fn is_array(&self) -> bool {
        false
    }

    fn is_object(&self) -> bool {
        false
    }

    fn is_numeric(&self) -> bool {
        false
    }

    fn is_scalar(&self) -> bool {
        false
    }

    fn count(&self) -> i64 {
        warning("Count on non-array");
        1
    }

    fn empty(&self) -> bool {
        !self.boolval()
    }

    fn get_class(&self) -> KString {
        warning(&format!("Called get_class() on {}", self.type_name()));
        KString::new()
    }

    /// Owners of the payload buffer; 0 for unboxed values.
    fn get_reference_counter(&self) -> usize {
        0
    }
}

impl ScriptType for bool {
    const CAN_HOLD_FALSE: bool = true;

    fn type_name(&self) -> &'static str {
        "boolean"
    }

    fn boolval(&self) -> bool {
        *self
    }

    fn intval(&self) -> i64 {
        i64::from(*self)
    }

    fn floatval(&self) -> f64 {
        f64::from(u8::from(*self))
    }

    fn strval(&self) -> KString {
        Var::Bool(*self).to_string()
    }

    fn to_var(&self) -> Var {
        Var::Bool(*self)
    }

    fn is_bool(&self) -> bool {
        true
    }

    fn is_scalar(&self) -> bool {
        true
    }
}

impl ScriptType for i64 {
    fn type_name(&self) -> &'static str {
        "integer"
    }

    fn boolval(&self) -> bool {
        *self != 0
    }

    fn intval(&self) -> i64 {
        *self
    }

    fn floatval(&self) -> f64 {
        *self as f64
    }

    fn strval(&self) -> KString {
        KString::from_int(*self)
    }

    fn to_var(&self) -> Var {
        Var::Int(*self)
    }

    fn is_int(&self) -> bool {
        true
    }

    fn is_numeric(&self) -> bool {
        true
    }

    fn is_scalar(&self) -> bool {
        true
    }
}

impl ScriptType for f64 {
    fn type_name(&self) -> &'static str {
        "double"
    }

    fn boolval(&self) -> bool {
        *self != 0.0
    }

    fn intval(&self) -> i64 {
        float_to_int(*self)
    }

    fn floatval(&self) -> f64 {
        *self
    }

    fn strval(&self) -> KString {
        KString::from_float(*self)
    }

    fn to_var(&self) -> Var {
        Var::Float(*self)
    }

    fn is_float(&self) -> bool {
        true
    }

    fn is_numeric(&self) -> bool {
        true
    }

    fn is_scalar(&self) -> bool {
        true
    }
}

impl ScriptType for KString {
    fn type_name(&self) -> &'static str {
        "string"
    }

    fn boolval(&self) -> bool {
        self.to_bool()
    }

    fn intval(&self) -> i64 {
        self.to_int()
    }

    fn floatval(&self) -> f64 {
        self.to_float()
    }

    fn strval(&self) -> KString {
        self.clone()
    }

    fn to_var(&self) -> Var {
        Var::String(self.clone())
    }

    fn is_string(&self) -> bool {
        true
    }

    fn is_numeric(&self) -> bool {
        KString::is_numeric(self)
    }

    fn is_scalar(&self) -> bool {
        true
    }

    fn get_reference_counter(&self) -> usize {
        KString::get_reference_counter(self)
    }
}

impl<T: ScriptType> ScriptType for Array<T> {
    fn type_name(&self) -> &'static str {
        "array"
    }

    fn boolval(&self) -> bool {
        !self.is_empty()
    }

    fn intval(&self) -> i64 {
        warning("Wrong convertion from array to int");
        i64::from(!self.is_empty())
    }

    fn floatval(&self) -> f64 {
        warning("Wrong convertion from array to float");
        f64::from(u8::from(!self.is_empty()))
    }

    fn strval(&self) -> KString {
        warning("Convertion from array to string");
        KString::from("Array")
    }

    fn to_var(&self) -> Var {
        Var::Array(self.iter().map(|(key, value)| (key, value.to_var())).collect())
    }

    fn is_array(&self) -> bool {
        true
    }

    fn count(&self) -> i64 {
        int_of_len(Array::count(self))
    }

    fn get_reference_counter(&self) -> usize {
        Array::get_reference_counter(self)
    }
}

impl<C: ScriptClass> ScriptType for ClassInstance<C> {
    fn type_name(&self) -> &'static str {
        "object"
    }

    fn boolval(&self) -> bool {
        !ClassInstance::is_null(self)
    }

    fn intval(&self) -> i64 {
        warning("Wrong convertion from object to int");
        1
    }

    fn floatval(&self) -> f64 {
        warning("Wrong convertion from object to float");
        1.0
    }

    fn strval(&self) -> KString {
        KString::from(ClassInstance::get_class(self))
    }

    fn to_var(&self) -> Var {
        Var::from(self.clone())
    }

    fn arrayval(&self) -> Array<Var> {
        warning("Can not convert class instance to array");
        Array::new()
    }

    fn is_null(&self) -> bool {
        ClassInstance::is_null(self)
    }

    fn is_object(&self) -> bool {
        !ClassInstance::is_null(self)
    }

    fn empty(&self) -> bool {
        ClassInstance::is_null(self)
    }

    fn get_class(&self) -> KString {
        KString::from(ClassInstance::get_class(self))
    }

    fn get_reference_counter(&self) -> usize {
        ClassInstance::get_reference_counter(self)
    }
}

impl ScriptType for Var {
    const CAN_HOLD_FALSE: bool = true;

    fn type_name(&self) -> &'static str {
        Var::type_name(self)
    }

    fn boolval(&self) -> bool {
        self.to_bool()
    }

    fn intval(&self) -> i64 {
        self.to_int()
    }

    fn floatval(&self) -> f64 {
        self.to_float()
    }

    fn strval(&self) -> KString {
        self.to_string()
    }

    fn to_var(&self) -> Var {
        self.clone()
    }

    fn arrayval(&self) -> Array<Var> {
        self.to_array()
    }

    fn is_null(&self) -> bool {
        Var::is_null(self)
    }

    fn is_bool(&self) -> bool {
        Var::is_bool(self)
    }

    fn is_int(&self) -> bool {
        Var::is_int(self)
    }

    fn is_float(&self) -> bool {
        Var::is_float(self)
    }

    fn is_string(&self) -> bool {
        Var::is_string(self)
    }

    fn is_array(&self) -> bool {
        Var::is_array(self)
    }

    fn is_object(&self) -> bool {
        Var::is_object(self)
    }

    fn is_numeric(&self) -> bool {
        Var::is_numeric(self)
    }

    fn is_scalar(&self) -> bool {
        Var::is_scalar(self)
    }

    fn count(&self) -> i64 {
        Var::count(self)
    }

    fn get_class(&self) -> KString {
        match self {
            Var::Object(o) => KString::from(o.class_name()),
            other => {
                warning(&format!("Called get_class() on {}", other.type_name()));
                KString::new()
            }
        }
    }

    fn get_reference_counter(&self) -> usize {
        Var::get_reference_counter(self)
    }
}

/// Absent states convert like `false`; predicates look at the payload when
/// there is one.
impl<T: ScriptType> ScriptType for Optional<T> {
    fn type_name(&self) -> &'static str {
        match self.value_state() {
            OptionalState::HasValue => self.val().type_name(),
            OptionalState::FalseValue => "boolean",
            OptionalState::NullValue => "NULL",
        }
    }

    fn boolval(&self) -> bool {
        self.as_option().is_some_and(ScriptType::boolval)
    }

    fn intval(&self) -> i64 {
        self.as_option().map_or(0, ScriptType::intval)
    }

    fn floatval(&self) -> f64 {
        self.as_option().map_or(0.0, ScriptType::floatval)
    }

    fn strval(&self) -> KString {
        self.as_option().map_or_else(KString::new, ScriptType::strval)
    }

    fn to_var(&self) -> Var {
        match self.value_state() {
            OptionalState::HasValue => self.val().to_var(),
            OptionalState::FalseValue => Var::Bool(false),
            OptionalState::NullValue => Var::Null,
        }
    }

    fn arrayval(&self) -> Array<Var> {
        match self.value_state() {
            OptionalState::HasValue => self.val().arrayval(),
            OptionalState::FalseValue => false_to_array::<T, Var>(),
            OptionalState::NullValue => Array::new(),
        }
    }

    fn is_null(&self) -> bool {
        self.as_option().map_or(Optional::is_null(self), ScriptType::is_null)
    }

    fn is_bool(&self) -> bool {
        self.as_option().map_or(self.is_false(), ScriptType::is_bool)
    }

    fn is_int(&self) -> bool {
        self.as_option().is_some_and(ScriptType::is_int)
    }

    fn is_float(&self) -> bool {
        self.as_option().is_some_and(ScriptType::is_float)
    }

    fn is_string(&self) -> bool {
        self.as_option().is_some_and(ScriptType::is_string)
    }

    fn is_array(&self) -> bool {
        self.as_option().is_some_and(ScriptType::is_array)
    }

    fn is_object(&self) -> bool {
        self.as_option().is_some_and(ScriptType::is_object)
    }

    fn is_numeric(&self) -> bool {
        self.as_option().is_some_and(ScriptType::is_numeric)
    }

    /// The false sentinel is a bool, and bools are scalars.
    fn is_scalar(&self) -> bool {
        self.as_option().map_or(self.is_false(), ScriptType::is_scalar)
    }

    /// Null counts as 0, false as a non-array.
    fn count(&self) -> i64 {
        match self.value_state() {
            OptionalState::HasValue => self.val().count(),
            OptionalState::FalseValue => false.count(),
            OptionalState::NullValue => 0,
        }
    }

    fn empty(&self) -> bool {
        self.as_option().map_or(true, ScriptType::empty)
    }

    fn get_class(&self) -> KString {
        match self.as_option() {
            Some(value) => value.get_class(),
            None => {
                warning(&format!("Called get_class() on {}", self.type_name()));
                KString::new()
            }
        }
    }

    fn get_reference_counter(&self) -> usize {
        self.as_option().map_or(0, ScriptType::get_reference_counter)
    }
}

/// `(array) false`. The language gives `[false]`, which only fits element
/// types that can hold `false`; the result is always empty, with a warning
/// where the difference can matter.
fn false_to_array<T: ScriptType, E>() -> Array<E> {
    if !T::CAN_HOLD_FALSE {
        warning("Dangerous cast false to array, the result will be different from PHP");
    }
    Array::new()
}

// ── Builtins ────────────────────────────────────────────────────────────

pub fn boolval<T: ScriptType>(value: &T) -> bool {
    value.boolval()
}

pub fn intval<T: ScriptType>(value: &T) -> i64 {
    value.intval()
}

pub fn floatval<T: ScriptType>(value: &T) -> f64 {
    value.floatval()
}

pub fn strval<T: ScriptType>(value: &T) -> KString {
    value.strval()
}

pub fn arrayval<T: ScriptType>(value: &T) -> Array<Var> {
    value.arrayval()
}

/// Typed `arrayval` for an optional array: the payload itself, an empty
/// array for null, and for false an empty array with the dangerous-cast
/// warning unless the element type is `bool` or `Var`.
pub fn optional_arrayval<T: ScriptType>(value: &Optional<Array<T>>) -> Array<T> {
    if value.is_false() {
        return false_to_array::<T, T>();
    }
    value.val().clone()
}

pub fn boolval_ref<'a>(value: &'a mut Var, function: &str) -> &'a mut bool {
    value.make_bool(function)
}

pub fn intval_ref<'a>(value: &'a mut Var, function: &str) -> &'a mut i64 {
    value.make_int(function)
}

pub fn floatval_ref<'a>(value: &'a mut Var, function: &str) -> &'a mut f64 {
    value.make_float(function)
}

pub fn strval_ref<'a>(value: &'a mut Var, function: &str) -> &'a mut KString {
    value.make_string(function)
}

pub fn arrayval_ref<'a>(value: &'a mut Var, function: &str) -> &'a mut Array<Var> {
    value.make_array(function)
}

/// The array inside an optional, for in-place use by `function`.
///
/// An absent array warns and becomes an empty present one.
pub fn optional_arrayval_ref<'a, T>(
    value: &'a mut Optional<Array<T>>,
    function: &str,
) -> &'a mut Array<T> {
    if !value.has_value() {
        warning(&format!(
            "{function}() expects parameter to be array, null or false is given"
        ));
    }
    value.ref_mut()
}

pub fn is_null<T: ScriptType>(value: &T) -> bool {
    value.is_null()
}

pub fn is_bool<T: ScriptType>(value: &T) -> bool {
    value.is_bool()
}

pub fn is_int<T: ScriptType>(value: &T) -> bool {
    value.is_int()
}

pub fn is_float<T: ScriptType>(value: &T) -> bool {
    value.is_float()
}

pub fn is_string<T: ScriptType>(value: &T) -> bool {
    value.is_string()
}

pub fn is_array<T: ScriptType>(value: &T) -> bool {
    value.is_array()
}

pub fn is_object<T: ScriptType>(value: &T) -> bool {
    value.is_object()
}

pub fn is_numeric<T: ScriptType>(value: &T) -> bool {
    value.is_numeric()
}

pub fn is_scalar<T: ScriptType>(value: &T) -> bool {
    value.is_scalar()
}

pub fn count<T: ScriptType>(value: &T) -> i64 {
    value.count()
}

pub fn sizeof<T: ScriptType>(value: &T) -> i64 {
    value.count()
}

pub fn empty<T: ScriptType>(value: &T) -> bool {
    value.empty()
}

pub fn get_type<T: ScriptType>(value: &T) -> KString {
    KString::from(value.type_name())
}

pub fn gettype<T: ScriptType>(value: &T) -> KString {
    get_type(value)
}

pub fn get_class<T: ScriptType>(value: &T) -> KString {
    value.get_class()
}

pub fn get_hash_of_class<C: ScriptClass>(instance: &ClassInstance<C>) -> i64 {
    instance.get_hash()
}

pub fn get_reference_counter<T: ScriptType>(value: &T) -> usize {
    value.get_reference_counter()
}

#[cfg(test)]
mod tests;
