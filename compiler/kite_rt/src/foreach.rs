//! Loop entry points and clearing helpers.
//!
//! `foreach` over something that is not an array is a runtime warning, not
//! an error: the loop body just runs zero times.

use crate::array::{Array, ArrayKey};
use crate::class::ClassInstance;
use crate::diagnostics::warning;
use crate::optional::Optional;
use crate::var::Var;

/// Iterate a dynamic value; non-arrays warn and yield nothing.
pub fn foreach_var(value: &Var) -> impl Iterator<Item = (ArrayKey, &Var)> {
    let array = match value {
        Var::Array(a) => Some(a),
        other => {
            warning(&format!(
                "Invalid argument supplied for foreach(), {} \"{}\" is given",
                other.type_name(),
                describe(other)
            ));
            None
        }
    };
    array.into_iter().flat_map(Array::iter)
}

fn describe(value: &Var) -> String {
    match value {
        Var::Object(o) => o.class_name().to_owned(),
        other => other.to_string().to_string_lossy(),
    }
}

/// Iterate an optional array; the false and null states warn and yield
/// nothing.
pub fn foreach_optional<T>(value: &Optional<Array<T>>) -> impl Iterator<Item = (ArrayKey, &T)> {
    if !value.has_value() {
        warning("Invalid argument supplied for foreach(), false or null is given");
    }
    value.as_option().into_iter().flat_map(Array::iter)
}

/// Empty an array, keeping the variable an array.
pub fn clear_array<T>(array: &mut Array<T>) {
    array.clear();
}

/// Reset a dynamic value: an array is emptied, anything else becomes null.
pub fn clear_var(value: &mut Var) {
    match value {
        Var::Array(a) => a.clear(),
        other => *other = Var::Null,
    }
}

/// Reset an optional array to the false state.
pub fn clear_optional_array<T>(value: &mut Optional<Array<T>>) {
    value.set_false();
}

/// `unset($x)` on a dynamic value.
pub fn unset_var(value: &mut Var) {
    *value = Var::Null;
}

/// `unset($x)` on an object reference; other references keep the object.
pub fn unset_instance<C>(instance: &mut ClassInstance<C>) {
    instance.destroy();
}

#[cfg(test)]
mod tests;
