use pretty_assertions::assert_eq;

use super::*;
use crate::array::Array;
use crate::class::{ClassDescriptor, ClassInstance, ScriptClass};
use crate::diagnostics::capture_warnings;

static BOX: ClassDescriptor = ClassDescriptor::new("Box", None, &[]);

struct Crate;

impl ScriptClass for Crate {
    const CLASS: &'static ClassDescriptor = &BOX;
}

fn list(values: Vec<Var>) -> Var {
    Var::Array(Array::from_vec(values))
}

#[test]
fn plain_division() {
    let (q, warnings) = capture_warnings(|| divide(&7_i64, &2_i64));
    assert_eq!(q, 3.5);
    assert!(warnings.is_empty());
    assert_eq!(divide(&Var::from("9"), &3.0_f64), 3.0);
    assert_eq!(divide(&Var::Null, &4_i64), 0.0);
}

#[test]
fn division_by_zero_warns_once() {
    let (q, warnings) = capture_warnings(|| divide(&1_i64, &0_i64));
    assert_eq!(q, f64::INFINITY);
    assert_eq!(warnings, vec!["Float division by zero"]);

    let (q, warnings) = capture_warnings(|| divide(&-1.0_f64, &Var::from("0")));
    assert_eq!(q, f64::NEG_INFINITY);
    assert_eq!(warnings.len(), 1);

    let (q, _) = capture_warnings(|| divide(&0_i64, &0.0_f64));
    assert!(q.is_nan());
}

#[test]
fn bool_operands() {
    let (q, warnings) = capture_warnings(|| divide(&true, &true));
    assert_eq!(q, 1.0);
    assert_eq!(warnings, vec!["Both arguments of operator '/' are bool"]);

    let (q, warnings) = capture_warnings(|| divide(&true, &4_i64));
    assert_eq!(q, 0.25);
    assert_eq!(warnings, vec!["First argument of operator '/' is bool"]);

    let (q, warnings) = capture_warnings(|| divide(&3_i64, &false));
    assert!(q.is_infinite());
    assert_eq!(
        warnings,
        vec!["Second argument of operator '/' is bool", "Float division by zero"]
    );
}

#[test]
fn unsupported_pairs_yield_zero() {
    let arr = list(vec![Var::Int(1)]);
    let obj = ClassInstance::new(Crate);
    let cases: Vec<(Var, Var, &str)> = vec![
        (Var::Bool(true), arr.clone(), "bool and array"),
        (arr.clone(), Var::Bool(true), "array and bool"),
        (Var::Bool(true), obj.to_var(), "bool and object"),
        (obj.to_var(), Var::Bool(false), "object and bool"),
        (arr.clone(), arr.clone(), "array and array"),
        (obj.to_var(), obj.to_var(), "object and object"),
        (arr.clone(), obj.to_var(), "array and object"),
        (obj.to_var(), arr, "object and array"),
    ];
    for (lhs, rhs, names) in cases {
        let (q, warnings) = capture_warnings(|| divide(&lhs, &rhs));
        assert_eq!(q, 0.0);
        assert_eq!(
            warnings,
            vec![format!("Unsupported operand types for operator '/' {names}")]
        );
    }
}

#[test]
fn arrays_divide_as_their_count() {
    let arr = list(vec![Var::Int(1), Var::Int(2), Var::Int(3), Var::Int(4)]);
    let (q, warnings) = capture_warnings(|| divide(&arr, &2_i64));
    assert_eq!(q, 2.0);
    assert_eq!(warnings, vec!["First argument of operator '/' is array"]);

    let (q, warnings) = capture_warnings(|| divide(&8_i64, &arr));
    assert_eq!(q, 2.0);
    assert_eq!(warnings, vec!["Second argument of operator '/' is array"]);
}

#[test]
fn objects_in_division() {
    let obj = ClassInstance::new(Crate);
    let (q, warnings) = capture_warnings(|| divide(&obj, &4_i64));
    assert_eq!(q, 0.25);
    assert_eq!(warnings, vec!["First argument of operator '/' is object"]);

    let (q, warnings) = capture_warnings(|| divide(&Var::from("6.5"), &obj));
    assert_eq!(q, 6.5);
    assert_eq!(warnings, vec!["Second argument of operator '/' is object"]);
}

#[test]
fn integer_modulo() {
    assert_eq!(modulo(&7_i64, &3_i64), 1);
    assert_eq!(modulo(&-7_i64, &3_i64), -1);
    assert_eq!(modulo(&i64::MIN, &-1_i64), 0);
}

#[test]
fn modulo_by_zero() {
    let (r, warnings) = capture_warnings(|| modulo(&5_i64, &0_i64));
    assert_eq!(r, 0);
    assert_eq!(warnings, vec!["Modulo by zero"]);

    let (r, warnings) = capture_warnings(|| modulo(&Var::from("5"), &Var::Null));
    assert_eq!(r, 0);
    assert_eq!(warnings, vec!["Modulo by zero"]);
}

#[test]
fn modulo_warns_for_fractional_operands() {
    let (r, warnings) = capture_warnings(|| modulo(&7.5_f64, &Var::from("2")));
    assert_eq!(r, 1);
    assert_eq!(warnings, vec!["First parameter of operator % is not an integer"]);

    let (r, warnings) = capture_warnings(|| modulo(&9_i64, &2.5_f64));
    assert_eq!(r, 1);
    assert_eq!(warnings, vec!["Second parameter of operator % is not an integer"]);

    let ((), warnings) = capture_warnings(|| assert_eq!(modulo(&8.0_f64, &3_i64), 2));
    assert!(warnings.is_empty());
}

#[test]
fn integer_power_wraps() {
    assert_eq!(power(&2_i64, &10_i64), Var::Int(1024));
    assert_eq!(power(&-3_i64, &3_i64), Var::Int(-27));
    assert_eq!(power(&7_i64, &0_i64), Var::Int(1));
    assert_eq!(power(&2_i64, &64_i64), Var::Int(0));
    assert_eq!(int_power(3, 40), 3_i64.wrapping_pow(40));
}

#[test]
fn float_power() {
    assert_eq!(power(&2_i64, &-1_i64), Var::Float(0.5));
    assert_eq!(power(&2.0_f64, &3_i64), Var::Float(8.0));
    assert_eq!(power(&-2.0_f64, &2.0_f64), Var::Float(4.0));
    assert_eq!(power(&4_i64, &0.5_f64), Var::Float(2.0));
}

#[test]
fn negative_base_fractional_exponent() {
    let (r, warnings) = capture_warnings(|| power(&-8_i64, &(1.0_f64 / 3.0)));
    assert_eq!(r, Var::Float(0.0));
    assert_eq!(
        warnings,
        vec!["Calculating pow with negative base and double exp will produce zero"]
    );
}

#[test]
fn additive_operators_promote_on_overflow() {
    assert_eq!(add(&1_i64, &2_i64), Var::Int(3));
    assert_eq!(add(&Var::from("1.5"), &1_i64), Var::Float(2.5));
    assert_eq!(add(&i64::MAX, &1_i64), Var::Float(i64::MAX as f64 + 1.0));
    assert_eq!(sub(&i64::MIN, &1_i64), Var::Float(i64::MIN as f64 - 1.0));
    assert_eq!(mul(&i64::MAX, &2_i64), Var::Float(i64::MAX as f64 * 2.0));
    assert_eq!(mul(&true, &Var::from("4")), Var::Int(4));
    assert_eq!(negate(&i64::MIN), Var::Float(-(i64::MIN as f64)));
    assert_eq!(negate(&Var::from("2.5")), Var::Float(-2.5));
}

#[test]
fn array_union_keeps_left_entries() {
    let lhs = list(vec![Var::Int(1), Var::Int(2)]);
    let rhs = list(vec![Var::Int(9), Var::Int(9), Var::Int(3)]);
    let Var::Array(sum) = add(&lhs, &rhs) else {
        panic!("array + array must be an array");
    };
    assert_eq!(sum.values().cloned().collect::<Vec<_>>(), vec![
        Var::Int(1),
        Var::Int(2),
        Var::Int(3)
    ]);
    // The operands are untouched.
    assert_eq!(lhs.count(), 2);
}

#[test]
fn array_operands_of_arithmetic_warn() {
    let arr = list(vec![Var::Int(1), Var::Int(2)]);
    let (r, warnings) = capture_warnings(|| add(&arr, &1_i64));
    assert_eq!(r, Var::Int(3));
    assert_eq!(warnings, vec!["First argument of operator '+' is array"]);

    let obj = ClassInstance::new(Crate);
    let (r, warnings) = capture_warnings(|| mul(&5_i64, &obj));
    assert_eq!(r, Var::Int(5));
    assert_eq!(warnings, vec!["Second argument of operator '*' is object"]);
}

#[test]
fn append_converts_destination() {
    let mut v = Var::Int(12);
    append(&mut v, &3.5_f64);
    assert_eq!(v, Var::from("123.5"));

    let mut n = Var::Null;
    append(&mut n, &true);
    assert_eq!(n, Var::from("1"));
}

#[test]
fn append_does_not_touch_shared_copies() {
    let original = KString::from("ab");
    let mut v = Var::String(original.clone());
    append(&mut v, &KString::from("c"));
    assert_eq!(v, Var::from("abc"));
    assert_eq!(original, "ab");

    let mut s = original.clone();
    append_to(&mut s, &7_i64);
    assert_eq!(s, "ab7");
    assert_eq!(original, "ab");
}
