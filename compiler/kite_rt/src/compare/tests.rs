use pretty_assertions::assert_eq;

use super::*;
use crate::array::ArrayKey;
use crate::class::{ClassDescriptor, ClassInstance, ScriptClass};

static ITEM: ClassDescriptor = ClassDescriptor::new("Item", None, &[]);

struct Item;

impl ScriptClass for Item {
    const CLASS: &'static ClassDescriptor = &ITEM;
}

fn s(text: &str) -> Var {
    Var::from(text)
}

fn list(values: Vec<Var>) -> Var {
    Var::Array(Array::from_vec(values))
}

#[test]
fn null_meets_string_as_empty_string() {
    assert!(eq(&Var::Null, &s("")));
    assert!(lt(&Var::Null, &s("a")));
    assert!(!eq(&Var::Null, &s("0")));
    assert!(gt(&s("0"), &Var::Null));
}

#[test]
fn bool_and_null_compare_as_bool() {
    assert!(eq(&true, &s("abc")));
    assert!(eq(&false, &s("0")));
    assert!(eq(&Var::Null, &0_i64));
    assert!(eq(&Var::Null, &false));
    assert!(lt(&false, &true));
    assert!(eq(&true, &list(vec![Var::Int(1)])));
    assert!(eq(&Var::Null, &Var::new_array()));
    assert!(lt(&Var::Null, &-1_i64));
}

#[test]
fn numbers_mix_through_float() {
    assert!(eq(&1_i64, &1.0_f64));
    assert!(lt(&1_i64, &1.5_f64));
    assert!(gt(&i64::MAX, &(i64::MAX - 1)));
    assert_eq!(spaceship(&2_i64, &10_i64), -1);
}

#[test]
fn numeric_strings_compare_as_numbers() {
    assert!(eq(&s("10"), &s("1e1")));
    assert!(lt(&s("9"), &s("10")));
    assert!(eq(&s(" 1"), &s("1")));
    // Not both numeric: bytewise.
    assert!(gt(&s("9a"), &s("10a")));
    assert!(lt(&s("abc"), &s("abd")));
    assert!(!eq(&s("1"), &s("1 ")));
}

#[test]
fn number_against_string_uses_prefix() {
    assert!(eq(&10_i64, &s("10")));
    assert!(eq(&10_i64, &s("10apples")));
    assert!(eq(&0_i64, &s("abc")));
    assert!(lt(&1.5_f64, &s("2")));
}

#[test]
fn nan_is_unordered() {
    let nan = f64::NAN;
    for other in [Var::Float(nan), Var::Int(0), Var::Float(1.0)] {
        assert!(!lt(&nan, &other));
        assert!(!gt(&nan, &other));
        assert!(!eq(&nan, &other));
        assert_eq!(spaceship(&nan, &other), 0);
    }
}

#[test]
fn objects_compare_by_identity_and_beat_everything_else() {
    let a = ClassInstance::new(Item);
    let b = ClassInstance::new(Item);
    assert!(eq(&a, &a.clone()));
    assert!(!eq(&a, &b));
    assert!(lt(&a, &b) ^ lt(&b, &a));
    assert!(gt(&a, &s("zzz")));
    assert!(gt(&a, &list(vec![Var::Int(1)])));
    assert!(lt(&5_i64, &a));
}

#[test]
fn arrays_compare_by_count_then_entries() {
    let small = list(vec![Var::Int(9)]);
    let big = list(vec![Var::Int(1), Var::Int(1)]);
    assert!(lt(&small, &big));

    let a = list(vec![Var::Int(1), Var::Int(2)]);
    let b = list(vec![Var::Int(1), Var::Int(3)]);
    assert!(lt(&a, &b));
    assert!(eq(&a, &list(vec![s("1"), Var::Float(2.0)])));
    assert!(gt(&a, &9_i64));
    assert!(gt(&a, &s("x")));
}

#[test]
fn arrays_with_different_keys_are_unordered() {
    let mut x: Array<Var> = Array::new();
    x.set("a", Var::Int(1));
    let mut y: Array<Var> = Array::new();
    y.set("b", Var::Int(1));
    let (x, y) = (Var::Array(x), Var::Array(y));
    assert_eq!(compare(&x, &y), None);
    assert!(!lt(&x, &y) && !gt(&x, &y) && !eq(&x, &y));
    assert_eq!(spaceship(&x, &y), 0);
}

#[test]
fn loose_array_equality_ignores_order() {
    let mut x: Array<Var> = Array::new();
    x.set("a", Var::Int(1));
    x.set("b", Var::Int(2));
    let mut y: Array<Var> = Array::new();
    y.set("b", Var::Int(2));
    y.set("a", Var::Int(1));
    let (x, y) = (Var::Array(x), Var::Array(y));
    assert!(eq(&x, &y));
    assert!(!strict_eq(&x, &y));
}

#[test]
fn typed_arrays_compare_like_var_arrays() {
    let typed = Array::from_vec(vec![1_i64, 2]);
    let dynamic = list(vec![Var::Int(1), Var::Int(2)]);
    assert!(eq(&typed, &dynamic));
    assert!(strict_eq(&typed, &dynamic));
}

#[test]
fn strict_equality_checks_types() {
    assert!(!strict_eq(&1_i64, &1.0_f64));
    assert!(!strict_eq(&s("1"), &1_i64));
    assert!(strict_eq(&s("1"), &KString::from("1")));
    assert!(neq(&1_i64, &2_i64));
}

#[test]
fn ordering_helpers() {
    assert!(leq(&1_i64, &1_i64) && geq(&1_i64, &1_i64));
    assert!(!leq(&f64::NAN, &1_i64) && !geq(&f64::NAN, &1_i64));
}

#[test]
fn deeply_nested_arrays_compare_without_overflow() {
    fn nest(depth: usize) -> Var {
        let mut v = Var::Int(0);
        for _ in 0..depth {
            v = list(vec![v]);
        }
        v
    }
    let a = nest(20_000);
    let b = nest(20_000);
    assert!(eq(&a, &b));
    // Tear down iteratively; dropping recursively would need as much stack.
    for mut v in [a, b] {
        while let Var::Array(arr) = v {
            v = arr.get(ArrayKey::Int(0)).cloned().unwrap_or_default();
        }
    }
}
