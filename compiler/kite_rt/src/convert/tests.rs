use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;
use crate::class::ClassDescriptor;
use crate::diagnostics::capture_warnings;

static NODE: ClassDescriptor = ClassDescriptor::new("Node", None, &[]);

#[derive(Clone)]
struct Node;

impl ScriptClass for Node {
    const CLASS: &'static ClassDescriptor = &NODE;
}

#[test]
fn float_to_int_truncates_and_saturates() {
    assert_eq!(float_to_int(2.9), 2);
    assert_eq!(float_to_int(-2.9), -2);
    assert_eq!(float_to_int(f64::NAN), 0);
    assert_eq!(float_to_int(1e300), i64::MAX);
    assert_eq!(float_to_int(f64::NEG_INFINITY), i64::MIN);
}

#[test]
fn typed_and_dynamic_values_agree() {
    let typed = KString::from("12.5xyz");
    let dynamic = Var::String(typed.clone());
    assert_eq!(intval(&typed), intval(&dynamic));
    assert_eq!(floatval(&typed), floatval(&dynamic));
    assert_eq!(boolval(&typed), boolval(&dynamic));
    assert_eq!(gettype(&typed), gettype(&dynamic));
}

#[test]
fn scalar_arrayval_wraps() {
    assert_eq!(arrayval(&5_i64), Array::from_vec(vec![Var::Int(5)]));
    assert_eq!(arrayval(&true), Array::from_vec(vec![Var::Bool(true)]));
}

#[test]
fn typed_array_becomes_var_array() {
    let mut a: Array<i64> = Array::from_vec(vec![1, 2]);
    a.set("k", 3);
    let v = a.to_var();
    let Var::Array(converted) = v else {
        panic!("expected an array, got {v:?}");
    };
    assert_eq!(converted.get("k"), Some(&Var::Int(3)));
    assert_eq!(converted.count(), 3);
}

#[test]
fn optional_absent_states_convert_as_false() {
    let f: Optional<KString> = Optional::false_value();
    let n: Optional<KString> = Optional::null();
    for o in [&f, &n] {
        assert!(!boolval(o));
        assert_eq!(intval(o), 0);
        assert_eq!(floatval(o), 0.0);
        assert_eq!(strval(o), "");
    }
    assert_eq!(f.to_var(), Var::Bool(false));
    assert_eq!(n.to_var(), Var::Null);
}

#[test]
fn optional_present_delegates() {
    let o = Optional::value(KString::from("42"));
    assert_eq!(intval(&o), 42);
    assert!(is_string(&o));
    assert!(is_numeric(&o));
    assert!(!is_bool(&o));
    assert_eq!(gettype(&o), "string");
}

#[test]
fn optional_predicates_on_sentinels() {
    let f: Optional<i64> = Optional::false_value();
    let n: Optional<i64> = Optional::null();
    assert!(is_bool(&f) && !is_null(&f) && is_scalar(&f));
    assert!(is_null(&n) && !is_bool(&n) && !is_scalar(&n));
    assert!(!is_int(&f) && !is_int(&n));
    assert_eq!(gettype(&f), "boolean");
    assert_eq!(gettype(&n), "NULL");
}

#[test]
fn false_to_array_is_silent_only_for_bool_and_var() {
    let ((), warnings) = capture_warnings(|| {
        assert!(arrayval(&Optional::<bool>::false_value()).is_empty());
        assert!(arrayval(&Optional::<Var>::false_value()).is_empty());
    });
    assert!(warnings.is_empty());

    let (a, warnings) = capture_warnings(|| arrayval(&Optional::<i64>::false_value()));
    assert!(a.is_empty());
    assert_eq!(
        warnings,
        vec!["Dangerous cast false to array, the result will be different from PHP"]
    );

    let ((), warnings) = capture_warnings(|| {
        assert!(arrayval(&Optional::<i64>::null()).is_empty());
    });
    assert!(warnings.is_empty());
}

#[test]
fn typed_optional_array() {
    let present = Optional::value(Array::from_vec(vec![1_i64, 2]));
    assert_eq!(optional_arrayval(&present).count(), 2);

    let (a, warnings) =
        capture_warnings(|| optional_arrayval(&Optional::<Array<KString>>::false_value()));
    assert!(a.is_empty());
    assert_eq!(warnings.len(), 1);

    let (b, warnings) =
        capture_warnings(|| optional_arrayval(&Optional::<Array<bool>>::false_value()));
    assert!(b.is_empty());
    assert!(warnings.is_empty());
}

#[test]
fn optional_arrayval_ref_fills_absent() {
    let mut o: Optional<Array<i64>> = Optional::null();
    let ((), warnings) = capture_warnings(|| {
        optional_arrayval_ref(&mut o, "array_push").push_back(1);
    });
    assert!(o.has_value());
    assert_eq!(o.val().count(), 1);
    assert_eq!(
        warnings,
        vec!["array_push() expects parameter to be array, null or false is given"]
    );
}

#[test]
fn ref_builtins_write_through() {
    let mut v = Var::from("5");
    *intval_ref(&mut v, "f") *= 3;
    assert_eq!(v, Var::Int(15));

    *floatval_ref(&mut v, "f") /= 2.0;
    assert_eq!(v, Var::Float(7.5));

    strval_ref(&mut v, "f").push(b'!');
    assert_eq!(v, Var::from("7.5!"));

    *boolval_ref(&mut v, "f") = false;
    assert_eq!(v, Var::Bool(false));

    arrayval_ref(&mut Var::new_array(), "f").push_back(Var::Null);
}

#[test]
fn count_and_sizeof() {
    let a = Array::from_vec(vec![1_i64, 2, 3]);
    assert_eq!(count(&a), 3);
    assert_eq!(sizeof(&a), 3);
    let (n, warnings) = capture_warnings(|| count(&7_i64));
    assert_eq!(n, 1);
    assert_eq!(warnings, vec!["Count on non-array"]);
    assert_eq!(count(&Optional::<Array<i64>>::null()), 0);
}

#[test]
fn empty_follows_truthiness() {
    assert!(empty(&0_i64));
    assert!(empty(&KString::from("0")));
    assert!(!empty(&KString::from("a")));
    assert!(empty(&Array::<i64>::new()));
    assert!(empty(&Optional::<i64>::false_value()));
    assert!(empty(&ClassInstance::<Node>::null()));
    assert!(!empty(&ClassInstance::new(Node)));
}

#[test]
fn get_class_on_non_objects_warns() {
    let (name, warnings) = capture_warnings(|| get_class(&1.5_f64));
    assert_eq!(name, "");
    assert_eq!(warnings, vec!["Called get_class() on double"]);

    let (name, warnings) = capture_warnings(|| get_class(&Var::Null));
    assert_eq!(name, "");
    assert_eq!(warnings, vec!["Called get_class() on NULL"]);

    let node = ClassInstance::new(Node);
    assert_eq!(get_class(&node), "Node");
    assert_eq!(get_class(&node.to_var()), "Node");
    assert_eq!(get_hash_of_class(&node), i64::from(NODE.hash));
}

#[test]
fn object_conversions() {
    let node = ClassInstance::new(Node);
    assert_eq!(strval(&node), "Node");
    assert!(is_object(&node));
    assert!(!is_object(&ClassInstance::<Node>::null()));
    let (a, warnings) = capture_warnings(|| arrayval(&node));
    assert!(a.is_empty());
    assert_eq!(warnings, vec!["Can not convert class instance to array"]);
}

#[test]
fn reference_counts() {
    let s = KString::from("x");
    let _t = s.clone();
    assert_eq!(get_reference_counter(&s), 2);
    assert_eq!(get_reference_counter(&1_i64), 0);
}

proptest! {
    #[test]
    fn int_string_round_trip(n in any::<i64>()) {
        prop_assert_eq!(intval(&strval(&n)), n);
    }

    #[test]
    fn canonical_int_strings_are_numeric(n in any::<i64>()) {
        let s = strval(&n);
        prop_assert!(is_numeric(&s));
        prop_assert_eq!(crate::array::ArrayKey::from(&s), crate::array::ArrayKey::Int(n));
    }

    #[test]
    fn finite_float_round_trip_is_close(f in -1e12_f64..1e12) {
        let back = floatval(&strval(&f));
        prop_assert!((back - f).abs() <= f.abs() * 1e-13 + 1e-13);
    }
}
