use pretty_assertions::assert_eq;

use super::*;
use crate::class::{ClassDescriptor, ScriptClass};
use crate::diagnostics::capture_warnings;

static TICKET: ClassDescriptor = ClassDescriptor::new("Ticket", None, &[]);

struct Ticket;

impl ScriptClass for Ticket {
    const CLASS: &'static ClassDescriptor = &TICKET;
}

#[test]
fn foreach_over_array_visits_in_order() {
    let mut a: Array<Var> = Array::new();
    a.set("x", Var::Int(1));
    a.push_back(Var::Int(2));
    let v = Var::Array(a);
    let (seen, warnings) = capture_warnings(|| {
        foreach_var(&v)
            .map(|(k, v)| (k, v.clone()))
            .collect::<Vec<_>>()
    });
    assert!(warnings.is_empty());
    assert_eq!(seen, vec![
        (ArrayKey::from("x"), Var::Int(1)),
        (ArrayKey::Int(0), Var::Int(2)),
    ]);
}

#[test]
fn foreach_over_scalar_warns() {
    let (n, warnings) = capture_warnings(|| foreach_var(&Var::Int(5)).count());
    assert_eq!(n, 0);
    assert_eq!(
        warnings,
        vec!["Invalid argument supplied for foreach(), integer \"5\" is given"]
    );

    let obj = Var::from(ClassInstance::new(Ticket));
    let (n, warnings) = capture_warnings(|| foreach_var(&obj).count());
    assert_eq!(n, 0);
    assert_eq!(
        warnings,
        vec!["Invalid argument supplied for foreach(), object \"Ticket\" is given"]
    );
}

#[test]
fn foreach_over_optional() {
    let present = Optional::value(Array::from_vec(vec![3_i64, 4]));
    let sum: i64 = foreach_optional(&present).map(|(_, v)| *v).sum();
    assert_eq!(sum, 7);

    for absent in [Optional::<Array<i64>>::null(), Optional::false_value()] {
        let (n, warnings) = capture_warnings(|| foreach_optional(&absent).count());
        assert_eq!(n, 0);
        assert_eq!(
            warnings,
            vec!["Invalid argument supplied for foreach(), false or null is given"]
        );
    }
}

#[test]
fn clearing() {
    let mut a = Array::from_vec(vec![1_i64]);
    let shared = a.clone();
    clear_array(&mut a);
    assert!(a.is_empty());
    assert_eq!(shared.count(), 1);

    let mut v = Var::Array(Array::from_vec(vec![Var::Int(1)]));
    clear_var(&mut v);
    assert_eq!(v, Var::new_array());
    let mut s = Var::from("text");
    clear_var(&mut s);
    assert_eq!(s, Var::Null);

    let mut o = Optional::value(Array::from_vec(vec![1_i64]));
    clear_optional_array(&mut o);
    assert!(o.is_false());
}

#[test]
fn unsetting() {
    let mut v = Var::Int(3);
    unset_var(&mut v);
    assert!(v.is_null());

    let mut a = ClassInstance::new(Ticket);
    let b = a.clone();
    unset_instance(&mut a);
    assert!(a.is_null());
    assert_eq!(b.get_reference_counter(), 1);
}
