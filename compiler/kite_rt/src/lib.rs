//! Kite runtime value model.
//!
//! This crate implements the dynamic values compiled scripts operate on and
//! the weak-typing rules between them.
//!
//! # Architecture
//!
//! - `Var`: the closed variant over every runtime type
//! - `KString`, `Array<T>`: copy-on-write buffers shared by refcount
//! - `Optional<T>`: a typed value that may also be `false` or `null`
//! - `ClassInstance<C>`: a nullable shared reference to a script object
//! - `ScriptType`: conversions shared by typed values and `Var`, so both
//!   follow the same coercion rules
//!
//! Runtime anomalies (bad conversions, division by zero) are warnings routed
//! through the current warning handler and never abort the script. Fatal
//! conditions raise a [`CriticalError`] that unwinds to the request boundary.
//!
//! Values are single-threaded: refcounts are not atomic and each worker owns
//! its request's values.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    reason = "the language defines int/float conversions as plain casts"
)]

pub mod arith;
mod array;
pub mod builtins;
mod class;
pub mod compare;
pub mod convert;
pub mod diagnostics;
pub mod foreach;
pub mod numeric;
mod optional;
mod stack;
mod string;
mod var;

pub use array::{canonical_int, Array, ArrayKey, Iter};
pub use class::{name_hash, ClassDescriptor, ClassInstance, ObjectRef, ScriptClass};
pub use convert::{float_to_int, ScriptType};
pub use diagnostics::{
    capture_warnings, critical_error, set_warning_handler, warning, without_warnings,
    CriticalError, ErrorLevel,
};
pub use optional::{Optional, OptionalState};
pub use stack::ensure_sufficient_stack;
pub use string::KString;
pub use var::Var;
