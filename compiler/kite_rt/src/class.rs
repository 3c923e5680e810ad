//! Class descriptors and reference-counted instance handles.
//!
//! Compiled classes are plain Rust types implementing [`ScriptClass`]. Their
//! instances live behind an [`ObjectRef`]: a type-erased `Rc` that carries the
//! runtime [`ClassDescriptor`], so a handle typed as a base class can still
//! answer `is_a` for the object it really points at.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::diagnostics::warning;

/// Static description of a compiled class or interface.
#[derive(Debug)]
pub struct ClassDescriptor {
    pub name: &'static str,
    pub parent: Option<&'static ClassDescriptor>,
    pub interfaces: &'static [&'static ClassDescriptor],
    /// FNV-1a hash of `name`.
    pub hash: u32,
}

impl ClassDescriptor {
    pub const fn new(
        name: &'static str,
        parent: Option<&'static ClassDescriptor>,
        interfaces: &'static [&'static ClassDescriptor],
    ) -> Self {
        ClassDescriptor {
            name,
            parent,
            interfaces,
            hash: name_hash(name),
        }
    }

    /// `self` is `other`, extends it, or implements it (transitively).
    pub fn is_subclass_of(&self, other: &ClassDescriptor) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.parent.is_some_and(|p| p.is_subclass_of(other))
            || self.interfaces.iter().any(|i| i.is_subclass_of(other))
    }
}

/// 32-bit FNV-1a.
pub const fn name_hash(name: &str) -> u32 {
    const OFFSET: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    let bytes = name.as_bytes();
    let mut hash = OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(PRIME);
        i += 1;
    }
    hash
}

/// A Rust type that backs a compiled class.
pub trait ScriptClass: Any {
    const CLASS: &'static ClassDescriptor;
}

struct ObjectBox<T: ?Sized> {
    descriptor: &'static ClassDescriptor,
    cell: RefCell<T>,
}

/// Type-erased shared object.
///
/// Two refs are the same object iff they share the allocation.
#[derive(Clone)]
pub struct ObjectRef(Rc<ObjectBox<dyn Any>>);

impl ObjectRef {
    pub fn new<C: ScriptClass>(object: C) -> Self {
        ObjectRef(Rc::new(ObjectBox {
            descriptor: C::CLASS,
            cell: RefCell::new(object),
        }))
    }

    /// Runtime class of the pointee.
    pub fn descriptor(&self) -> &'static ClassDescriptor {
        self.0.descriptor
    }

    pub fn class_name(&self) -> &'static str {
        self.0.descriptor.name
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the object, used to order distinct instances.
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }

    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// The pointee as `C`, if that is its concrete type.
    ///
    /// # Panics
    ///
    /// If the object is mutably borrowed.
    pub fn borrow<C: ScriptClass>(&self) -> Option<Ref<'_, C>> {
        Ref::filter_map(self.0.cell.borrow(), |any| any.downcast_ref::<C>()).ok()
    }

    /// # Panics
    ///
    /// If the object is already borrowed.
    pub fn borrow_mut<C: ScriptClass>(&self) -> Option<RefMut<'_, C>> {
        RefMut::filter_map(self.0.cell.borrow_mut(), |any| any.downcast_mut::<C>()).ok()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object({})#{:x}", self.class_name(), self.addr())
    }
}

/// Nullable handle to an instance of `C` or one of its subclasses.
pub struct ClassInstance<C> {
    object: Option<ObjectRef>,
    marker: PhantomData<fn() -> C>,
}

impl<C: ScriptClass> ClassInstance<C> {
    pub fn new(object: C) -> Self {
        ClassInstance {
            object: Some(ObjectRef::new(object)),
            marker: PhantomData,
        }
    }

    /// Wrap `object` if it is a `C`; `None` otherwise.
    pub fn from_object(object: ObjectRef) -> Option<Self> {
        object
            .descriptor()
            .is_subclass_of(C::CLASS)
            .then_some(ClassInstance {
                object: Some(object),
                marker: PhantomData,
            })
    }

    /// Whether the pointee is a `D`. A null handle is not.
    pub fn is_a<D: ScriptClass>(&self) -> bool {
        self.object
            .as_ref()
            .is_some_and(|o| o.descriptor().is_subclass_of(D::CLASS))
    }

    /// The same object viewed as `D`, or a null handle with a warning.
    pub fn cast_to<D: ScriptClass>(&self) -> ClassInstance<D> {
        let Some(object) = &self.object else {
            return ClassInstance::null();
        };
        if let Some(cast) = ClassInstance::from_object(object.clone()) {
            return cast;
        }
        warning(&format!(
            "Can't cast object of class {} to {}",
            object.class_name(),
            D::CLASS.name
        ));
        ClassInstance::null()
    }

    /// The pointee, when its concrete type is `C`.
    pub fn borrow(&self) -> Option<Ref<'_, C>> {
        self.object.as_ref()?.borrow()
    }

    pub fn borrow_mut(&self) -> Option<RefMut<'_, C>> {
        self.object.as_ref()?.borrow_mut()
    }

    /// The pointee as another concrete type, e.g. a subclass.
    pub fn borrow_as<D: ScriptClass>(&self) -> Option<Ref<'_, D>> {
        self.object.as_ref()?.borrow()
    }

    /// Declared name of the runtime class; the static class for null.
    pub fn get_class(&self) -> &'static str {
        self.object
            .as_ref()
            .map_or(C::CLASS.name, ObjectRef::class_name)
    }

    pub fn get_hash(&self) -> i64 {
        let descriptor = self.object.as_ref().map_or(C::CLASS, ObjectRef::descriptor);
        i64::from(descriptor.hash)
    }
}

impl<C> ClassInstance<C> {
    pub fn null() -> Self {
        ClassInstance {
            object: None,
            marker: PhantomData,
        }
    }

    pub fn is_null(&self) -> bool {
        self.object.is_none()
    }

    /// Owners of the pointee; 0 for null.
    pub fn get_reference_counter(&self) -> usize {
        self.object.as_ref().map_or(0, ObjectRef::strong_count)
    }

    /// Drop this handle. The object is destroyed with its last owner.
    pub fn destroy(&mut self) {
        self.object = None;
    }

    pub fn object(&self) -> Option<&ObjectRef> {
        self.object.as_ref()
    }

    pub fn into_object(self) -> Option<ObjectRef> {
        self.object
    }
}

impl<C> Clone for ClassInstance<C> {
    fn clone(&self) -> Self {
        ClassInstance {
            object: self.object.clone(),
            marker: PhantomData,
        }
    }
}

impl<C> Default for ClassInstance<C> {
    fn default() -> Self {
        Self::null()
    }
}

/// Identity: same object, or both null.
impl<C> PartialEq for ClassInstance<C> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.object, &other.object) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<C: ScriptClass> fmt::Debug for ClassInstance<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object {
            Some(object) => object.fmt(f),
            None => write!(f, "null({})", C::CLASS.name),
        }
    }
}
