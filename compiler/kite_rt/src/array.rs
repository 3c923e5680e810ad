//! Copy-on-write ordered array.
//!
//! One type covers both list-like and map-like use:
//!
//! ```text
//!   Vector: [v0, v1, v2]            keys are exactly 0..len
//!   Map:    slots  [(k, v) | hole]  insertion order, holes left by erase
//!           index  key -> slot
//! ```
//!
//! An array starts as a vector and becomes a map on the first string key,
//! non-contiguous int key, or erase of a non-last element. Buffers never go
//! back to vector form; only `clear` (which starts a fresh buffer) does.
//!
//! The buffer is shared between clones. Mutating methods check the owner
//! count first and work on a private copy when it is shared; the copy is
//! shallow, so nested strings and arrays only gain an owner.

mod key;

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

pub use key::{canonical_int, ArrayKey};

#[derive(Clone)]
struct OrderedMap<T> {
    slots: Vec<Option<(ArrayKey, T)>>,
    index: FxHashMap<ArrayKey, usize>,
    len: usize,
    /// Key used by the next push: one past the largest int key, at least 0.
    next_index: i64,
}

impl<T> OrderedMap<T> {
    fn from_vec(values: Vec<T>, extra: usize) -> Self {
        let len = values.len();
        let mut map = OrderedMap {
            slots: Vec::with_capacity(len + extra),
            index: FxHashMap::default(),
            len: 0,
            next_index: 0,
        };
        map.index.reserve(len + extra);
        for value in values {
            let key = ArrayKey::Int(map.next_index);
            map.insert_new(key, value);
        }
        map
    }

    fn get(&self, key: &ArrayKey) -> Option<&T> {
        let slot = *self.index.get(key)?;
        self.slots[slot].as_ref().map(|(_, v)| v)
    }

    fn get_mut(&mut self, key: &ArrayKey) -> Option<&mut T> {
        let slot = *self.index.get(key)?;
        self.slots[slot].as_mut().map(|(_, v)| v)
    }

    fn insert_new(&mut self, key: ArrayKey, value: T) {
        if let ArrayKey::Int(i) = key {
            if i >= self.next_index {
                self.next_index = i.saturating_add(1);
            }
        }
        self.index.insert(key.clone(), self.slots.len());
        self.slots.push(Some((key, value)));
        self.len += 1;
    }

    fn insert(&mut self, key: ArrayKey, value: T) {
        match self.get_mut(&key) {
            Some(slot) => *slot = value,
            None => self.insert_new(key, value),
        }
    }

    fn remove(&mut self, key: &ArrayKey) -> Option<T> {
        let slot = self.index.remove(key)?;
        let (_, value) = self.slots[slot].take()?;
        self.len -= 1;
        if self.slots.len() > 8 && self.slots.len() > 2 * self.len {
            self.compact();
        }
        Some(value)
    }

    /// Drop holes and rebuild the index.
    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        self.index.clear();
        for (pos, (key, _)) in self.slots.iter().flatten().enumerate() {
            self.index.insert(key.clone(), pos);
        }
    }
}

#[derive(Clone)]
enum Storage<T> {
    Vector(Vec<T>),
    Map(OrderedMap<T>),
}

impl<T> Default for Storage<T> {
    fn default() -> Self {
        Storage::Vector(Vec::new())
    }
}

/// Reference-counted ordered array with value semantics.
pub struct Array<T> {
    inner: Rc<Storage<T>>,
}

impl<T> Array<T> {
    pub fn new() -> Self {
        Array {
            inner: Rc::new(Storage::default()),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Array {
            inner: Rc::new(Storage::Vector(Vec::with_capacity(capacity))),
        }
    }

    /// A vector-form array holding `values` under keys `0..len`.
    pub fn from_vec(values: Vec<T>) -> Self {
        Array {
            inner: Rc::new(Storage::Vector(values)),
        }
    }

    // ── Reading (never copies) ──────────────────────────────────────────

    pub fn count(&self) -> usize {
        match &*self.inner {
            Storage::Vector(v) => v.len(),
            Storage::Map(m) => m.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Whether the buffer is in dense `0..len` form.
    pub fn is_vector(&self) -> bool {
        matches!(&*self.inner, Storage::Vector(_))
    }

    pub fn capacity(&self) -> usize {
        match &*self.inner {
            Storage::Vector(v) => v.capacity(),
            Storage::Map(m) => m.slots.capacity(),
        }
    }

    /// Key the next `push_back` will use.
    pub fn next_index(&self) -> i64 {
        match &*self.inner {
            Storage::Vector(v) => i64::try_from(v.len()).unwrap_or(i64::MAX),
            Storage::Map(m) => m.next_index,
        }
    }

    /// Number of owners of the buffer.
    pub fn get_reference_counter(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    pub fn ptr_eq(&self, other: &Array<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn get(&self, key: impl Into<ArrayKey>) -> Option<&T> {
        self.get_by_key(&key.into())
    }

    pub fn get_by_key(&self, key: &ArrayKey) -> Option<&T> {
        match (&*self.inner, key) {
            (Storage::Vector(v), ArrayKey::Int(i)) => {
                usize::try_from(*i).ok().and_then(|i| v.get(i))
            }
            (Storage::Vector(_), ArrayKey::Str(_)) => None,
            (Storage::Map(m), key) => m.get(key),
        }
    }

    pub fn has_key(&self, key: impl Into<ArrayKey>) -> bool {
        self.get(key).is_some()
    }

    fn contains_key(&self, key: &ArrayKey) -> bool {
        self.get_by_key(key).is_some()
    }

    fn vector_len(&self) -> Option<usize> {
        match &*self.inner {
            Storage::Vector(v) => Some(v.len()),
            Storage::Map(_) => None,
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        let inner = match &*self.inner {
            Storage::Vector(v) => IterInner::Vector(v.iter().enumerate()),
            Storage::Map(m) => IterInner::Map(m.slots.iter()),
        };
        Iter {
            inner,
            remaining: self.count(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = ArrayKey> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Empty the array. A shared buffer is left to its other owners.
    pub fn clear(&mut self) {
        match Rc::get_mut(&mut self.inner) {
            Some(storage) => *storage = Storage::default(),
            None => self.inner = Rc::new(Storage::default()),
        }
    }
}

impl<T: Clone> Array<T> {
    /// Make the buffer unique, reserving room for `extra` more entries.
    ///
    /// A shared buffer is copied into a fresh one sized for the resulting
    /// count; map holes are dropped on the way.
    fn storage_mut(&mut self, extra: usize) -> &mut Storage<T> {
        if Rc::get_mut(&mut self.inner).is_none() {
            let fresh = match &*self.inner {
                Storage::Vector(v) => {
                    let mut copy = Vec::with_capacity(v.len() + extra);
                    copy.extend(v.iter().cloned());
                    Storage::Vector(copy)
                }
                Storage::Map(m) => {
                    let mut copy = OrderedMap {
                        slots: Vec::with_capacity(m.len + extra),
                        index: FxHashMap::default(),
                        len: 0,
                        next_index: 0,
                    };
                    copy.index.reserve(m.len + extra);
                    for (k, v) in m.slots.iter().flatten() {
                        copy.insert_new(k.clone(), v.clone());
                    }
                    copy.next_index = m.next_index;
                    Storage::Map(copy)
                }
            };
            self.inner = Rc::new(fresh);
        }
        Rc::make_mut(&mut self.inner)
    }

    /// The unique buffer in map form.
    fn map_mut(&mut self, extra: usize) -> &mut OrderedMap<T> {
        let storage = self.storage_mut(extra);
        if let Storage::Vector(v) = &mut *storage {
            let values = std::mem::take(v);
            *storage = Storage::Map(OrderedMap::from_vec(values, extra));
        }
        match storage {
            Storage::Map(m) => m,
            Storage::Vector(_) => unreachable!("converted to map above"),
        }
    }

    pub fn set(&mut self, key: impl Into<ArrayKey>, value: T) {
        let key = key.into();
        let index = key.as_int().and_then(|i| usize::try_from(i).ok());
        match (self.vector_len(), index) {
            (Some(len), Some(i)) if i < len => {
                if let Storage::Vector(v) = self.storage_mut(0) {
                    v[i] = value;
                }
            }
            (Some(len), Some(i)) if i == len => {
                if let Storage::Vector(v) = self.storage_mut(1) {
                    v.push(value);
                }
            }
            _ => {
                let extra = usize::from(!self.contains_key(&key));
                self.map_mut(extra).insert(key, value);
            }
        }
    }

    /// Append under [`next_index`](Self::next_index).
    pub fn push_back(&mut self, value: T) {
        match self.storage_mut(1) {
            Storage::Vector(v) => v.push(value),
            Storage::Map(m) => {
                let key = ArrayKey::Int(m.next_index);
                if m.index.contains_key(&key) {
                    crate::diagnostics::warning(
                        "Cannot add element to the array as the next element is already occupied",
                    );
                    return;
                }
                m.insert_new(key, value);
            }
        }
    }

    /// Remove an entry, returning its value. Missing keys are a no-op.
    pub fn erase(&mut self, key: impl Into<ArrayKey>) -> Option<T> {
        let key = key.into();
        if !self.contains_key(&key) {
            return None;
        }
        let is_last = self
            .vector_len()
            .is_some_and(|len| key.as_int() == i64::try_from(len).ok().map(|len| len - 1));
        if is_last {
            if let Storage::Vector(v) = self.storage_mut(0) {
                return v.pop();
            }
        }
        self.map_mut(0).remove(&key)
    }

    pub fn get_mut(&mut self, key: impl Into<ArrayKey>) -> Option<&mut T> {
        let key = key.into();
        if !self.contains_key(&key) {
            return None;
        }
        match self.storage_mut(0) {
            Storage::Vector(v) => key
                .as_int()
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| v.get_mut(i)),
            Storage::Map(m) => m.get_mut(&key),
        }
    }

    /// Values in order, mutable; copies a shared buffer first.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        let (vector, map) = match self.storage_mut(0) {
            Storage::Vector(v) => (Some(v.iter_mut()), None),
            Storage::Map(m) => (None, Some(m.slots.iter_mut().flatten().map(|(_, v)| v))),
        };
        vector.into_iter().flatten().chain(map.into_iter().flatten())
    }

    /// Add every entry of `other` whose key is not present yet (`+`).
    pub fn union_with(&mut self, other: &Array<T>) {
        if self.ptr_eq(other) {
            return;
        }
        for (key, value) in other.iter() {
            if !self.contains_key(&key) {
                self.set(key, value.clone());
            }
        }
    }
}

impl<T: Clone + Default> Array<T> {
    /// The value under `key`, or the default value when missing.
    pub fn get_or_default(&self, key: impl Into<ArrayKey>) -> T {
        self.get(key).cloned().unwrap_or_default()
    }

    /// Slot under `key`, inserted with the default value when missing.
    pub fn entry_mut(&mut self, key: impl Into<ArrayKey>) -> &mut T {
        let key = key.into();
        if !self.contains_key(&key) {
            self.set(key.clone(), T::default());
        }
        match self.get_mut(key) {
            Some(value) => value,
            None => unreachable!("entry was inserted above"),
        }
    }
}

impl<T> Default for Array<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Array<T> {
    fn clone(&self) -> Self {
        Array {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> From<Vec<T>> for Array<T> {
    fn from(values: Vec<T>) -> Self {
        Array::from_vec(values)
    }
}

impl<T> FromIterator<T> for Array<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Array::from_vec(iter.into_iter().collect())
    }
}

impl<T: Clone> FromIterator<(ArrayKey, T)> for Array<T> {
    fn from_iter<I: IntoIterator<Item = (ArrayKey, T)>>(iter: I) -> Self {
        let mut array = Array::new();
        for (key, value) in iter {
            array.set(key, value);
        }
        array
    }
}

/// Same entries, in the same order, with equal values (`===`).
impl<T: PartialEq> PartialEq for Array<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.count() == other.count() && self.iter().eq(other.iter())
    }
}

impl<T: fmt::Debug> fmt::Debug for Array<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_vector() {
            f.debug_list().entries(self.values()).finish()
        } else {
            f.debug_map().entries(self.iter()).finish()
        }
    }
}

enum IterInner<'a, T> {
    Vector(std::iter::Enumerate<std::slice::Iter<'a, T>>),
    Map(std::slice::Iter<'a, Option<(ArrayKey, T)>>),
}

/// Entries in insertion order.
pub struct Iter<'a, T> {
    inner: IterInner<'a, T>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (ArrayKey, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let item = match &mut self.inner {
            IterInner::Vector(it) => it
                .next()
                .map(|(i, v)| (ArrayKey::Int(i64::try_from(i).unwrap_or(i64::MAX)), v)),
            IterInner::Map(it) => it
                .by_ref()
                .flatten()
                .next()
                .map(|(k, v)| (k.clone(), v)),
        };
        if item.is_some() {
            self.remaining -= 1;
        }
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a Array<T> {
    type Item = (ArrayKey, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
