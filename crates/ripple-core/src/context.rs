use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::collections::map::HashMap;

/// Key under which a value is provided to descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextKey(u64);

impl ContextKey {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Key derived from `name`. Equal names give equal keys for the life of
    /// the process, with either hashing backend.
    pub fn named(name: &str) -> Self {
        #[cfg(not(feature = "std-hash"))]
        let mut hasher = ahash::AHasher::default();
        #[cfg(feature = "std-hash")]
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        name.hash(&mut hasher);
        Self(hasher.finish())
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Values provided by ancestors, handed to a component on every render and
/// replaced wholesale rather than mutated in place.
#[derive(Clone, Default)]
pub struct Context {
    values: Rc<HashMap<ContextKey, Rc<dyn Any>>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this context with `key` bound to `value`.
    pub fn with<T: 'static>(&self, key: ContextKey, value: T) -> Self {
        let mut values: HashMap<ContextKey, Rc<dyn Any>> = (*self.values).clone();
        values.insert(key, Rc::new(value));
        Self {
            values: Rc::new(values),
        }
    }

    pub fn get<T: 'static>(&self, key: ContextKey) -> Option<&T> {
        self.values.get(&key)?.downcast_ref::<T>()
    }

    pub fn contains(&self, key: ContextKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn ptr_eq(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.values, &other.values)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}
