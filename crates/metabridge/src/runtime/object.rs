//! Host objects wrapping live foreign instances.
//!
//! [`Object`] is the root base type of every synthesized class: it stores the
//! foreign handle, compares and hashes by that handle, and dispatches
//! through its class's member table. Property and signal bindings are created
//! on first access and cached, so each (object, member name) pair has exactly
//! one [`BoundProperty`] and one [`BoundSignal`].

use crate::error::{Error, Result};
use crate::runtime::class::{Class, Member, Method, Visibility};
use crate::runtime::metaobject::ObjectHandle;
use crate::runtime::name::Name;
use crate::runtime::property::BoundProperty;
use crate::runtime::signal::BoundSignal;
use crate::runtime::value::Value;
use fxhash::FxHashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};

struct ObjectInner {
    class: Class,
    handle: ObjectHandle,
    properties: Mutex<FxHashMap<Name, Arc<BoundProperty>>>,
    signals: Mutex<FxHashMap<Name, Arc<BoundSignal>>>,
}

/// Host instance of a synthesized class.
///
/// Cloning is shallow: clones share the same binding caches.
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

impl Object {
    /// Wraps `handle` as an instance of `class`.
    #[must_use]
    pub fn new(class: &Class, handle: ObjectHandle) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                class: class.clone(),
                handle,
                properties: Mutex::new(FxHashMap::default()),
                signals: Mutex::new(FxHashMap::default()),
            }),
        }
    }

    #[must_use]
    pub fn class(&self) -> &Class {
        &self.inner.class
    }

    #[must_use]
    pub fn handle(&self) -> ObjectHandle {
        self.inner.handle
    }

    /// Calls a public method.
    ///
    /// # Errors
    ///
    /// - [`Error::MethodNotFound`] if no method named `name` is visible
    /// - [`Error::ProtectedMethod`] if the method is protected
    /// - whatever the method itself returns
    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Value> {
        let (_, method) = self.find_method(name)?;
        if method.visibility == Visibility::Protected {
            return Err(Error::ProtectedMethod { name: name.to_owned() });
        }
        method.call(self, args)
    }

    /// Calls a method from code belonging to `caller`.
    ///
    /// Protected methods are reachable only when `caller` is the class that
    /// declared the method or derives from it. Ancestors of the declaring
    /// class, the root base class included, are outside.
    ///
    /// # Errors
    ///
    /// Same as [`Object::invoke`].
    pub fn invoke_from(&self, caller: &Class, name: &str, args: &[Value]) -> Result<Value> {
        let (owner, method) = self.find_method(name)?;
        if method.visibility == Visibility::Protected && !caller.is_subclass_of(&owner) {
            return Err(Error::ProtectedMethod { name: name.to_owned() });
        }
        method.call(self, args)
    }

    /// Property binding for `name`, created on first access.
    ///
    /// # Errors
    ///
    /// [`Error::PropertyNotFound`] if the class chain declares no such
    /// property.
    pub fn property(&self, name: &str) -> Result<Arc<BoundProperty>> {
        let not_found = || Error::PropertyNotFound { name: name.to_owned() };
        let key = Name::lookup(name).ok_or_else(not_found)?;

        if let Some(bound) = Self::cached(&self.inner.properties, key) {
            return Ok(bound);
        }
        let factory = match self.class().lookup_member(key) {
            Some((_, Member::Property(factory))) => factory,
            _ => return Err(not_found()),
        };
        let bound = Arc::new(factory(self));
        Ok(Self::cache(&self.inner.properties, key, bound))
    }

    /// Signal binding for `name`, created on first access.
    ///
    /// # Errors
    ///
    /// [`Error::SignalNotFound`] if the class chain declares no such signal.
    pub fn signal(&self, name: &str) -> Result<Arc<BoundSignal>> {
        let not_found = || Error::SignalNotFound { name: name.to_owned() };
        let key = Name::lookup(name).ok_or_else(not_found)?;

        if let Some(bound) = Self::cached(&self.inner.signals, key) {
            return Ok(bound);
        }
        let factory = match self.class().lookup_member(key) {
            Some((_, Member::Signal(factory))) => factory,
            _ => return Err(not_found()),
        };
        let bound = Arc::new(factory(self));
        Ok(Self::cache(&self.inner.signals, key, bound))
    }

    /// Class constant (enumerator value) visible from this object's class.
    #[must_use]
    pub fn constant(&self, name: &str) -> Option<i64> {
        self.class().constant(name)
    }

    /// Whether any member named `name` is declared in the class chain.
    #[must_use]
    pub fn responds_to(&self, name: &str) -> bool {
        Name::lookup(name).is_some_and(|key| self.class().lookup_member(key).is_some())
    }

    fn find_method(&self, name: &str) -> Result<(Class, Method)> {
        let found = Name::lookup(name).and_then(|key| self.class().lookup_member(key));
        match found {
            Some((owner, Member::Method(method))) => Ok((owner, method)),
            _ => Err(Error::MethodNotFound { name: name.to_owned() }),
        }
    }

    fn cached<T>(cache: &Mutex<FxHashMap<Name, Arc<T>>>, key: Name) -> Option<Arc<T>> {
        cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    // Factories run without the cache lock held; if two callers race, the
    // first insert wins and both get the same binding.
    fn cache<T>(cache: &Mutex<FxHashMap<Name, Arc<T>>>, key: Name, bound: Arc<T>) -> Arc<T> {
        Arc::clone(
            cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key)
                .or_insert(bound),
        )
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.inner.handle == other.inner.handle
    }
}

impl Eq for Object {}

impl Hash for Object {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.handle.hash(state);
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class().name())
            .field("handle", &self.handle())
            .finish()
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<{} {}>", self.class().name(), self.handle())
    }
}
