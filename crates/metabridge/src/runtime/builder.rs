//! Class synthesis from metaobjects.
//!
//! The [`ClassBuilder`] turns a [`MetaObject`] into a host [`Class`]:
//!
//! 1. If no class exists yet (none was given and none is memoized for the
//!    foreign type id), the superclass chain is resolved first
//!    (ancestors are built before descendants) and the new class is created
//!    under the ancestor's class, or under [`Class::root`].
//! 2. If the class already reflects this exact metaobject, nothing happens.
//! 3. Otherwise every non-private method becomes a forwarder (or a signal
//!    factory), every property a property factory, every enumerator a
//!    constant, and the metaobject is recorded as reflected.
//!
//! The [`ClassRegistry`] memoizes one canonical class per foreign type id and
//! serializes builds behind a lock, so concurrent callers never mutate the
//! same class at once.
//!
//! # Example
//!
//! ```rust
//! use metabridge::{Access, ClassRegistry, ForeignTypeId, LocalMetaObject, MetaObject, ObjectHandle, Value};
//! use std::sync::Arc;
//!
//! let meta: Arc<dyn MetaObject> = LocalMetaObject::builder(ForeignTypeId::new(1), "Greeter")
//!     .method("greet", Access::Public, 1, |_, args| {
//!         Ok(Value::from(format!("hello {}", args[0].as_str().unwrap_or("?"))))
//!     })
//!     .enumerator("Loud", 1)
//!     .build();
//!
//! let registry = ClassRegistry::new();
//! let object = registry.instantiate(&meta, ObjectHandle::new(7)).unwrap();
//!
//! assert_eq!(object.invoke("greet", &[Value::from("bob")]).unwrap(), Value::from("hello bob"));
//! assert_eq!(object.constant("Loud"), Some(1));
//! ```

use crate::error::{Error, Result};
use crate::runtime::class::{Class, Member, Method, PropertyFactory, SignalFactory, Visibility};
use crate::runtime::metaobject::{Access, ForeignTypeId, MetaObject, ObjectHandle};
use crate::runtime::name::Name;
use crate::runtime::object::Object;
use crate::runtime::property::BoundProperty;
use crate::runtime::signal::BoundSignal;
use crate::runtime::value::Value;
use fxhash::FxHashMap;
use metabridge_log::{debug, trace};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

/// Memoizing store of built classes, keyed by foreign type id.
pub struct ClassRegistry {
    classes: RwLock<FxHashMap<ForeignTypeId, Class>>,
    build_lock: Mutex<()>,
}

static GLOBAL: OnceLock<ClassRegistry> = OnceLock::new();

impl ClassRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            classes: RwLock::new(FxHashMap::default()),
            build_lock: Mutex::new(()),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static ClassRegistry {
        GLOBAL.get_or_init(Self::new)
    }

    /// Returns the canonical class for `metaobject`'s foreign type, building
    /// or extending it as needed.
    ///
    /// # Errors
    ///
    /// [`Error::InheritanceCycle`] or [`Error::SuperClassUnresolved`] when the
    /// superclass chain cannot be turned into classes.
    pub fn class_for(&self, metaobject: &Arc<dyn MetaObject>) -> Result<Class> {
        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut resolving = Vec::new();
        self.class_for_locked(metaobject, &mut resolving)
    }

    /// Builds `metaobject` into `existing`. When `existing` is `None` the
    /// memoized class for the metaobject's type is used, or a new one is
    /// created.
    ///
    /// # Errors
    ///
    /// Same as [`ClassRegistry::class_for`].
    pub fn build(&self, metaobject: &Arc<dyn MetaObject>, existing: Option<&Class>) -> Result<Class> {
        ClassBuilder::new(self, Arc::clone(metaobject), existing.cloned()).build()
    }

    /// Wraps a foreign instance in an object of the canonical class.
    ///
    /// # Errors
    ///
    /// Same as [`ClassRegistry::class_for`].
    pub fn instantiate(&self, metaobject: &Arc<dyn MetaObject>, handle: ObjectHandle) -> Result<Object> {
        let class = self.class_for(metaobject)?;
        Ok(Object::new(&class, handle))
    }

    #[must_use]
    pub fn get(&self, type_id: ForeignTypeId) -> Option<Class> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .cloned()
    }

    #[must_use]
    pub fn contains(&self, type_id: ForeignTypeId) -> bool {
        self.get(type_id).is_some()
    }

    /// First registered class with this name.
    #[must_use]
    pub fn class_from_name(&self, name: &str) -> Option<Class> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|class| class.name() == name)
            .cloned()
    }

    /// Every registered class, sorted by name.
    #[must_use]
    pub fn all_classes(&self) -> Vec<Class> {
        let mut classes: Vec<Class> = self
            .classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        classes.sort_by(|a, b| a.name().cmp(b.name()));
        classes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn class_for_locked(
        &self,
        metaobject: &Arc<dyn MetaObject>,
        resolving: &mut Vec<ForeignTypeId>,
    ) -> Result<Class> {
        ClassBuilder::new(self, Arc::clone(metaobject), None).run(resolving)
    }

    fn memoize(&self, type_id: ForeignTypeId, class: &Class) {
        self.classes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(type_id)
            .or_insert_with(|| class.clone());
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds (or extends) the class for one metaobject.
pub struct ClassBuilder<'r> {
    registry: &'r ClassRegistry,
    metaobject: Arc<dyn MetaObject>,
    class: Option<Class>,
}

impl<'r> ClassBuilder<'r> {
    /// Prepares a build of `metaobject` into `existing`, falling back to the
    /// registry's class for the same foreign type, then to a new class.
    #[must_use]
    pub fn new(
        registry: &'r ClassRegistry,
        metaobject: Arc<dyn MetaObject>,
        existing: Option<Class>,
    ) -> Self {
        Self {
            registry,
            metaobject,
            class: existing,
        }
    }

    #[must_use]
    pub fn metaobject(&self) -> &Arc<dyn MetaObject> {
        &self.metaobject
    }

    /// Runs the build and returns the resulting class.
    ///
    /// # Errors
    ///
    /// [`Error::InheritanceCycle`] or [`Error::SuperClassUnresolved`] when the
    /// superclass chain cannot be turned into classes.
    pub fn build(self) -> Result<Class> {
        let _guard = self
            .registry
            .build_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut resolving = Vec::new();
        self.run(&mut resolving)
    }

    fn run(self, resolving: &mut Vec<ForeignTypeId>) -> Result<Class> {
        let memoized = || self.registry.get(self.metaobject.type_id());
        let class = match self.class.clone().or_else(memoized) {
            Some(class) => class,
            None => self.create(resolving)?,
        };
        self.registry.memoize(self.metaobject.type_id(), &class);

        if class.reflects(&self.metaobject) {
            trace!("{} already reflects its metaobject", class.name());
            return Ok(class);
        }

        self.declare_members(&class);
        class.set_reflected(Arc::clone(&self.metaobject));
        Ok(class)
    }

    fn create(&self, resolving: &mut Vec<ForeignTypeId>) -> Result<Class> {
        let type_id = self.metaobject.type_id();
        let name = self.metaobject.class_name().to_owned();
        if resolving.contains(&type_id) {
            return Err(Error::InheritanceCycle { class: name });
        }

        resolving.push(type_id);
        let parent = match self.metaobject.super_class() {
            Some(super_meta) => self
                .registry
                .class_for_locked(&super_meta, resolving)
                .map_err(|err| match err {
                    Error::InheritanceCycle { .. } | Error::SuperClassUnresolved { .. } => err,
                    _ => Error::SuperClassUnresolved { class: name.clone() },
                }),
            None => Ok(Class::root()),
        };
        resolving.pop();
        let parent = parent?;

        debug!("creating class {name} ({type_id}) under {}", parent.name());
        Ok(Class::for_foreign_type(&name, &parent, type_id))
    }

    fn declare_members(&self, class: &Class) {
        let meta = &self.metaobject;
        let mut declared = 0_usize;

        for name in meta.method_names() {
            let visibility = match meta.access(name) {
                Access::Private => {
                    trace!("skipping private {}::{}", class.name(), name);
                    continue;
                }
                Access::Protected => Visibility::Protected,
                Access::Public => Visibility::Public,
            };
            if meta.is_signal(name) {
                class.add_member(name, Member::Signal(self.signal_factory(name)));
            } else {
                class.add_method(self.forwarder(name, visibility));
            }
            trace!("declared {}::{} ({visibility:?})", class.name(), name);
            declared += 1;
        }

        for name in meta.property_names() {
            class.add_member(name, Member::Property(self.property_factory(name)));
            trace!("declared property {}::{}", class.name(), name);
            declared += 1;
        }

        for (name, value) in meta.enumerators() {
            class.set_constant(name, value);
            declared += 1;
        }

        debug!(
            "{} now reflects {} ({declared} declarations)",
            class.name(),
            meta.class_name()
        );
    }

    fn forwarder(&self, name: Name, visibility: Visibility) -> Method {
        let meta = Arc::clone(&self.metaobject);
        Method::new(name, visibility, move |receiver: &Object, args: &[Value]| {
            meta.invoke_method(receiver.handle(), name, args)
        })
    }

    fn property_factory(&self, name: Name) -> PropertyFactory {
        let meta = Arc::clone(&self.metaobject);
        Arc::new(move |object: &Object| {
            let meta = Arc::clone(&meta);
            let shared = meta
                .notify_signal(name)
                .and_then(|notify| object.signal(notify.as_str()).ok());
            match shared {
                Some(changed) => BoundProperty::with_changed(meta, object.handle(), name, changed),
                None => BoundProperty::new(meta, object.handle(), name),
            }
        })
    }

    fn signal_factory(&self, name: Name) -> SignalFactory {
        let meta = Arc::clone(&self.metaobject);
        Arc::new(move |object: &Object| BoundSignal::new(Arc::clone(&meta), object.handle(), name))
    }
}

/// Returns the canonical class for `metaobject` from the process-wide
/// registry.
///
/// # Errors
///
/// Same as [`ClassRegistry::class_for`].
pub fn build_class(metaobject: &Arc<dyn MetaObject>) -> Result<Class> {
    ClassRegistry::global().class_for(metaobject)
}
