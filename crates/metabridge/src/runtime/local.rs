//! In-process metaobjects.
//!
//! [`LocalMetaObject`] implements [`MetaObject`] with Rust closures and an
//! in-memory property store. It describes a class the same way a foreign
//! runtime would (members, access levels, signals, enumerators, superclass)
//! and drives instances identified by [`ObjectHandle`]s, which makes it the
//! reference implementation for embedding and for tests.
//!
//! ```rust
//! use metabridge::{Access, ForeignTypeId, LocalMetaObject, MetaType, ObjectHandle, PropertySpec, Value};
//! use metabridge::MetaObject;
//!
//! let meta = LocalMetaObject::builder(ForeignTypeId::new(40), "Counter")
//!     .property("count", PropertySpec::new(MetaType::INT).notify("countChanged"))
//!     .method("reset", Access::Public, 0, |_, _| Ok(Value::Nil))
//!     .build();
//!
//! let count = metabridge::Name::new("count");
//! let handle = ObjectHandle::new(1);
//! meta.set_property(handle, count, Value::from(3)).unwrap();
//! assert_eq!(meta.get_property(handle, count).unwrap(), Value::from(3));
//! assert!(meta.set_property(handle, count, Value::from("three")).is_err());
//! ```

use crate::error::{Error, Result};
use crate::runtime::metaobject::{Access, ForeignTypeId, MetaObject, ObjectHandle, SignalCallback};
use crate::runtime::metatype::{MetaType, MetaTypeRegistry};
use crate::runtime::name::Name;
use crate::runtime::value::Value;
use fxhash::FxHashMap;
use metabridge_log::trace;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Method body: receives the target handle and positional arguments.
pub type MethodFn = Arc<dyn Fn(ObjectHandle, &[Value]) -> Result<Value> + Send + Sync>;

/// Custom property reader.
pub type PropertyGetter = Arc<dyn Fn(ObjectHandle) -> Result<Value> + Send + Sync>;

/// Custom property writer.
pub type PropertySetter = Arc<dyn Fn(ObjectHandle, Value) -> Result<()> + Send + Sync>;

/// Declaration of one property.
///
/// Without a getter or setter the value lives in the metaobject's own store,
/// keyed by handle; unset properties read as [`Value::Nil`].
#[derive(Clone)]
pub struct PropertySpec {
    meta_type: MetaType,
    notify: Option<Name>,
    read_only: bool,
    getter: Option<PropertyGetter>,
    setter: Option<PropertySetter>,
}

impl PropertySpec {
    #[must_use]
    pub fn new(meta_type: MetaType) -> Self {
        Self {
            meta_type,
            notify: None,
            read_only: false,
            getter: None,
            setter: None,
        }
    }

    /// Signal emitted with the new value after every successful write.
    #[must_use]
    pub fn notify(mut self, signal: &str) -> Self {
        self.notify = Some(Name::new(signal));
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    #[must_use]
    pub fn getter<F>(mut self, getter: F) -> Self
    where
        F: Fn(ObjectHandle) -> Result<Value> + Send + Sync + 'static,
    {
        self.getter = Some(Arc::new(getter));
        self
    }

    #[must_use]
    pub fn setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(ObjectHandle, Value) -> Result<()> + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(setter));
        self
    }

    #[must_use]
    pub fn meta_type(&self) -> MetaType {
        self.meta_type
    }
}

impl fmt::Debug for PropertySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySpec")
            .field("meta_type", &self.meta_type)
            .field("notify", &self.notify)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct Overload {
    arity: usize,
    imp: MethodFn,
}

#[derive(Clone)]
struct MethodDecl {
    name: Name,
    access: Access,
    signal: bool,
    overloads: Vec<Overload>,
}

/// Builder for [`LocalMetaObject`].
pub struct LocalMetaObjectBuilder {
    type_id: ForeignTypeId,
    class_name: String,
    super_class: Option<Arc<dyn MetaObject>>,
    methods: Vec<MethodDecl>,
    properties: Vec<(Name, PropertySpec)>,
    enumerators: Vec<(Name, i64)>,
}

impl LocalMetaObjectBuilder {
    #[must_use]
    pub fn super_class(mut self, super_class: Arc<dyn MetaObject>) -> Self {
        self.super_class = Some(super_class);
        self
    }

    /// Declares a method overload taking `arity` arguments.
    ///
    /// Repeating a name adds an overload; the access level of the latest
    /// declaration applies to all of them.
    #[must_use]
    pub fn method<F>(mut self, name: &str, access: Access, arity: usize, imp: F) -> Self
    where
        F: Fn(ObjectHandle, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        let overload = Overload {
            arity,
            imp: Arc::new(imp),
        };
        let decl = self.declare(Name::new(name), access, false);
        decl.overloads.push(overload);
        self
    }

    #[must_use]
    pub fn signal(mut self, name: &str, access: Access) -> Self {
        self.declare(Name::new(name), access, true);
        self
    }

    /// Declares a property. Its notify signal is declared as a public signal
    /// unless it already exists.
    #[must_use]
    pub fn property(mut self, name: &str, spec: PropertySpec) -> Self {
        if let Some(notify) = spec.notify
            && !self.methods.iter().any(|m| m.name == notify)
        {
            self.declare(notify, Access::Public, true);
        }
        let name = Name::new(name);
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = spec,
            None => self.properties.push((name, spec)),
        }
        self
    }

    #[must_use]
    pub fn enumerator(mut self, name: &str, value: i64) -> Self {
        self.enumerators.push((Name::new(name), value));
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<LocalMetaObject> {
        let index = self
            .methods
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name, i))
            .collect();
        Arc::new(LocalMetaObject {
            type_id: self.type_id,
            class_name: self.class_name,
            super_class: self.super_class,
            methods: self.methods,
            index,
            properties: self.properties,
            enumerators: self.enumerators,
            values: Mutex::new(FxHashMap::default()),
            connections: Mutex::new(Vec::new()),
            connect_count: AtomicUsize::new(0),
        })
    }

    fn declare(&mut self, name: Name, access: Access, signal: bool) -> &mut MethodDecl {
        let position = match self.methods.iter().position(|m| m.name == name) {
            Some(i) => i,
            None => {
                self.methods.push(MethodDecl {
                    name,
                    access,
                    signal,
                    overloads: Vec::new(),
                });
                self.methods.len() - 1
            }
        };
        let decl = &mut self.methods[position];
        decl.access = access;
        decl.signal = signal;
        decl
    }
}

/// A [`MetaObject`] implemented entirely in process.
pub struct LocalMetaObject {
    type_id: ForeignTypeId,
    class_name: String,
    super_class: Option<Arc<dyn MetaObject>>,
    methods: Vec<MethodDecl>,
    index: FxHashMap<Name, usize>,
    properties: Vec<(Name, PropertySpec)>,
    enumerators: Vec<(Name, i64)>,
    values: Mutex<FxHashMap<(ObjectHandle, Name), Value>>,
    connections: Mutex<Vec<(ObjectHandle, Name, SignalCallback)>>,
    connect_count: AtomicUsize,
}

impl LocalMetaObject {
    #[must_use]
    pub fn builder(type_id: ForeignTypeId, class_name: &str) -> LocalMetaObjectBuilder {
        LocalMetaObjectBuilder {
            type_id,
            class_name: class_name.to_owned(),
            super_class: None,
            methods: Vec::new(),
            properties: Vec::new(),
            enumerators: Vec::new(),
        }
    }

    /// Fires `signal` on `handle`, returning how many live callbacks ran.
    ///
    /// Callbacks reporting that their target is gone are discarded.
    pub fn emit(&self, handle: ObjectHandle, signal: &str, args: &[Value]) -> usize {
        match Name::lookup(signal) {
            Some(name) => self.emit_name(handle, name, args),
            None => 0,
        }
    }

    /// Number of successful [`MetaObject::connect_signal`] calls so far.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::Acquire)
    }

    /// Number of callbacks currently held, across all handles and signals.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn method(&self, name: Name) -> Option<&MethodDecl> {
        self.index.get(&name).map(|&i| &self.methods[i])
    }

    fn property_spec(&self, name: Name) -> Option<&PropertySpec> {
        self.properties.iter().find(|(n, _)| *n == name).map(|(_, spec)| spec)
    }

    fn emit_name(&self, handle: ObjectHandle, signal: Name, args: &[Value]) -> usize {
        let callbacks: Vec<SignalCallback> = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(h, n, _)| *h == handle && *n == signal)
            .map(|(_, _, callback)| Arc::clone(callback))
            .collect();

        trace!("{}::{} fired on {} ({} callbacks)", self.class_name, signal, handle, callbacks.len());
        let (live, dead): (Vec<_>, Vec<_>) = callbacks.into_iter().partition(|callback| callback(args));

        if !dead.is_empty() {
            trace!("{}::{} dropping {} dead callbacks", self.class_name, signal, dead.len());
            self.connections
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(_, _, callback)| {
                    !dead
                        .iter()
                        .any(|gone| std::ptr::addr_eq(Arc::as_ptr(gone), Arc::as_ptr(callback)))
                });
        }
        live.len()
    }

    fn write_error(property: Name, reason: impl Into<String>) -> Error {
        Error::PropertyWrite {
            property: property.as_str().to_owned(),
            reason: reason.into(),
        }
    }
}

impl MetaObject for LocalMetaObject {
    fn type_id(&self) -> ForeignTypeId {
        self.type_id
    }

    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn method_names(&self) -> Vec<Name> {
        self.methods.iter().map(|m| m.name).collect()
    }

    fn property_names(&self) -> Vec<Name> {
        self.properties.iter().map(|(name, _)| *name).collect()
    }

    fn enumerators(&self) -> Vec<(Name, i64)> {
        self.enumerators.clone()
    }

    fn is_private(&self, name: Name) -> bool {
        self.method(name).is_some_and(|m| m.access == Access::Private)
    }

    fn is_protected(&self, name: Name) -> bool {
        self.method(name).is_some_and(|m| m.access == Access::Protected)
    }

    fn is_signal(&self, name: Name) -> bool {
        self.method(name).is_some_and(|m| m.signal)
    }

    fn super_class(&self) -> Option<Arc<dyn MetaObject>> {
        self.super_class.clone()
    }

    fn notify_signal(&self, property: Name) -> Option<Name> {
        match self.property_spec(property) {
            Some(spec) => spec.notify,
            None => self.super_class.as_ref()?.notify_signal(property),
        }
    }

    fn get_property(&self, handle: ObjectHandle, name: Name) -> Result<Value> {
        let Some(spec) = self.property_spec(name) else {
            return match &self.super_class {
                Some(super_class) => super_class.get_property(handle, name),
                None => Err(Error::PropertyNotFound {
                    name: name.as_str().to_owned(),
                }),
            };
        };
        if let Some(getter) = &spec.getter {
            return getter(handle);
        }
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(handle, name))
            .cloned()
            .unwrap_or_default())
    }

    fn set_property(&self, handle: ObjectHandle, name: Name, value: Value) -> Result<()> {
        let Some(spec) = self.property_spec(name) else {
            return match &self.super_class {
                Some(super_class) => super_class.set_property(handle, name, value),
                None => Err(Error::PropertyNotFound {
                    name: name.as_str().to_owned(),
                }),
            };
        };
        if spec.read_only {
            return Err(Self::write_error(name, "property is read-only"));
        }
        if !MetaTypeRegistry::global().accepts(spec.meta_type.id(), &value)? {
            return Err(Self::write_error(
                name,
                format!("expected {}, got {}", spec.meta_type, value.type_name()),
            ));
        }

        match &spec.setter {
            Some(setter) => setter(handle, value.clone())?,
            None => {
                self.values
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert((handle, name), value.clone());
            }
        }

        if let Some(notify) = spec.notify {
            self.emit_name(handle, notify, &[value]);
        }
        Ok(())
    }

    fn invoke_method(&self, handle: ObjectHandle, name: Name, args: &[Value]) -> Result<Value> {
        let Some(decl) = self.method(name) else {
            return match &self.super_class {
                Some(super_class) => super_class.invoke_method(handle, name, args),
                None => Err(Error::MethodNotFound {
                    name: name.as_str().to_owned(),
                }),
            };
        };
        if decl.signal {
            self.emit_name(handle, name, args);
            return Ok(Value::Nil);
        }

        let overload = decl
            .overloads
            .iter()
            .find(|o| o.arity == args.len())
            .ok_or_else(|| Error::Invocation {
                method: name.as_str().to_owned(),
                reason: format!("no overload takes {} arguments", args.len()),
            })?;
        (overload.imp)(handle, args)
    }

    fn connect_signal(&self, handle: ObjectHandle, signal: Name, callback: SignalCallback) -> Result<()> {
        if !self.is_signal(signal) {
            return Err(Error::SignalConnect {
                signal: signal.as_str().to_owned(),
                reason: format!("{} declares no such signal", self.class_name),
            });
        }
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((handle, signal, callback));
        self.connect_count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

impl fmt::Debug for LocalMetaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalMetaObject")
            .field("type_id", &self.type_id)
            .field("class_name", &self.class_name)
            .field("methods", &self.methods.len())
            .field("properties", &self.properties.len())
            .field("enumerators", &self.enumerators)
            .finish_non_exhaustive()
    }
}
