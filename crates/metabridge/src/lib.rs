//! `metabridge`: host classes synthesized from a foreign metaobject system
//!
//! A foreign object system describes its classes at runtime through
//! metaobjects: method, property and signal names, access levels, enumerators
//! and a superclass. `metabridge` turns each such description into a host
//! [`Class`] whose instances forward to the live foreign object:
//!
//! - **Methods** become forwarders (protected ones callable only from within
//!   the hierarchy, private ones never declared)
//! - **Properties** become per-instance [`BoundProperty`] accessors whose reads
//!   degrade to the [`UnsupportedType`] sentinel instead of failing
//! - **Signals** become per-instance [`BoundSignal`] observables that connect
//!   to the foreign side once, on the first subscription
//! - **Enumerators** become class constants
//!
//! Classes are memoized per foreign type by a [`ClassRegistry`] and rebuilt
//! only when a different metaobject arrives for the same type.
//!
//! # Example
//!
//! ```rust
//! use metabridge::{
//!     Access, ClassRegistry, ForeignTypeId, LocalMetaObject, MetaObject, MetaType,
//!     ObjectHandle, PropertySpec, Value,
//! };
//! use std::sync::{Arc, Mutex};
//!
//! let meta: Arc<dyn MetaObject> = LocalMetaObject::builder(ForeignTypeId::new(100), "Thermostat")
//!     .property("target", PropertySpec::new(MetaType::DOUBLE).notify("targetChanged"))
//!     .enumerator("Celsius", 0)
//!     .enumerator("Fahrenheit", 1)
//!     .build();
//!
//! let registry = ClassRegistry::new();
//! let thermostat = registry.instantiate(&meta, ObjectHandle::new(1)).unwrap();
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let target = thermostat.property("target").unwrap();
//! target.changed().connect(move |args| sink.lock().unwrap().extend_from_slice(args)).unwrap();
//!
//! target.set(21.5).unwrap();
//! assert_eq!(target.get().unwrap(), Value::from(21.5));
//! assert_eq!(*seen.lock().unwrap(), vec![Value::from(21.5)]);
//! assert_eq!(thermostat.constant("Fahrenheit"), Some(1));
//! ```
//!
//! # Logging
//!
//! Diagnostics go through `metabridge-log`; call
//! [`metabridge_log::init_from_env`] to honor `METABRIDGE_LOG`.

pub mod error;
pub mod runtime;

// Re-export commonly used types
pub use error::{Error, Result};
pub use runtime::{
    Access, BoundProperty, BoundSignal, Class, ClassBuilder, ClassRegistry, Connection,
    ForeignTypeId, HostType, LocalMetaObject, Member, MemberKind, MetaObject, MetaType,
    MetaTypeRegistry, Method, Name, Object, ObjectHandle, PropertySpec, SignalCallback,
    UnsupportedType, Value, Visibility, build_class,
};
