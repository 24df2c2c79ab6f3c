//! Class-synthesis runtime.
//!
//! # Architecture
//!
//! The runtime is organized bottom-up:
//!
//! - [`name`]: interned member names
//! - [`value`]: host values and the unsupported-type sentinel
//! - [`metatype`]: foreign type ids and their host equivalents
//! - [`metaobject`]: the descriptor interface a foreign runtime implements
//! - [`notifier`]: observer lists with snapshot delivery
//! - [`signal`] and [`property`]: per-instance bindings to foreign members
//! - [`class`] and [`object`]: host classes and the root base type
//! - [`builder`]: turns metaobjects into classes and memoizes them
//! - [`introspection`]: read-only queries over the class graph
//! - [`local`]: an in-process [`MetaObject`] implementation
//!
//! # Concurrency
//!
//! Every shared table sits behind a `RwLock` or `Mutex`; class building is
//! serialized per [`ClassRegistry`]. Observers and foreign callbacks are
//! always invoked with no runtime lock held.

pub mod builder;
pub mod class;
pub mod introspection;
pub mod local;
pub mod metaobject;
pub mod metatype;
pub mod name;
pub mod notifier;
pub mod object;
pub mod property;
pub mod signal;
pub mod value;

pub use builder::{ClassBuilder, ClassRegistry, build_class};
pub use class::{Class, Member, MemberKind, Method, ROOT_CLASS_NAME, Visibility};
pub use local::{LocalMetaObject, LocalMetaObjectBuilder, PropertySpec};
pub use metaobject::{Access, ForeignTypeId, MetaObject, ObjectHandle, SignalCallback, same_metaobject};
pub use metatype::{HostType, MetaType, MetaTypeRegistry};
pub use name::Name;
pub use notifier::{Connection, Notifier};
pub use object::Object;
pub use property::BoundProperty;
pub use signal::BoundSignal;
pub use value::{UnsupportedType, Value};

// Re-export commonly used introspection APIs
pub use introspection::{
    class_hierarchy, has_member, instance_members, instance_methods, is_subclass,
    method_provider, object_is_instance, object_responds_to, subclasses,
};
