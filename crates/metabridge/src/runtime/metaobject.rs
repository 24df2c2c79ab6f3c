//! The metaobject interface consumed by the class builder.
//!
//! A [`MetaObject`] describes one foreign class: its members, their access
//! level, which members are signals, its enumerators and its superclass. It
//! also performs the live operations (property access, invocation, signal
//! connection) against a foreign instance identified by an [`ObjectHandle`].
//!
//! How a foreign runtime produces this description is outside this crate;
//! [`LocalMetaObject`](crate::runtime::local::LocalMetaObject) is an in-process
//! implementation.

use crate::error::Result;
use crate::runtime::name::Name;
use crate::runtime::value::Value;
use std::fmt;
use std::sync::Arc;

/// Opaque reference to a live foreign instance.
///
/// Owned by the foreign runtime; the engine only copies it around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(u64);

impl ObjectHandle {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<object {:#x}>", self.0)
    }
}

/// Identity of a foreign type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ForeignTypeId(u64);

impl ForeignTypeId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ForeignTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Access level of a foreign member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Public,
    Protected,
    Private,
}

/// Callback handed to the foreign layer by [`MetaObject::connect_signal`].
///
/// Invoked with the emitted arguments every time the foreign signal fires.
/// Returns `false` once its host-side target is gone; the foreign layer
/// should then drop the callback.
pub type SignalCallback = Arc<dyn Fn(&[Value]) -> bool + Send + Sync>;

/// Descriptor of a foreign class plus the operations to drive its instances.
///
/// All operations run on the thread that owns the foreign event loop; the
/// `Send + Sync` bound only lets descriptors be shared through the class
/// registry.
pub trait MetaObject: Send + Sync {
    /// Identity of the described foreign type.
    fn type_id(&self) -> ForeignTypeId;

    /// Foreign class name, used to name the host class.
    fn class_name(&self) -> &str;

    /// Method names declared by this class, in declaration order. Signals are
    /// methods as well.
    fn method_names(&self) -> Vec<Name>;

    /// Property names declared by this class, in declaration order.
    fn property_names(&self) -> Vec<Name>;

    /// Enumerator name/value pairs declared by this class, in order.
    fn enumerators(&self) -> Vec<(Name, i64)>;

    fn is_private(&self, name: Name) -> bool;

    fn is_protected(&self, name: Name) -> bool;

    fn is_signal(&self, name: Name) -> bool;

    /// Descriptor of the immediate superclass, if any.
    fn super_class(&self) -> Option<Arc<dyn MetaObject>>;

    /// Signal emitted when `property` changes, if it has one.
    fn notify_signal(&self, property: Name) -> Option<Name>;

    /// Reads a property.
    ///
    /// # Errors
    ///
    /// [`Error::Conversion`](crate::Error::Conversion) when the value has no
    /// host representation; other variants for foreign failures.
    fn get_property(&self, handle: ObjectHandle, name: Name) -> Result<Value>;

    /// Writes a property.
    ///
    /// # Errors
    ///
    /// [`Error::PropertyWrite`](crate::Error::PropertyWrite) when the foreign
    /// layer rejects the write.
    fn set_property(&self, handle: ObjectHandle, name: Name, value: Value) -> Result<()>;

    /// Invokes a method with positional arguments.
    ///
    /// # Errors
    ///
    /// [`Error::Invocation`](crate::Error::Invocation) when the call fails.
    fn invoke_method(&self, handle: ObjectHandle, name: Name, args: &[Value]) -> Result<Value>;

    /// Registers `callback` to be called whenever `signal` fires on `handle`.
    /// Implementations drop the registration once the callback returns `false`.
    ///
    /// # Errors
    ///
    /// [`Error::SignalConnect`](crate::Error::SignalConnect) when the foreign
    /// layer refuses the connection.
    fn connect_signal(
        &self,
        handle: ObjectHandle,
        signal: Name,
        callback: SignalCallback,
    ) -> Result<()>;

    /// Access level derived from the two visibility predicates.
    fn access(&self, name: Name) -> Access {
        if self.is_private(name) {
            Access::Private
        } else if self.is_protected(name) {
            Access::Protected
        } else {
            Access::Public
        }
    }

    fn is_public(&self, name: Name) -> bool {
        self.access(name) == Access::Public
    }
}

/// Compares two metaobjects by identity, not structure.
#[must_use]
pub fn same_metaobject(a: &Arc<dyn MetaObject>, b: &Arc<dyn MetaObject>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl fmt::Debug for dyn MetaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaObject")
            .field("class_name", &self.class_name())
            .field("type_id", &self.type_id())
            .finish_non_exhaustive()
    }
}
