//! Foreign metatype identities and their host equivalents.
//!
//! A [`MetaType`] names a foreign value type by its numeric id and records the
//! host [`HostType`] its values convert to. The [`MetaTypeRegistry`] is the
//! lookup the engine consults when checking values against property types;
//! the ids of the builtin constants match the foreign runtime's own numbering.

use crate::error::{Error, Result};
use crate::runtime::value::Value;
use fxhash::FxBuildHasher;
use hashbrown::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{OnceLock, PoisonError, RwLock};

/// Host-language equivalent of a foreign type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostType {
    Nil,
    Bool,
    Int,
    Float,
    String,
    List,
    Map,
    Object,
    /// Variant types: any host value.
    Any,
}

/// A foreign value type.
///
/// Equality and hashing use the id only; two `MetaType`s with the same id are
/// the same type regardless of how they were obtained.
///
/// # Example
///
/// ```rust
/// use metabridge::{HostType, MetaType};
///
/// let t = MetaType::Q_STRING;
/// assert_eq!(t.id(), 10);
/// assert_eq!(t.to_string(), "QString");
/// assert_eq!(t.inspect(), "<MetaType:QString>");
/// assert_eq!(t.host_type(), HostType::String);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MetaType {
    id: i32,
    name: &'static str,
    host: HostType,
}

impl MetaType {
    pub const BOOL: MetaType = MetaType::new(1, "bool", HostType::Bool);
    pub const INT: MetaType = MetaType::new(2, "int", HostType::Int);
    pub const UINT: MetaType = MetaType::new(3, "uint", HostType::Int);
    pub const LONG_LONG: MetaType = MetaType::new(4, "qlonglong", HostType::Int);
    pub const ULONG_LONG: MetaType = MetaType::new(5, "qulonglong", HostType::Int);
    pub const DOUBLE: MetaType = MetaType::new(6, "double", HostType::Float);
    pub const Q_VARIANT_MAP: MetaType = MetaType::new(8, "QVariantMap", HostType::Map);
    pub const Q_VARIANT_LIST: MetaType = MetaType::new(9, "QVariantList", HostType::List);
    pub const Q_STRING: MetaType = MetaType::new(10, "QString", HostType::String);
    pub const FLOAT: MetaType = MetaType::new(38, "float", HostType::Float);
    pub const Q_OBJECT_STAR: MetaType = MetaType::new(39, "QObject*", HostType::Object);
    pub const Q_VARIANT: MetaType = MetaType::new(41, "QVariant", HostType::Any);
    pub const VOID: MetaType = MetaType::new(43, "void", HostType::Nil);

    const BUILTINS: [MetaType; 13] = [
        Self::BOOL,
        Self::INT,
        Self::UINT,
        Self::LONG_LONG,
        Self::ULONG_LONG,
        Self::DOUBLE,
        Self::Q_VARIANT_MAP,
        Self::Q_VARIANT_LIST,
        Self::Q_STRING,
        Self::FLOAT,
        Self::Q_OBJECT_STAR,
        Self::Q_VARIANT,
        Self::VOID,
    ];

    /// Creates a metatype description.
    #[must_use]
    pub const fn new(id: i32, name: &'static str, host: HostType) -> Self {
        Self { id, name, host }
    }

    #[must_use]
    pub const fn id(&self) -> i32 {
        self.id
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn host_type(&self) -> HostType {
        self.host
    }

    /// Detailed rendering, e.g. `<MetaType:QString>`. No namespace prefix.
    #[must_use]
    pub fn inspect(&self) -> String {
        format!("<MetaType:{}>", self.name)
    }

    /// Checks whether `value` can be stored in a slot of this type.
    ///
    /// Integers widen into floating point slots and `nil` is a valid object
    /// reference.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self.host, value.host_type()) {
            (_, None) => false,
            (HostType::Any, Some(_)) => true,
            (HostType::Float, Some(HostType::Int)) => true,
            (HostType::Object, Some(HostType::Nil)) => true,
            (expected, Some(got)) => expected == got,
        }
    }
}

impl PartialEq for MetaType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MetaType {}

impl Hash for MetaType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Lookup table from metatype id and name to [`MetaType`].
pub struct MetaTypeRegistry {
    by_id: RwLock<HashMap<i32, MetaType, FxBuildHasher>>,
}

static GLOBAL: OnceLock<MetaTypeRegistry> = OnceLock::new();

impl MetaTypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_id: RwLock::new(HashMap::with_hasher(FxBuildHasher::default())),
        }
    }

    /// Creates a registry pre-populated with the builtin metatypes.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for meta_type in MetaType::BUILTINS {
            registry.register(meta_type);
        }
        registry
    }

    /// The process-wide registry, created with the builtins on first use.
    pub fn global() -> &'static MetaTypeRegistry {
        GLOBAL.get_or_init(Self::with_builtins)
    }

    /// Registers `meta_type`, replacing any previous entry with the same id.
    pub fn register(&self, meta_type: MetaType) -> Option<MetaType> {
        self.by_id
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(meta_type.id, meta_type)
    }

    #[must_use]
    pub fn from_id(&self, id: i32) -> Option<MetaType> {
        self.by_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .copied()
    }

    #[must_use]
    pub fn from_name(&self, name: &str) -> Option<MetaType> {
        self.by_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|t| t.name == name)
            .copied()
    }

    /// Host type for a metatype id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMetaType`] if `id` is not registered.
    pub fn host_type(&self, id: i32) -> Result<HostType> {
        self.from_id(id)
            .map(|t| t.host)
            .ok_or(Error::UnknownMetaType { id })
    }

    /// Checks `value` against the metatype registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMetaType`] if `id` is not registered.
    pub fn accepts(&self, id: i32, value: &Value) -> Result<bool> {
        self.from_id(id)
            .map(|t| t.accepts(value))
            .ok_or(Error::UnknownMetaType { id })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MetaTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
