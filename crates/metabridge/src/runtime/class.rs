//! Host classes: runtime-constructed type descriptors with dispatch tables.
//!
//! This module implements the class system with:
//! - A fixed root base class shared by every synthesized class
//! - Single inheritance with chain walking for member and constant lookup
//! - A per-class member table (methods, property factories, signal factories)
//! - The reflected-metaobject marker used by the builder's idempotence check
//!
//! # Architecture
//!
//! A `Class` is a cheap handle (`Arc`) to shared class data. Classes are never
//! destroyed explicitly: the registry holds every built class for the life of
//! the process and handles compare by pointer.
//!
//! Member tables live behind `RwLock`s so a class can be extended in place
//! when the builder sees a newer metaobject for the same foreign type.
//! Declaring a name that is already present in the same class replaces the
//! previous entry (last write wins); declaring a name present in an ancestor
//! shadows it.

use crate::error::Result;
use crate::runtime::metaobject::{ForeignTypeId, MetaObject, same_metaobject};
use crate::runtime::name::Name;
use crate::runtime::object::Object;
use crate::runtime::property::BoundProperty;
use crate::runtime::signal::BoundSignal;
use crate::runtime::value::Value;
use fxhash::FxHashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Name of the root base class.
pub const ROOT_CLASS_NAME: &str = "ForeignObjectBase";

/// Method implementation: receives the receiver object and positional
/// arguments.
pub type MethodImp = Arc<dyn Fn(&Object, &[Value]) -> Result<Value> + Send + Sync>;

/// Builds the per-instance [`BoundProperty`] for an object.
pub type PropertyFactory = Arc<dyn Fn(&Object) -> BoundProperty + Send + Sync>;

/// Builds the per-instance [`BoundSignal`] for an object.
pub type SignalFactory = Arc<dyn Fn(&Object) -> BoundSignal + Send + Sync>;

/// Who may call a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Part of the public surface.
    Public,
    /// Callable only from within the class hierarchy.
    Protected,
}

/// A dispatchable method.
#[derive(Clone)]
pub struct Method {
    pub name: Name,
    pub visibility: Visibility,
    pub imp: MethodImp,
}

impl Method {
    /// Wraps a closure as a method.
    pub fn new<F>(name: Name, visibility: Visibility, imp: F) -> Self
    where
        F: Fn(&Object, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name,
            visibility,
            imp: Arc::new(imp),
        }
    }

    /// Calls the implementation. Visibility is checked by the caller.
    ///
    /// # Errors
    ///
    /// Whatever the implementation returns.
    pub fn call(&self, receiver: &Object, args: &[Value]) -> Result<Value> {
        (self.imp)(receiver, args)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .finish_non_exhaustive()
    }
}

/// Kind of a declared member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Method,
    Property,
    Signal,
}

/// Entry in a class's member table.
#[derive(Clone)]
pub enum Member {
    Method(Method),
    Property(PropertyFactory),
    Signal(SignalFactory),
}

impl Member {
    #[must_use]
    pub fn kind(&self) -> MemberKind {
        match self {
            Member::Method(_) => MemberKind::Method,
            Member::Property(_) => MemberKind::Property,
            Member::Signal(_) => MemberKind::Signal,
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Method(m) => m.fmt(f),
            Member::Property(_) => f.write_str("Property"),
            Member::Signal(_) => f.write_str("Signal"),
        }
    }
}

struct ClassInner {
    name: String,
    type_id: Option<ForeignTypeId>,
    super_class: Option<Class>,
    members: RwLock<FxHashMap<Name, Member>>,
    constants: RwLock<FxHashMap<Name, i64>>,
    /// Metaobject the members were last declared from.
    reflected: RwLock<Option<Arc<dyn MetaObject>>>,
}

/// A runtime class descriptor.
///
/// # Example
///
/// ```rust
/// use metabridge::{Class, Method, Name, Object, ObjectHandle, Value, Visibility};
///
/// let class = Class::new("Counter", &Class::root());
/// class.add_method(Method::new(Name::new("answer"), Visibility::Public, |_, _| {
///     Ok(Value::Int(42))
/// }));
///
/// let object = Object::new(&class, ObjectHandle::new(1));
/// assert_eq!(object.invoke("answer", &[]).unwrap(), Value::Int(42));
/// assert!(class.is_subclass_of(&Class::root()));
/// ```
#[derive(Clone)]
pub struct Class {
    inner: Arc<ClassInner>,
}

static ROOT: OnceLock<Class> = OnceLock::new();

impl Class {
    /// The root base class every synthesized class derives from.
    ///
    /// It declares no members; instances get handle storage, equality and
    /// hashing from [`Object`].
    pub fn root() -> Class {
        ROOT.get_or_init(|| Self::create(ROOT_CLASS_NAME, None, None))
            .clone()
    }

    /// Creates a class that is not tied to a foreign type.
    #[must_use]
    pub fn new(name: &str, super_class: &Class) -> Class {
        Self::create(name, Some(super_class.clone()), None)
    }

    pub(crate) fn for_foreign_type(
        name: &str,
        super_class: &Class,
        type_id: ForeignTypeId,
    ) -> Class {
        Self::create(name, Some(super_class.clone()), Some(type_id))
    }

    fn create(name: &str, super_class: Option<Class>, type_id: Option<ForeignTypeId>) -> Class {
        Class {
            inner: Arc::new(ClassInner {
                name: name.to_owned(),
                type_id,
                super_class,
                members: RwLock::new(FxHashMap::default()),
                constants: RwLock::new(FxHashMap::default()),
                reflected: RwLock::new(None),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Foreign type this class mirrors, if any.
    #[must_use]
    pub fn type_id(&self) -> Option<ForeignTypeId> {
        self.inner.type_id
    }

    #[must_use]
    pub fn super_class(&self) -> Option<Class> {
        self.inner.super_class.clone()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.inner.super_class.is_none()
    }

    /// Declares a method, replacing any member of the same name in this
    /// class.
    pub fn add_method(&self, method: Method) {
        self.add_member(method.name, Member::Method(method));
    }

    /// Declares a member, replacing any member of the same name in this
    /// class.
    pub fn add_member(&self, name: Name, member: Member) {
        self.inner
            .members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, member);
    }

    /// Declares a class-level constant, replacing any previous value.
    pub fn set_constant(&self, name: Name, value: i64) {
        self.inner
            .constants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, value);
    }

    /// Member declared directly on this class.
    #[must_use]
    pub fn own_member(&self, name: Name) -> Option<Member> {
        self.inner
            .members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name)
            .cloned()
    }

    /// Looks `name` up through the inheritance chain.
    ///
    /// Returns the nearest declaration together with the class declaring it.
    #[must_use]
    pub fn lookup_member(&self, name: Name) -> Option<(Class, Member)> {
        let mut current = Some(self.clone());
        while let Some(class) = current {
            if let Some(member) = class.own_member(name) {
                return Some((class, member));
            }
            current = class.super_class();
        }
        None
    }

    /// Looks up a method through the inheritance chain.
    ///
    /// A nearer non-method member with the same name hides inherited methods.
    #[must_use]
    pub fn lookup_method(&self, name: Name) -> Option<Method> {
        match self.lookup_member(name) {
            Some((_, Member::Method(method))) => Some(method),
            _ => None,
        }
    }

    /// Looks up a constant through the inheritance chain.
    #[must_use]
    pub fn constant(&self, name: &str) -> Option<i64> {
        let name = Name::lookup(name)?;
        let mut current = Some(self.clone());
        while let Some(class) = current {
            let found = class
                .inner
                .constants
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&name)
                .copied();
            if found.is_some() {
                return found;
            }
            current = class.super_class();
        }
        None
    }

    /// Constants declared directly on this class, sorted by name.
    #[must_use]
    pub fn own_constants(&self) -> Vec<(Name, i64)> {
        let mut constants: Vec<(Name, i64)> = self
            .inner
            .constants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, value)| (*name, *value))
            .collect();
        constants.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        constants
    }

    /// Names of members declared directly on this class, sorted.
    #[must_use]
    pub fn own_member_names(&self) -> Vec<Name> {
        let mut names: Vec<Name> = self
            .inner
            .members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        names
    }

    /// Number of members declared directly on this class.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.inner
            .members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether this class is `class` or inherits from it.
    #[must_use]
    pub fn is_subclass_of(&self, class: &Class) -> bool {
        let mut current = Some(self.clone());
        while let Some(c) = current {
            if c == *class {
                return true;
            }
            current = c.super_class();
        }
        false
    }

    /// Metaobject this class currently reflects.
    #[must_use]
    pub fn reflected_metaobject(&self) -> Option<Arc<dyn MetaObject>> {
        self.inner
            .reflected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the members were last declared from exactly `metaobject`.
    #[must_use]
    pub fn reflects(&self, metaobject: &Arc<dyn MetaObject>) -> bool {
        self.inner
            .reflected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|current| same_metaobject(current, metaobject))
    }

    pub(crate) fn set_reflected(&self, metaobject: Arc<dyn MetaObject>) {
        *self
            .inner
            .reflected
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(metaobject);
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Class {}

impl std::hash::Hash for Class {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let super_name = self.super_class().map(|c| c.name().to_owned());
        f.debug_struct("Class")
            .field("name", &self.name())
            .field("type_id", &self.type_id())
            .field("super_class", &super_name)
            .field("members", &self.member_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::metaobject::ObjectHandle;

    fn constant_method(name: &str, value: i64) -> Method {
        Method::new(Name::new(name), Visibility::Public, move |_, _| Ok(Value::Int(value)))
    }

    #[test]
    fn test_root_class() {
        let root = Class::root();
        assert_eq!(root.name(), ROOT_CLASS_NAME);
        assert!(root.is_root());
        assert_eq!(root, Class::root());
        assert_eq!(root.member_count(), 0);
    }

    #[test]
    fn test_subclass_creation() {
        let parent = Class::new("ClassTestParent", &Class::root());
        let child = Class::new("ClassTestChild", &parent);

        assert_eq!(child.super_class(), Some(parent.clone()));
        assert!(child.is_subclass_of(&parent));
        assert!(child.is_subclass_of(&Class::root()));
        assert!(!parent.is_subclass_of(&child));
        assert!(child.is_subclass_of(&child));
    }

    #[test]
    fn test_same_name_is_not_same_class() {
        let a = Class::new("ClassTestTwin", &Class::root());
        let b = Class::new("ClassTestTwin", &Class::root());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_inherited_lookup_and_override() {
        let parent = Class::new("ClassTestOverrideParent", &Class::root());
        let child = Class::new("ClassTestOverrideChild", &parent);
        parent.add_method(constant_method("value", 1));
        parent.add_method(constant_method("inherited", 7));
        child.add_method(constant_method("value", 2));

        let object = Object::new(&child, ObjectHandle::new(10));
        assert_eq!(object.invoke("value", &[]).unwrap(), Value::Int(2));
        assert_eq!(object.invoke("inherited", &[]).unwrap(), Value::Int(7));

        let (owner, _) = child.lookup_member(Name::new("inherited")).unwrap();
        assert_eq!(owner, parent);
    }

    #[test]
    fn test_last_write_wins() {
        let class = Class::new("ClassTestCollision", &Class::root());
        class.add_method(constant_method("dup", 1));
        class.add_method(constant_method("dup", 2));

        assert_eq!(class.member_count(), 1);
        let object = Object::new(&class, ObjectHandle::new(11));
        assert_eq!(object.invoke("dup", &[]).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_constants_walk_chain() {
        let parent = Class::new("ClassTestConstParent", &Class::root());
        let child = Class::new("ClassTestConstChild", &parent);
        parent.set_constant(Name::new("Red"), 0);
        child.set_constant(Name::new("Green"), 1);

        assert_eq!(child.constant("Red"), Some(0));
        assert_eq!(child.constant("Green"), Some(1));
        assert_eq!(parent.constant("Green"), None);
        assert_eq!(child.constant("class_test_no_such_constant_anywhere"), None);
        assert_eq!(child.own_constants(), vec![(Name::new("Green"), 1)]);
    }

    #[test]
    fn test_debug_output() {
        let parent = Class::new("ClassTestDebugParent", &Class::root());
        let child = Class::new("ClassTestDebugChild", &parent);
        let rendered = format!("{child:?}");

        assert!(rendered.contains("ClassTestDebugChild"));
        assert!(rendered.contains("ClassTestDebugParent"));
    }
}
