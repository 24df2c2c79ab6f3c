//! Introspection over synthesized classes.
//!
//! This module provides read-only queries over the class graph:
//!
//! - **Hierarchy** - walk from a class up to the root base class
//! - **Members** - list the members visible on a class, find who declares one
//! - **Objects** - check what an object's class responds to
//!
//! # Example
//!
//! ```rust
//! use metabridge::runtime::introspection::{class_hierarchy, is_subclass};
//! use metabridge::Class;
//!
//! let base = Class::new("Shape", &Class::root());
//! let circle = Class::new("Circle", &base);
//!
//! let names: Vec<String> = class_hierarchy(&circle)
//!     .iter()
//!     .map(|c| c.name().to_owned())
//!     .collect();
//! assert_eq!(names, ["Circle", "Shape", "ForeignObjectBase"]);
//! assert!(is_subclass(&circle, &base));
//! ```

use crate::runtime::builder::ClassRegistry;
use crate::runtime::class::{Class, Member, MemberKind, Method};
use crate::runtime::name::Name;
use crate::runtime::object::Object;
use fxhash::FxHashSet;

// ============================================================================
// Hierarchy
// ============================================================================

/// Get the class hierarchy from a class to the root.
///
/// Returns the given class first and the root base class last.
#[must_use]
pub fn class_hierarchy(class: &Class) -> Vec<Class> {
    let mut hierarchy = Vec::new();
    let mut current = Some(class.clone());

    while let Some(cls) = current {
        hierarchy.push(cls.clone());
        current = cls.super_class();
    }

    hierarchy
}

/// Check if `child` is `parent` or inherits from it.
///
/// # Example
///
/// ```rust
/// use metabridge::runtime::introspection::is_subclass;
/// use metabridge::Class;
///
/// let parent = Class::new("Parent", &Class::root());
/// let child = Class::new("Child", &parent);
///
/// assert!(is_subclass(&child, &parent));
/// assert!(!is_subclass(&parent, &child));
/// ```
#[must_use]
pub fn is_subclass(child: &Class, parent: &Class) -> bool {
    child.is_subclass_of(parent)
}

/// Classes in `registry` that directly inherit from `class`, sorted by name.
#[must_use]
pub fn subclasses(registry: &ClassRegistry, class: &Class) -> Vec<Class> {
    registry
        .all_classes()
        .into_iter()
        .filter(|c| c.super_class().as_ref() == Some(class))
        .collect()
}

// ============================================================================
// Member Introspection
// ============================================================================

/// Enumerate every member visible on instances of `class`.
///
/// Walks from `class` to the root; the nearest declaration of a name wins,
/// as it does for dispatch. The result is sorted by name.
#[must_use]
pub fn instance_members(class: &Class) -> Vec<(Name, MemberKind)> {
    let mut seen = FxHashSet::default();
    let mut members = Vec::new();

    for cls in class_hierarchy(class) {
        for name in cls.own_member_names() {
            if !seen.insert(name) {
                continue;
            }
            if let Some(member) = cls.own_member(name) {
                members.push((name, member.kind()));
            }
        }
    }

    members.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
    members
}

/// Enumerate the methods callable on instances of `class`, sorted by name.
///
/// Names shadowed by a nearer property or signal are left out.
#[must_use]
pub fn instance_methods(class: &Class) -> Vec<Method> {
    instance_members(class)
        .into_iter()
        .filter(|(_, kind)| *kind == MemberKind::Method)
        .filter_map(|(name, _)| class.lookup_method(name))
        .collect()
}

/// Check if `class` or one of its ancestors declares a member named `name`.
#[must_use]
pub fn has_member(class: &Class, name: &str) -> bool {
    Name::lookup(name).is_some_and(|key| class.lookup_member(key).is_some())
}

/// Find which class in the hierarchy provides the method `name`.
///
/// Returns `None` when the name is unknown or the nearest declaration is
/// not a method.
///
/// # Example
///
/// ```rust
/// use metabridge::runtime::introspection::method_provider;
/// use metabridge::{Class, Method, Name, Value, Visibility};
///
/// let base = Class::new("Provider", &Class::root());
/// base.add_method(Method::new(Name::new("describe"), Visibility::Public, |_, _| Ok(Value::Nil)));
/// let derived = Class::new("Consumer", &base);
///
/// assert_eq!(method_provider(&derived, "describe"), Some(base));
/// ```
#[must_use]
pub fn method_provider(class: &Class, name: &str) -> Option<Class> {
    let key = Name::lookup(name)?;
    match class.lookup_member(key)? {
        (provider, Member::Method(_)) => Some(provider),
        _ => None,
    }
}

// ============================================================================
// Object Introspection
// ============================================================================

/// Check if `object` responds to `name` through its class chain.
#[must_use]
pub fn object_responds_to(object: &Object, name: &str) -> bool {
    object.responds_to(name)
}

/// Check if `object` is an instance of `class` or one of its subclasses.
#[must_use]
pub fn object_is_instance(object: &Object, class: &Class) -> bool {
    object.class().is_subclass_of(class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::class::Visibility;
    use crate::runtime::metaobject::ObjectHandle;
    use crate::runtime::value::Value;

    fn method(name: &str) -> Method {
        Method::new(Name::new(name), Visibility::Public, |_, _| Ok(Value::Nil))
    }

    fn fixture() -> (Class, Class) {
        let base = Class::new("IntrospectBase", &Class::root());
        base.add_method(method("introspect_shared"));
        base.add_method(method("introspect_base_only"));
        let derived = Class::new("IntrospectDerived", &base);
        derived.add_method(method("introspect_shared"));
        derived.add_method(method("introspect_derived_only"));
        (base, derived)
    }

    #[test]
    fn test_class_hierarchy() {
        let (base, derived) = fixture();
        let hierarchy = class_hierarchy(&derived);

        assert_eq!(hierarchy.len(), 3);
        assert_eq!(hierarchy[0], derived);
        assert_eq!(hierarchy[1], base);
        assert!(hierarchy[2].is_root());
    }

    #[test]
    fn test_is_subclass() {
        let (base, derived) = fixture();
        assert!(is_subclass(&derived, &base));
        assert!(is_subclass(&derived, &Class::root()));
        assert!(!is_subclass(&base, &derived));
    }

    #[test]
    fn test_instance_members() {
        let (_, derived) = fixture();
        let names: Vec<&str> = instance_members(&derived)
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();

        assert_eq!(
            names,
            ["introspect_base_only", "introspect_derived_only", "introspect_shared"]
        );
        assert_eq!(instance_methods(&derived).len(), 3);
    }

    #[test]
    fn test_method_provider() {
        let (base, derived) = fixture();
        assert_eq!(method_provider(&derived, "introspect_shared"), Some(derived.clone()));
        assert_eq!(method_provider(&derived, "introspect_base_only"), Some(base));
        assert_eq!(method_provider(&derived, "introspect_absent"), None);
        assert!(has_member(&derived, "introspect_base_only"));
    }

    #[test]
    fn test_object_queries() {
        let (base, derived) = fixture();
        let object = Object::new(&derived, ObjectHandle::new(0x40));
        let stranger = Class::new("IntrospectStranger", &Class::root());

        assert!(object_responds_to(&object, "introspect_derived_only"));
        assert!(!object_responds_to(&object, "introspect_absent"));
        assert!(object_is_instance(&object, &base));
        assert!(!object_is_instance(&object, &stranger));
    }
}
