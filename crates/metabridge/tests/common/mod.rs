// Common test utilities for integration tests
//
// This module provides shared fixtures: unique foreign type ids and a few
// metaobjects shaped like the classes a foreign UI toolkit would describe.

#![allow(dead_code)]

use metabridge::{
    Access, Error, ForeignTypeId, LocalMetaObject, MetaObject, MetaType, ObjectHandle,
    PropertySpec, Value,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

static TEST_ID: AtomicUsize = AtomicUsize::new(1);

/// Returns a foreign type id no other test uses.
pub fn next_type_id() -> ForeignTypeId {
    ForeignTypeId::new(100_000 + TEST_ID.fetch_add(1, Ordering::SeqCst) as u64)
}

/// Returns a handle no other test uses.
pub fn next_handle() -> ObjectHandle {
    ObjectHandle::new(0x1000 + TEST_ID.fetch_add(1, Ordering::SeqCst) as u64)
}

/// Upcasts a local metaobject to the trait object the builder consumes.
pub fn as_dyn(meta: &Arc<LocalMetaObject>) -> Arc<dyn MetaObject> {
    meta.clone()
}

/// A metaobject with one member of every kind and access level.
pub fn widget_meta(super_class: Option<Arc<dyn MetaObject>>) -> Arc<LocalMetaObject> {
    let mut builder = LocalMetaObject::builder(next_type_id(), "Widget")
        .method("show", Access::Public, 0, |_, _| Ok(Value::from("shown")))
        .method("resize", Access::Public, 2, |_, args| {
            let w = args[0].as_int().unwrap_or(0);
            let h = args[1].as_int().unwrap_or(0);
            Ok(Value::from(w * h))
        })
        .method("repaint", Access::Protected, 0, |_, _| Ok(Value::from("repainted")))
        .method("destroyLater", Access::Private, 0, |_, _| Ok(Value::Nil))
        .signal("clicked", Access::Public)
        .property("title", PropertySpec::new(MetaType::Q_STRING).notify("titleChanged"))
        .property(
            "geometry",
            PropertySpec::new(MetaType::Q_VARIANT).getter(|_| {
                Err(Error::Conversion {
                    type_name: "QRectF".into(),
                })
            }),
        )
        .enumerator("Red", 0)
        .enumerator("Green", 1);
    if let Some(super_class) = super_class {
        builder = builder.super_class(super_class);
    }
    builder.build()
}

/// A bare metaobject with no members.
pub fn empty_meta(class_name: &str, super_class: Option<Arc<dyn MetaObject>>) -> Arc<LocalMetaObject> {
    let builder = LocalMetaObject::builder(next_type_id(), class_name);
    match super_class {
        Some(super_class) => builder.super_class(super_class).build(),
        None => builder.build(),
    }
}
