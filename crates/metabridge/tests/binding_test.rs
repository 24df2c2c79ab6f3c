//! Object binding tests
//!
//! Tests for per-instance bindings on synthesized classes:
//! - Method forwarding and overloads
//! - Protected and private access rules
//! - Property reads, writes and the unsupported-type sentinel
//! - Signal connect-once semantics and ordered fan-out
//!
//! Run with: `cargo test --test binding_test`

mod common;

use common::{as_dyn, next_handle, widget_meta};
use metabridge::{
    Class, ClassRegistry, Error, LocalMetaObject, Object, UnsupportedType, Value,
};
use std::sync::{Arc, Mutex};

fn widget() -> (Arc<LocalMetaObject>, ClassRegistry, Object) {
    let meta = widget_meta(None);
    let registry = ClassRegistry::new();
    let object = registry.instantiate(&as_dyn(&meta), next_handle()).unwrap();
    (meta, registry, object)
}

// ============================================================================
// Method Tests
// ============================================================================

#[test]
fn test_public_method_forwards() {
    let (_, _, object) = widget();

    assert_eq!(object.invoke("show", &[]).unwrap(), Value::from("shown"));
    assert_eq!(
        object.invoke("resize", &[Value::from(3), Value::from(4)]).unwrap(),
        Value::from(12)
    );
}

#[test]
fn test_wrong_arity_is_an_invocation_error() {
    let (_, _, object) = widget();
    assert!(matches!(
        object.invoke("resize", &[Value::from(3)]),
        Err(Error::Invocation { .. })
    ));
}

#[test]
fn test_protected_method_rules() {
    let (_, _, object) = widget();

    assert_eq!(
        object.invoke("repaint", &[]),
        Err(Error::ProtectedMethod {
            name: "repaint".into()
        })
    );
    let class = object.class().clone();
    assert_eq!(
        object.invoke_from(&class, "repaint", &[]).unwrap(),
        Value::from("repainted")
    );
}

#[test]
fn test_protected_method_unreachable_from_root() {
    let (_, _, object) = widget();

    assert!(matches!(
        object.invoke_from(&Class::root(), "repaint", &[]),
        Err(Error::ProtectedMethod { .. })
    ));
}

#[test]
fn test_private_method_is_absent() {
    let (_, _, object) = widget();

    assert!(!object.responds_to("destroyLater"));
    assert!(matches!(
        object.invoke("destroyLater", &[]),
        Err(Error::MethodNotFound { .. })
    ));
}

#[test]
fn test_inherited_method_forwards_to_ancestor() {
    let base = widget_meta(None);
    let derived = common::empty_meta("PushButton", Some(as_dyn(&base)));
    let registry = ClassRegistry::new();
    let object = registry.instantiate(&as_dyn(&derived), next_handle()).unwrap();

    assert_eq!(object.invoke("show", &[]).unwrap(), Value::from("shown"));
    assert_eq!(object.constant("Red"), Some(0));
}

// ============================================================================
// Property Tests
// ============================================================================

#[test]
fn test_property_round_trip() {
    let (_, _, object) = widget();
    let title = object.property("title").unwrap();

    assert_eq!(title.get().unwrap(), Value::Nil);
    title.set("Settings").unwrap();
    assert_eq!(title.get().unwrap(), Value::from("Settings"));
}

#[test]
fn test_unconvertible_property_reads_as_sentinel() {
    let (_, _, object) = widget();
    let value = object.property("geometry").unwrap().get().unwrap();

    assert_eq!(value, Value::Unsupported(UnsupportedType));
    assert_eq!(value.to_string(), "<unsupported type>");
    assert_eq!(format!("{UnsupportedType:?}"), "<unsupported type>");
}

#[test]
fn test_property_write_failure_propagates() {
    let (_, _, object) = widget();
    let title = object.property("title").unwrap();

    assert!(matches!(title.set(42), Err(Error::PropertyWrite { .. })));
    assert_eq!(title.get().unwrap(), Value::Nil);
}

#[test]
fn test_bindings_are_cached_per_object() {
    let (meta, registry, object) = widget();
    let other = registry.instantiate(&as_dyn(&meta), next_handle()).unwrap();

    let a = object.property("title").unwrap();
    let b = object.property("title").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &other.property("title").unwrap()));

    let s1 = object.signal("clicked").unwrap();
    let s2 = object.clone().signal("clicked").unwrap();
    assert!(Arc::ptr_eq(&s1, &s2));
}

#[test]
fn test_member_kind_mismatch() {
    let (_, _, object) = widget();

    assert!(matches!(object.property("show"), Err(Error::PropertyNotFound { .. })));
    assert!(matches!(object.signal("title"), Err(Error::SignalNotFound { .. })));
    assert!(matches!(object.invoke("clicked", &[]), Err(Error::MethodNotFound { .. })));
}

#[test]
fn test_property_change_stream() {
    let (meta, _, object) = widget();
    let title = object.property("title").unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    title
        .changed()
        .connect(move |args| sink.lock().unwrap().push(args.to_vec()))
        .unwrap();
    title.set("one").unwrap();
    title.set("two").unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![vec![Value::from("one")], vec![Value::from("two")]]
    );
    assert_eq!(meta.connect_count(), 1);
}

#[test]
fn test_change_stream_shares_notify_signal() {
    let (meta, _, object) = widget();
    let title = object.property("title").unwrap();
    let notify = object.signal("titleChanged").unwrap();
    assert!(std::ptr::eq(title.changed(), &*notify));

    let hits = Arc::new(Mutex::new(0_usize));
    let from_property = Arc::clone(&hits);
    title
        .changed()
        .connect(move |_| *from_property.lock().unwrap() += 1)
        .unwrap();
    let from_signal = Arc::clone(&hits);
    notify
        .connect(move |_| *from_signal.lock().unwrap() += 1)
        .unwrap();

    title.set("shared").unwrap();
    assert_eq!(meta.connect_count(), 1);
    assert_eq!(*hits.lock().unwrap(), 2);
}

// ============================================================================
// Signal Tests
// ============================================================================

#[test]
fn test_signal_connects_once() {
    let (meta, _, object) = widget();
    let clicked = object.signal("clicked").unwrap();

    assert_eq!(meta.connect_count(), 0);
    clicked.connect(|_| {}).unwrap();
    assert_eq!(meta.connect_count(), 1);
    clicked.connect(|_| {}).unwrap();
    assert_eq!(meta.connect_count(), 1);

    object.signal("clicked").unwrap().connect(|_| {}).unwrap();
    assert_eq!(meta.connect_count(), 1);
}

#[test]
fn test_signal_fan_out_in_subscription_order() {
    let (meta, _, object) = widget();
    let clicked = object.signal("clicked").unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));

    for label in ["A", "B", "C"] {
        let calls = Arc::clone(&calls);
        clicked
            .connect(move |args| calls.lock().unwrap().push((label, args.to_vec())))
            .unwrap();
    }

    let args = [Value::from(1), Value::from("x")];
    assert_eq!(meta.emit(object.handle(), "clicked", &args), 1);

    let calls = calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec![
            ("A", args.to_vec()),
            ("B", args.to_vec()),
            ("C", args.to_vec()),
        ]
    );
}

#[test]
fn test_emission_is_per_object() {
    let (meta, registry, object) = widget();
    let other = registry.instantiate(&as_dyn(&meta), next_handle()).unwrap();
    let hits = Arc::new(Mutex::new(0_usize));
    let sink = Arc::clone(&hits);

    object
        .signal("clicked")
        .unwrap()
        .connect(move |_| *sink.lock().unwrap() += 1)
        .unwrap();
    meta.emit(other.handle(), "clicked", &[]);
    meta.emit(object.handle(), "clicked", &[]);

    assert_eq!(*hits.lock().unwrap(), 1);
}

#[test]
fn test_disconnected_observer_stops_receiving() {
    let (meta, _, object) = widget();
    let clicked = object.signal("clicked").unwrap();
    let hits = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&hits);
    let connection = clicked
        .connect(move |_| first.lock().unwrap().push("first"))
        .unwrap();
    let second = Arc::clone(&hits);
    clicked
        .connect(move |_| second.lock().unwrap().push("second"))
        .unwrap();

    meta.emit(object.handle(), "clicked", &[]);
    assert!(clicked.disconnect(connection));
    meta.emit(object.handle(), "clicked", &[]);

    assert_eq!(*hits.lock().unwrap(), ["first", "second", "second"]);
}

#[test]
fn test_dropped_objects_leave_no_callbacks() {
    let meta = widget_meta(None);
    let registry = ClassRegistry::new();
    let handle = next_handle();

    for _ in 0..100 {
        let object = registry.instantiate(&as_dyn(&meta), handle).unwrap();
        object.signal("clicked").unwrap().connect(|_| {}).unwrap();
    }
    assert_eq!(meta.connect_count(), 100);

    assert_eq!(meta.emit(handle, "clicked", &[]), 0);
    assert_eq!(meta.connection_count(), 0);
}

#[test]
fn test_object_identity_and_display() {
    let (meta, registry, object) = widget();
    let same = registry.instantiate(&as_dyn(&meta), object.handle()).unwrap();

    assert_eq!(object, same);
    assert_eq!(
        object.to_string(),
        format!("#<Widget {}>", object.handle())
    );
}
