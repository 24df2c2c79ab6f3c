//! Per-instance proxies for foreign signals.
//!
//! A [`BoundSignal`] starts dormant: it holds no foreign resources and makes
//! no foreign calls. The first observer to connect activates it, which
//! registers a single emit-forwarding callback with the foreign layer. That
//! registration is never repeated for the lifetime of the signal, however
//! many observers come and go.
//!
//! The forwarding callback holds a weak reference to the signal's
//! [`Notifier`], so the foreign side cannot keep observers alive after the
//! host object is gone. Once the signal is dropped the callback reports
//! itself dead and the foreign layer discards it.

use crate::error::Result;
use crate::runtime::metaobject::{MetaObject, ObjectHandle, SignalCallback};
use crate::runtime::name::Name;
use crate::runtime::notifier::{Connection, Notifier};
use crate::runtime::value::Value;
use metabridge_log::{debug, trace};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Host-side observable bound to one foreign signal of one foreign object.
pub struct BoundSignal {
    metaobject: Arc<dyn MetaObject>,
    handle: ObjectHandle,
    /// `None` for change streams of properties that have no notify signal.
    name: Option<Name>,
    notifier: Arc<Notifier>,
    active: Mutex<bool>,
}

impl BoundSignal {
    /// Creates a dormant signal for `name` on the object behind `handle`.
    #[must_use]
    pub fn new(metaobject: Arc<dyn MetaObject>, handle: ObjectHandle, name: Name) -> Self {
        Self::with_source(metaobject, handle, Some(name))
    }

    pub(crate) fn with_source(
        metaobject: Arc<dyn MetaObject>,
        handle: ObjectHandle,
        name: Option<Name>,
    ) -> Self {
        Self {
            metaobject,
            handle,
            name,
            notifier: Arc::new(Notifier::new()),
            active: Mutex::new(false),
        }
    }

    /// Foreign signal name, or `None` for a stream with no foreign source.
    #[must_use]
    pub fn name(&self) -> Option<Name> {
        self.name
    }

    #[must_use]
    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    /// Whether the foreign connection has been made.
    #[must_use]
    pub fn is_active(&self) -> bool {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.notifier.len()
    }

    /// Subscribes `observer` to every future emission.
    ///
    /// The first call connects to the foreign signal; later calls only add
    /// the observer.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::SignalConnect`](crate::Error::SignalConnect) from
    /// the foreign layer. The observer is then not registered and the signal
    /// stays dormant, so a later call tries to connect again.
    pub fn connect<F>(&self, observer: F) -> Result<Connection>
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.activate()?;
        Ok(self.notifier.subscribe(Arc::new(observer)))
    }

    /// Removes a subscription. The foreign connection stays in place.
    pub fn disconnect(&self, connection: Connection) -> bool {
        self.notifier.unsubscribe(connection)
    }

    /// Delivers `args` to the current observers, in subscription order.
    pub fn emit(&self, args: &[Value]) {
        trace!("emit {:?} on {} to {} observers", self.name, self.handle, self.notifier.len());
        self.notifier.emit(args);
    }

    fn activate(&self) -> Result<()> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if *active {
            return Ok(());
        }
        let Some(name) = self.name else {
            return Ok(());
        };

        let notifier = Arc::downgrade(&self.notifier);
        let forward: SignalCallback = Arc::new(move |args: &[Value]| match notifier.upgrade() {
            Some(notifier) => {
                notifier.emit(args);
                true
            }
            None => false,
        });
        self.metaobject.connect_signal(self.handle, name, forward)?;
        *active = true;

        debug!(
            "connected {}::{} on {}",
            self.metaobject.class_name(),
            name,
            self.handle
        );
        Ok(())
    }
}

impl fmt::Debug for BoundSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundSignal")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .field("active", &self.is_active())
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::runtime::local::LocalMetaObject;
    use crate::runtime::metaobject::{Access, ForeignTypeId};

    const HANDLE: ObjectHandle = ObjectHandle::new(0x51);

    fn emitter() -> Arc<LocalMetaObject> {
        LocalMetaObject::builder(ForeignTypeId::new(9101), "SignalEmitter")
            .signal("pinged", Access::Public)
            .build()
    }

    #[test]
    fn test_dormant_until_first_connect() {
        let local = emitter();
        let signal = BoundSignal::new(local.clone(), HANDLE, Name::new("pinged"));

        assert!(!signal.is_active());
        assert_eq!(local.connect_count(), 0);

        signal.connect(|_| {}).unwrap();
        assert!(signal.is_active());
        assert_eq!(local.connect_count(), 1);

        signal.connect(|_| {}).unwrap();
        assert_eq!(local.connect_count(), 1);
        assert_eq!(signal.observer_count(), 2);
    }

    #[test]
    fn test_foreign_emission_reaches_observers() {
        let local = emitter();
        let signal = BoundSignal::new(local.clone(), HANDLE, Name::new("pinged"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let connection = signal
            .connect(move |args| sink.lock().unwrap().push(args.to_vec()))
            .unwrap();

        assert_eq!(local.emit(HANDLE, "pinged", &[Value::from(1)]), 1);
        assert!(signal.disconnect(connection));
        local.emit(HANDLE, "pinged", &[Value::from(2)]);

        assert_eq!(*seen.lock().unwrap(), vec![vec![Value::from(1)]]);
    }

    #[test]
    fn test_failed_connect_stays_dormant() {
        let local = emitter();
        let signal = BoundSignal::new(local.clone(), HANDLE, Name::new("signal_test_missing"));

        let result = signal.connect(|_| {});
        assert!(matches!(result, Err(Error::SignalConnect { .. })));
        assert!(!signal.is_active());
        assert_eq!(signal.observer_count(), 0);
    }

    #[test]
    fn test_dropped_signal_releases_observers() {
        let local = emitter();
        let seen = Arc::new(Mutex::new(0_usize));
        {
            let signal = BoundSignal::new(local.clone(), HANDLE, Name::new("pinged"));
            let sink = Arc::clone(&seen);
            signal.connect(move |_| *sink.lock().unwrap() += 1).unwrap();
            assert_eq!(local.emit(HANDLE, "pinged", &[]), 1);
        }
        assert_eq!(local.emit(HANDLE, "pinged", &[]), 0);

        assert_eq!(*seen.lock().unwrap(), 1);
        assert_eq!(Arc::strong_count(&seen), 1);
        assert_eq!(local.connection_count(), 0);
    }

    #[test]
    fn test_sourceless_stream_never_connects() {
        let local = emitter();
        let stream = BoundSignal::with_source(local.clone(), HANDLE, None);

        stream.connect(|_| {}).unwrap();
        assert!(!stream.is_active());
        assert_eq!(local.connect_count(), 0);
        assert_eq!(stream.observer_count(), 1);
    }
}
