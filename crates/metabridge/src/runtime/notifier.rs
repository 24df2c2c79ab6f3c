//! Host-side notification stream.
//!
//! A [`Notifier`] is an ordered list of observers. Emission walks a snapshot
//! of the list taken when the emission starts, so observers may connect or
//! disconnect (themselves or others) from inside a callback without
//! disturbing the pass already in flight.

use crate::runtime::value::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Observer callback receiving the emitted arguments.
pub type Observer = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Token identifying one subscription; pass it back to disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection(u64);

impl Connection {
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// Ordered observer list with snapshot emission.
#[derive(Default)]
pub struct Notifier {
    observers: Mutex<Vec<(Connection, Observer)>>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `observer`; it will run after every observer already present.
    pub fn subscribe(&self, observer: Observer) -> Connection {
        let connection = Connection(NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed));
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((connection, observer));
        connection
    }

    /// Removes a subscription. Returns `false` if it was not present.
    pub fn unsubscribe(&self, connection: Connection) -> bool {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(c, _)| *c != connection);
        observers.len() != before
    }

    /// Calls every current observer with `args`, in subscription order.
    pub fn emit(&self, args: &[Value]) {
        let snapshot: Vec<Observer> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in snapshot {
            observer(args);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> Observer) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |tag: &'static str| -> Observer {
            let sink = Arc::clone(&sink);
            Arc::new(move |args: &[Value]| {
                let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
                sink.lock().unwrap().push(format!("{tag}({})", rendered.join(",")));
            })
        };
        (log, make)
    }

    #[test]
    fn test_emit_in_subscription_order() {
        let notifier = Notifier::new();
        let (log, make) = recorder();

        notifier.subscribe(make("A"));
        notifier.subscribe(make("B"));
        notifier.subscribe(make("C"));
        notifier.emit(&[Value::Int(1), Value::from("x")]);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["A(1,\"x\")", "B(1,\"x\")", "C(1,\"x\")"]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let notifier = Notifier::new();
        let (log, make) = recorder();

        let a = notifier.subscribe(make("A"));
        notifier.subscribe(make("B"));
        assert!(notifier.unsubscribe(a));
        assert!(!notifier.unsubscribe(a));
        notifier.emit(&[]);

        assert_eq!(*log.lock().unwrap(), vec!["B()"]);
        assert_eq!(notifier.len(), 1);
    }

    #[test]
    fn test_unsubscribe_during_emission_uses_snapshot() {
        let notifier = Arc::new(Notifier::new());
        let (log, make) = recorder();
        let victim: Arc<OnceLock<Connection>> = Arc::new(OnceLock::new());

        let n = Arc::clone(&notifier);
        let v = Arc::clone(&victim);
        notifier.subscribe(Arc::new(move |_| {
            if let Some(c) = v.get() {
                n.unsubscribe(*c);
            }
        }));
        let b = notifier.subscribe(make("B"));
        victim.set(b).unwrap();

        // B was scheduled when the pass began, so it still runs once.
        notifier.emit(&[]);
        assert_eq!(*log.lock().unwrap(), vec!["B()"]);

        notifier.emit(&[]);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_subscribe_during_emission_waits_for_next_pass() {
        let notifier = Arc::new(Notifier::new());
        let (log, make) = recorder();

        let n = Arc::clone(&notifier);
        let late = make("late");
        notifier.subscribe(Arc::new(move |_| {
            if n.len() == 1 {
                n.subscribe(Arc::clone(&late));
            }
        }));

        notifier.emit(&[]);
        assert!(log.lock().unwrap().is_empty());

        notifier.emit(&[]);
        assert_eq!(*log.lock().unwrap(), vec!["late()"]);
    }
}
