//! Per-instance proxies for foreign properties.

use crate::error::{Error, Result};
use crate::runtime::metaobject::{MetaObject, ObjectHandle};
use crate::runtime::name::Name;
use crate::runtime::signal::BoundSignal;
use crate::runtime::value::{UnsupportedType, Value};
use metabridge_log::warn;
use std::fmt;
use std::sync::Arc;

/// Host-side accessor for one property of one foreign object.
///
/// Reads never fail because of an unconvertible value: they yield
/// [`Value::Unsupported`] instead. Writes propagate every failure.
pub struct BoundProperty {
    metaobject: Arc<dyn MetaObject>,
    handle: ObjectHandle,
    name: Name,
    changed: Arc<BoundSignal>,
}

impl BoundProperty {
    /// Creates the accessor together with its (dormant) change stream.
    #[must_use]
    pub fn new(metaobject: Arc<dyn MetaObject>, handle: ObjectHandle, name: Name) -> Self {
        let notify = metaobject.notify_signal(name);
        let changed = BoundSignal::with_source(Arc::clone(&metaobject), handle, notify);
        Self::with_changed(metaobject, handle, name, Arc::new(changed))
    }

    /// Creates the accessor on top of an existing change stream, so the
    /// property and the object's own notify signal share one connection.
    #[must_use]
    pub fn with_changed(
        metaobject: Arc<dyn MetaObject>,
        handle: ObjectHandle,
        name: Name,
        changed: Arc<BoundSignal>,
    ) -> Self {
        Self {
            metaobject,
            handle,
            name,
            changed,
        }
    }

    #[must_use]
    pub fn name(&self) -> Name {
        self.name
    }

    /// Reads the current value.
    ///
    /// # Errors
    ///
    /// Foreign failures other than [`Error::Conversion`] propagate; a
    /// conversion failure becomes `Ok(Value::Unsupported(_))`.
    pub fn get(&self) -> Result<Value> {
        match self.metaobject.get_property(self.handle, self.name) {
            Err(Error::Conversion { type_name }) => {
                warn!(
                    "property {}::{} holds unsupported type {}",
                    self.metaobject.class_name(),
                    self.name,
                    type_name
                );
                Ok(Value::Unsupported(UnsupportedType))
            }
            other => other,
        }
    }

    /// Writes a new value.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::PropertyWrite`] and any other foreign failure.
    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        self.metaobject.set_property(self.handle, self.name, value.into())
    }

    /// Change notifications for this property.
    ///
    /// The foreign notify signal is connected on the first subscription.
    #[must_use]
    pub fn changed(&self) -> &BoundSignal {
        &self.changed
    }
}

impl fmt::Debug for BoundProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundProperty")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .field("notify", &self.changed.name())
            .finish()
    }
}
