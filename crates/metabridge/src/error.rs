//! Error types for the `metabridge` runtime.
//!
//! Foreign operations report failures through these variants as well, so a
//! [`MetaObject`](crate::runtime::MetaObject) implementation and the engine
//! share one vocabulary. Only [`Error::Conversion`] is ever recovered
//! (at the property read boundary); everything else propagates.

use std::fmt;

/// Errors that can occur while building classes or driving foreign objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A foreign value has no host representation.
    Conversion {
        /// Foreign type name of the offending value.
        type_name: String,
    },

    /// The foreign layer rejected a property write.
    PropertyWrite {
        /// Property being written.
        property: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A forwarded method call failed in the foreign layer.
    Invocation {
        /// Method being invoked.
        method: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The foreign layer refused a signal connection.
    SignalConnect {
        /// Signal being connected.
        signal: String,
        /// Human-readable reason.
        reason: String,
    },

    /// No method with this name is declared in the class chain.
    MethodNotFound {
        /// Requested method name.
        name: String,
    },

    /// A protected method was called from outside its class hierarchy.
    ProtectedMethod {
        /// Requested method name.
        name: String,
    },

    /// No property with this name is declared in the class chain.
    PropertyNotFound {
        /// Requested property name.
        name: String,
    },

    /// No signal with this name is declared in the class chain.
    SignalNotFound {
        /// Requested signal name.
        name: String,
    },

    /// The superclass of a metaobject could not be turned into a class.
    SuperClassUnresolved {
        /// Class whose ancestor failed.
        class: String,
    },

    /// The metaobject superclass chain loops back on itself.
    InheritanceCycle {
        /// Class at which the loop was detected.
        class: String,
    },

    /// A metatype id is not registered.
    UnknownMetaType {
        /// The unknown id.
        id: i32,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Conversion { type_name } => {
                write!(f, "Cannot convert foreign value of type '{type_name}'")
            }
            Error::PropertyWrite { property, reason } => {
                write!(f, "Failed to write property '{property}': {reason}")
            }
            Error::Invocation { method, reason } => {
                write!(f, "Failed to invoke method '{method}': {reason}")
            }
            Error::SignalConnect { signal, reason } => {
                write!(f, "Failed to connect signal '{signal}': {reason}")
            }
            Error::MethodNotFound { name } => {
                write!(f, "Method '{name}' not found in class or inheritance chain")
            }
            Error::ProtectedMethod { name } => {
                write!(f, "Protected method '{name}' called from outside the class hierarchy")
            }
            Error::PropertyNotFound { name } => {
                write!(f, "Property '{name}' not found in class or inheritance chain")
            }
            Error::SignalNotFound { name } => {
                write!(f, "Signal '{name}' not found in class or inheritance chain")
            }
            Error::SuperClassUnresolved { class } => {
                write!(f, "Cannot resolve superclass of '{class}'")
            }
            Error::InheritanceCycle { class } => {
                write!(f, "Inheritance cycle detected at '{class}'")
            }
            Error::UnknownMetaType { id } => write!(f, "Unknown meta type id {id}"),
        }
    }
}

impl std::error::Error for Error {}

/// Result type for `metabridge` operations.
pub type Result<T> = std::result::Result<T, Error>;
