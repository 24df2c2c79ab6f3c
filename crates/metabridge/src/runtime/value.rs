//! Host-side values exchanged with foreign objects.

use crate::error::{Error, Result};
use crate::runtime::metaobject::ObjectHandle;
use crate::runtime::metatype::HostType;
use std::fmt;

/// Placeholder returned by a property read whose foreign value has no host
/// representation.
///
/// Carries no payload; renders as `<unsupported type>`.
///
/// ```rust
/// use metabridge::UnsupportedType;
///
/// assert_eq!(UnsupportedType.to_string(), "<unsupported type>");
/// assert_eq!(format!("{:?}", UnsupportedType), "<unsupported type>");
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UnsupportedType;

impl UnsupportedType {
    /// The diagnostic text every sentinel renders as.
    pub const TEXT: &'static str = "<unsupported type>";
}

impl fmt::Display for UnsupportedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::TEXT)
    }
}

impl fmt::Debug for UnsupportedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::TEXT)
    }
}

/// A value in the host type system.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value (`void`, null).
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    /// String-keyed map, insertion ordered.
    Map(Vec<(String, Value)>),
    /// Reference to another live foreign object.
    Object(ObjectHandle),
    /// See [`UnsupportedType`].
    Unsupported(UnsupportedType),
}

impl Value {
    /// The host type this value belongs to. `Unsupported` has none.
    #[must_use]
    pub fn host_type(&self) -> Option<HostType> {
        Some(match self {
            Value::Nil => HostType::Nil,
            Value::Bool(_) => HostType::Bool,
            Value::Int(_) => HostType::Int,
            Value::Float(_) => HostType::Float,
            Value::String(_) => HostType::String,
            Value::List(_) => HostType::List,
            Value::Map(_) => HostType::Map,
            Value::Object(_) => HostType::Object,
            Value::Unsupported(_) => return None,
        })
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Value::Unsupported(_))
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short type label used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Unsupported(_) => "unsupported",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                f.write_str("}")
            }
            Value::Object(handle) => write!(f, "{handle}"),
            Value::Unsupported(u) => write!(f, "{u}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ObjectHandle> for Value {
    fn from(handle: ObjectHandle) -> Self {
        Value::Object(handle)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<UnsupportedType> for Value {
    fn from(u: UnsupportedType) -> Self {
        Value::Unsupported(u)
    }
}

fn mismatch(expected: &str, got: &Value) -> Error {
    Error::Conversion {
        type_name: format!("{} (expected {expected})", got.type_name()),
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(mismatch("int", &other)),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Float(x) => Ok(x),
            #[allow(clippy::cast_precision_loss)]
            Value::Int(i) => Ok(i as f64),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_rendering() {
        let v = Value::Unsupported(UnsupportedType);
        assert_eq!(v.to_string(), "<unsupported type>");
        assert!(v.is_unsupported());
        assert_eq!(v.host_type(), None);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(3), Value::Int(3));
        assert_eq!(Value::from("x"), Value::String("x".into()));
        assert_eq!(Value::from(vec![1, 2]), Value::List(vec![Value::Int(1), Value::Int(2)]));

        assert_eq!(i64::try_from(Value::Int(7)), Ok(7));
        assert_eq!(f64::try_from(Value::Int(2)), Ok(2.0));
        assert!(bool::try_from(Value::Nil).is_err());
        assert_eq!(String::try_from(Value::from("s")).as_deref(), Ok("s"));
    }

    #[test]
    fn test_display() {
        let v = Value::Map(vec![
            ("a".into(), Value::List(vec![Value::Int(1), Value::Nil])),
            ("b".into(), Value::Bool(true)),
        ]);
        assert_eq!(v.to_string(), "{\"a\": [1, nil], \"b\": true}");
    }
}
