//! Interned member names.
//!
//! Every method, property, signal and enumerator name that passes through
//! the engine is interned once into a process-global table. A [`Name`] is a
//! 4-byte id: equality is an integer compare and member tables key on it
//! directly.
//!
//! # Architecture
//!
//! - Strings are leaked into `&'static str` on first intern and live for the
//!   program duration, like the classes that refer to them.
//! - The table is a `hashbrown` map with `FxHash` (names are short ASCII
//!   identifiers) behind a `RwLock`; lookups of existing names take the read
//!   lock only.

use fxhash::FxBuildHasher;
use hashbrown::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{OnceLock, PoisonError, RwLock};

/// An interned member name.
///
/// # Example
///
/// ```rust
/// use metabridge::Name;
///
/// let a = Name::new("visibleChanged");
/// let b: Name = "visibleChanged".parse().unwrap();
///
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "visibleChanged");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(u32);

struct NameTable {
    strings: Vec<&'static str>,
    ids: HashMap<&'static str, Name, FxBuildHasher>,
}

static TABLE: OnceLock<RwLock<NameTable>> = OnceLock::new();

fn table() -> &'static RwLock<NameTable> {
    TABLE.get_or_init(|| {
        RwLock::new(NameTable {
            strings: Vec::with_capacity(256),
            ids: HashMap::with_capacity_and_hasher(256, FxBuildHasher::default()),
        })
    })
}

impl Name {
    /// Interns `name`, returning the same `Name` for equal strings.
    #[must_use]
    pub fn new(name: &str) -> Self {
        if let Some(id) = Self::lookup(name) {
            return id;
        }

        let mut table = table().write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have interned it while we waited.
        if let Some(&id) = table.ids.get(name) {
            return id;
        }
        let leaked: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let id = Name(u32::try_from(table.strings.len()).unwrap_or(u32::MAX));
        table.strings.push(leaked);
        table.ids.insert(leaked, id);
        id
    }

    /// Returns the `Name` for `name` if it was interned before.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        table()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ids
            .get(name)
            .copied()
    }

    /// Returns the interned string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        table()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .strings
            .get(self.0 as usize)
            .copied()
            .unwrap_or("")
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl FromStr for Name {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Name::new(s))
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::new(s)
    }
}

impl From<&String> for Name {
    fn from(s: &String) -> Self {
        Name::new(s)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.as_str())
    }
}
