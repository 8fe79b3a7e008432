//! Immutable context map attached to a subscription.
//!
//! A [`ContextMap`] travels with a subscriber from the assertion engine down to
//! every stage, and is handed to the scheduler together with each unit of work
//! so that scheduling hooks can read it. Updates are copy-on-write: `put`
//! returns a new map and leaves the receiver untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Immutable key/value mapping visible to every stage of a subscription.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ContextMap {
    entries: Arc<BTreeMap<String, String>>,
}

impl ContextMap {
    /// Returns the empty context.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a context holding a single entry.
    #[must_use]
    pub fn of(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::empty().put(key, value)
    }

    /// Returns a new context with `key` bound to `value`.
    #[must_use]
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut entries = (*self.entries).clone();
        entries.insert(key.into(), value.into());
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Merges `other` on top of this context; `other` wins on conflicts.
    #[must_use]
    pub fn put_all(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        let mut entries = (*self.entries).clone();
        for (key, value) in other.entries.iter() {
            entries.insert(key.clone(), value.clone());
        }
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Looks up `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Looks up `key`, falling back to `default` when absent.
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Returns true if `key` is bound.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no entry is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ContextMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}
