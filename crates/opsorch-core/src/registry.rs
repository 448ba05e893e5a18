use crate::{CoreError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Name-keyed store of provider constructors for one capability.
///
/// Names are trimmed and case-folded on both registration and lookup, so
/// `"Mock"` and `"mock"` address the same entry. Registration never replaces
/// an existing entry.
pub struct Registry<C> {
    entries: RwLock<HashMap<String, C>>,
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<C: Clone> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl<C: Clone> Registry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `name`.
    pub fn register(&self, name: &str, constructor: C) -> Result<()> {
        let key = normalize(name);
        if key.is_empty() {
            return Err(CoreError::InvalidName(
                "provider name must not be empty".to_string(),
            ));
        }

        let mut entries = self
            .entries
            .write()
            .map_err(|_| CoreError::Internal("registry lock poisoned".to_string()))?;
        if entries.contains_key(&key) {
            return Err(CoreError::DuplicateProvider(key));
        }
        debug!(provider = %key, "Registered provider constructor");
        entries.insert(key, constructor);
        Ok(())
    }

    /// Case-insensitive lookup; an unknown name is `None`, never an error.
    pub fn lookup(&self, name: &str) -> Option<C> {
        // Entries are inserted whole, so a poisoned map is still consistent.
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&normalize(name)).cloned()
    }

    /// Registered names, case-folded and sorted.
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
