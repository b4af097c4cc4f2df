use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Key of the first-visit flag.
pub const HAS_VISITED: &str = "hasVisited";

/// Small string key-value capability standing in for browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(key.to_string(), value.to_string());
    }
}

/// View of a shared store with every key prefixed, e.g. per visitor.
pub struct Namespaced<'a> {
    store: &'a dyn KeyValueStore,
    prefix: String,
}

impl<'a> Namespaced<'a> {
    pub fn new(store: &'a dyn KeyValueStore, namespace: &str) -> Self {
        Self {
            store,
            prefix: format!("{namespace}:"),
        }
    }
}

impl KeyValueStore for Namespaced<'_> {
    fn get(&self, key: &str) -> Option<String> {
        self.store.get(&format!("{}{key}", self.prefix))
    }

    fn set(&self, key: &str, value: &str) {
        self.store.set(&format!("{}{key}", self.prefix), value);
    }
}
