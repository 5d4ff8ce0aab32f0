use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::listing::{ListingKey, ListingPage};

/// String key/value storage that lives as long as the browsing session.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: String);
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.read().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: String) {
        self.items.write().insert(key.to_string(), value);
    }
}

/// Last good listing per key. Read only when a fetch fails; written after
/// every successful fetch.
#[derive(Clone)]
pub struct ListingCache {
    storage: Arc<dyn SessionStorage>,
}

impl ListingCache {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Entries that no longer decode are treated as missing.
    pub fn get(&self, key: &ListingKey) -> Option<ListingPage> {
        let raw = self.storage.get_item(&key.storage_key())?;
        serde_json::from_str(&raw).ok()
    }

    pub fn put(&self, key: &ListingKey, page: &ListingPage) {
        match serde_json::to_string(page) {
            Ok(json) => self.storage.set_item(&key.storage_key(), json),
            Err(err) => tracing::warn!(key = %key, "cache: encode listing: {err}"),
        }
    }
}

impl std::fmt::Debug for ListingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingCache").finish_non_exhaustive()
    }
}
