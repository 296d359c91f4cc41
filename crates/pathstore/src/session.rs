//! Key/value side-store for snapshot persistence.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Side-store mapping store names to persisted snapshots.
///
/// Stores write their snapshot here on every update when session
/// persistence is enabled, and load from here at registration.
pub trait SessionStore: Send + Sync {
    fn get_item(&self, key: &str) -> Option<Value>;
    fn set_item(&self, key: &str, value: Value);
    fn remove_item(&self, key: &str);
}

/// In-memory [`SessionStore`].
#[derive(Default)]
pub struct MemorySession {
    items: Mutex<BTreeMap<String, Value>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySession {
    fn get_item(&self, key: &str) -> Option<Value> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: Value) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.insert(key.to_owned(), value);
    }

    fn remove_item(&self, key: &str) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_get_remove_roundtrip() {
        let session = MemorySession::new();
        assert_eq!(session.get_item("App"), None);
        session.set_item("App", json!({"a": 1}));
        assert_eq!(session.get_item("App"), Some(json!({"a": 1})));
        session.remove_item("App");
        assert_eq!(session.get_item("App"), None);
    }
}
