//! Persistence of the last connected wallet id.

use std::cell::RefCell;

/// Durable key-value slot holding the last successfully connected wallet id.
pub trait SessionStore {
    fn load(&self) -> Option<String>;

    fn save(&self, wallet_id: &str);

    /// Remove the saved id. A no-op when nothing is saved.
    fn clear(&self);
}

/// In-memory store for headless hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    value: RefCell<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_saved(wallet_id: &str) -> Self {
        Self {
            value: RefCell::new(Some(wallet_id.to_string())),
        }
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Option<String> {
        self.value.borrow().clone()
    }

    fn save(&self, wallet_id: &str) {
        *self.value.borrow_mut() = Some(wallet_id.to_string());
    }

    fn clear(&self) {
        self.value.borrow_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.load(), None);
        store.save("metamask");
        assert_eq!(store.load().as_deref(), Some("metamask"));
        store.clear();
        assert_eq!(store.load(), None);
        store.clear();
        assert_eq!(store.load(), None);
    }
}
