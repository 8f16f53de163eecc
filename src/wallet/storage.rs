//! `localStorage` persistence of the last connected wallet.

use walletkit_core::SessionStore;

use crate::config::{EVENT_NAMESPACE, SESSION_STORAGE_KEY};
use crate::utils::dom;

/// [`SessionStore`] on `window.localStorage`.
///
/// Storage can be unavailable (private mode, sandboxed iframes); reads then
/// see nothing and writes are logged and dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalSessionStore;

impl SessionStore for LocalSessionStore {
    fn load(&self) -> Option<String> {
        dom::local_storage().and_then(|s| s.get_item(SESSION_STORAGE_KEY).ok().flatten())
    }

    fn save(&self, wallet_id: &str) {
        let saved = dom::local_storage().is_some_and(|s| s.set_item(SESSION_STORAGE_KEY, wallet_id).is_ok());
        if !saved {
            log::warn!(target: EVENT_NAMESPACE, "could not persist wallet id {wallet_id}");
        }
    }

    fn clear(&self) {
        if let Some(storage) = dom::local_storage() {
            let _ = storage.remove_item(SESSION_STORAGE_KEY);
        }
    }
}
