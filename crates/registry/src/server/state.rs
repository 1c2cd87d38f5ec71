//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::crypto::{Cipher, KeySource};
use crate::registration::Registrar;
use crate::store::StudentStore;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-wrapped or already `Arc`-backed) so
/// that Axum can clone the state for each request without copying expensive data.
#[derive(Clone)]
pub struct AppState {
    /// Registration flow; run on the blocking pool.
    pub registrar: Arc<Registrar>,
    /// Field cipher used to decrypt records for display.
    pub cipher: Arc<Cipher>,
    /// Student record store.
    pub store: StudentStore,
    /// Whether the encryption key will survive a restart.
    pub key_source: KeySource,
}

impl AppState {
    pub fn new(
        registrar: Arc<Registrar>,
        cipher: Arc<Cipher>,
        store: StudentStore,
        key_source: KeySource,
    ) -> Self {
        Self {
            registrar,
            cipher,
            store,
            key_source,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// An in-memory state with a fixed key and a logging notifier.
    pub fn for_tests() -> Self {
        use crate::crypto::{key::KEY_LEN, KeyMaterial};
        use crate::registration::LogNotifier;

        let cipher = Arc::new(Cipher::new(&KeyMaterial::from_bytes([0x42; KEY_LEN])));
        let store = StudentStore::open_in_memory().expect("in-memory store");
        let registrar = Arc::new(Registrar::new(
            cipher.clone(),
            store.clone(),
            Arc::new(LogNotifier),
            "noreply@edtech.com".into(),
        ));
        Self::new(registrar, cipher, store, KeySource::Configured)
    }
}
