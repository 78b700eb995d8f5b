/// Settings persistence for chrome.storage.local, with an in-memory fallback

use std::cell::RefCell;
use std::rc::Rc;

use crate::chrome;
use crate::error::StorageError;
use crate::settings::{SETTINGS_KEYS, TimerSettings};

/// Key-value store for [`TimerSettings`]
///
/// `get` on an empty store yields the default settings.
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    async fn get(&self) -> Result<TimerSettings, StorageError>;
    async fn set(&self, settings: &TimerSettings) -> Result<(), StorageError>;
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Settings kept in `chrome.storage.local` under the four settings keys
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeSettingsStore;

impl SettingsStore for ChromeSettingsStore {
    async fn get(&self) -> Result<TimerSettings, StorageError> {
        let keys = serde_wasm_bindgen::to_value(&SETTINGS_KEYS)
            .map_err(|e| StorageError::Malformed(format!("{:?}", e)))?;

        let items = chrome::storage_local_get(keys)
            .await
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))?;

        if items.is_null() || items.is_undefined() {
            return Ok(TimerSettings::default());
        }

        serde_wasm_bindgen::from_value(items).map_err(|e| StorageError::Malformed(format!("{:?}", e)))
    }

    async fn set(&self, settings: &TimerSettings) -> Result<(), StorageError> {
        let items = serde_wasm_bindgen::to_value(settings)
            .map_err(|e| StorageError::Malformed(format!("{:?}", e)))?;

        chrome::storage_local_set(items)
            .await
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        chrome::storage_local_clear()
            .await
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))?;

        Ok(())
    }
}

/// Process-local settings; clones share the same slot
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    slot: Rc<RefCell<Option<TimerSettings>>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    async fn get(&self) -> Result<TimerSettings, StorageError> {
        Ok(self.slot.borrow().clone().unwrap_or_default())
    }

    async fn set(&self, settings: &TimerSettings) -> Result<(), StorageError> {
        *self.slot.borrow_mut() = Some(settings.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.slot.borrow_mut().take();
        Ok(())
    }
}

/// The store chosen for this page, fixed at construction
#[derive(Debug, Clone)]
pub enum SettingsBackend {
    Chrome(ChromeSettingsStore),
    Memory(MemorySettingsStore),
}

impl SettingsBackend {
    /// Use chrome.storage.local when the extension API is present, else memory
    pub fn detect() -> Self {
        if chrome::has_storage_api() {
            SettingsBackend::Chrome(ChromeSettingsStore)
        } else {
            log::warn!("chrome.storage.local unavailable, settings will not persist");
            SettingsBackend::Memory(MemorySettingsStore::new())
        }
    }
}

impl SettingsStore for SettingsBackend {
    async fn get(&self) -> Result<TimerSettings, StorageError> {
        match self {
            SettingsBackend::Chrome(store) => store.get().await,
            SettingsBackend::Memory(store) => store.get().await,
        }
    }

    async fn set(&self, settings: &TimerSettings) -> Result<(), StorageError> {
        match self {
            SettingsBackend::Chrome(store) => store.set(settings).await,
            SettingsBackend::Memory(store) => store.set(settings).await,
        }
    }

    async fn clear(&self) -> Result<(), StorageError> {
        match self {
            SettingsBackend::Chrome(store) => store.clear().await,
            SettingsBackend::Memory(store) => store.clear().await,
        }
    }
}

/// Read settings, falling back to defaults when the store fails
pub async fn load_or_default<S: SettingsStore>(store: &S) -> TimerSettings {
    match store.get().await {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("{}; using default settings", e);
            TimerSettings::default()
        }
    }
}
