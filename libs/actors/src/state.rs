//! Per-actor key-value state
//!
//! [`ActorState`] is private to one actor but shared between its handlers and
//! interval tasks, so every operation takes the internal lock for the
//! shortest possible span. Writes go through to a [`StateStore`]; reads are
//! served from memory and fall back to the store on a miss.

use crate::{ActorError, Result};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Persistence seam behind [`ActorState`]
pub trait StateStore: Send + Sync {
    fn persist(&self, key: &str, value: &Value) -> Result<()>;

    fn retrieve(&self, key: &str) -> Result<Option<Value>>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-memory store, the default
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn persist(&self, key: &str, value: &Value) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.clone());
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// Key-value state owned by one actor
#[derive(Clone)]
pub struct ActorState {
    entries: Arc<Mutex<HashMap<String, Value>>>,
    store: Arc<dyn StateStore>,
}

impl Default for ActorState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorState")
            .field("keys", &self.keys())
            .finish()
    }
}

impl ActorState {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn StateStore>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            store,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<()> {
        let key = key.into();
        self.store.persist(&key, &value)?;
        self.entries.lock().insert(key, value);
        Ok(())
    }

    /// Serialize `value` and store it under `key`
    pub fn put<T: Serialize>(&self, key: impl Into<String>, value: &T) -> Result<()> {
        let key = key.into();
        let value =
            serde_json::to_value(value).map_err(|e| ActorError::state(&key, e.to_string()))?;
        self.set(key, value)
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        if let Some(value) = self.entries.lock().get(key).cloned() {
            return Ok(Some(value));
        }

        let Some(value) = self.store.retrieve(key)? else {
            return Ok(None);
        };
        self.entries.lock().insert(key.to_string(), value.clone());
        Ok(Some(value))
    }

    /// Typed read; a value of the wrong shape is an error, not `None`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ActorError::state(key, e.to_string())),
            None => Ok(None),
        }
    }

    pub fn remove(&self, key: &str) -> Result<Option<Value>> {
        self.store.remove(key)?;
        Ok(self.entries.lock().remove(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Atomically set the boolean flag `key`, unless it is already set.
    ///
    /// The flag is cleared when the returned guard drops, including on error
    /// paths and panic unwinding.
    pub fn claim(&self, key: &str) -> Option<StateFlag> {
        {
            let mut entries = self.entries.lock();
            if entries.get(key).and_then(Value::as_bool) == Some(true) {
                return None;
            }
            entries.insert(key.to_string(), Value::Bool(true));
        }

        if let Err(e) = self.store.persist(key, &Value::Bool(true)) {
            tracing::warn!(key, error = %e, "Failed to persist state flag");
        }

        Some(StateFlag {
            state: self.clone(),
            key: key.to_string(),
        })
    }

    /// Whether the boolean flag `key` is currently set
    pub fn is_flagged(&self, key: &str) -> bool {
        self.entries.lock().get(key).and_then(Value::as_bool) == Some(true)
    }
}

/// Guard returned by [`ActorState::claim`]
#[derive(Debug)]
pub struct StateFlag {
    state: ActorState,
    key: String,
}

impl StateFlag {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for StateFlag {
    fn drop(&mut self) {
        self.state
            .entries
            .lock()
            .insert(self.key.clone(), Value::Bool(false));
        if let Err(e) = self.state.store.persist(&self.key, &Value::Bool(false)) {
            tracing::warn!(key = %self.key, error = %e, "Failed to persist cleared state flag");
        }
    }
}
