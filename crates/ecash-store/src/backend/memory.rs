use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{PersistenceBackend, UpdateFn};
use crate::Error;

/// In memory persistence backend.
///
/// Clones share the same underlying map, so several stores (or several
/// simulated execution contexts) can be pointed at one wallet state. Nothing
/// is persisted past the life of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackend {
    /// Create new empty [`MemoryBackend`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new [`MemoryBackend`] seeded with raw values
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        Self {
            inner: Arc::new(Mutex::new(map)),
        }
    }
}

impl PersistenceBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.inner.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), Error> {
        self.inner.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.inner.lock().remove(key);
        Ok(())
    }

    /// Runs the whole cycle under the map lock. `update` must not call back
    /// into this backend.
    fn read_modify_write(&self, key: &str, update: &mut UpdateFn<'_>) -> Result<(), Error> {
        let mut map = self.inner.lock();
        let current = map.get(key).cloned();
        if let Some(new_value) = update(current)? {
            map.insert(key.to_owned(), new_value);
        }
        Ok(())
    }
}
