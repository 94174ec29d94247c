//! Persistence backends
//!
//! Every wallet collection lives under a single key holding a UTF-8 JSON
//! document. Backends only move strings around; decoding and the recovery
//! rules for corrupt documents live in the stores.

use std::fmt::Debug;
use std::sync::Arc;

use crate::Error;

mod memory;

pub use self::memory::MemoryBackend;

/// Unspent proofs
pub const PROOFS_KEY: &str = "proofs";
/// Spent proofs
pub const SPENT_PROOFS_KEY: &str = "spent_proofs";
/// Mint quotes
pub const PENDING_QUOTES_KEY: &str = "pendingQuotes";
/// Keyset counters
pub const KEYSET_COUNTS_KEY: &str = "keysetCounts";
/// Seed material
pub const SEED_KEY: &str = "seed";

/// Shared dynamic backend handle
pub type DynPersistenceBackend = Arc<dyn PersistenceBackend>;

/// Update closure handed to [`PersistenceBackend::read_modify_write`]
///
/// Receives the current value of the key and returns the value to store, or
/// `None` to leave the key untouched. Returning an error aborts the update.
pub type UpdateFn<'a> = dyn FnMut(Option<String>) -> Result<Option<String>, Error> + 'a;

/// Key-value persistence shared by every store of a wallet
pub trait PersistenceBackend: Debug + Send + Sync {
    /// Read value of `key`
    fn read(&self, key: &str) -> Result<Option<String>, Error>;

    /// Overwrite value of `key`
    fn write(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Remove `key`
    fn remove(&self, key: &str) -> Result<(), Error>;

    /// Read `key`, compute the new value and write it back
    ///
    /// Implementations that can exclude concurrent writers must run the whole
    /// cycle under that exclusion. The provided implementation is a plain
    /// read followed by a write and offers no such guarantee.
    fn read_modify_write(&self, key: &str, update: &mut UpdateFn<'_>) -> Result<(), Error> {
        let current = self.read(key)?;
        if let Some(new_value) = update(current)? {
            self.write(key, &new_value)?;
        }
        Ok(())
    }
}
