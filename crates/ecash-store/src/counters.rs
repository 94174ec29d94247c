//! Keyset derivation counters
//!
//! A counter value handed out for a keyset must never be handed out again,
//! otherwise two proofs derive from the same secret. Allocation therefore
//! persists the bumped counter before the reserved values are returned.

use std::ops::Range;

use tracing::instrument;

use crate::backend::{DynPersistenceBackend, KEYSET_COUNTS_KEY};
use crate::codec::{self, RawCounts};
use crate::types::KeysetCounts;
use crate::Error;

/// Persisted keyset id to counter mapping
#[derive(Debug, Clone)]
pub struct KeysetCounterStore {
    backend: DynPersistenceBackend,
}

impl KeysetCounterStore {
    /// Create new [`KeysetCounterStore`]
    pub fn new(backend: DynPersistenceBackend) -> Self {
        Self { backend }
    }

    /// All counters
    #[instrument(skip(self))]
    pub fn get_all(&self) -> KeysetCounts {
        let raw = codec::read_raw(self.backend.as_ref(), KEYSET_COUNTS_KEY);
        codec::decode_counts(KEYSET_COUNTS_KEY, raw.as_deref())
    }

    /// Next unused counter value of a keyset
    pub fn get(&self, keyset_id: &str) -> u32 {
        self.get_all().get(keyset_id).copied().unwrap_or_default()
    }

    /// Overwrite all counters
    ///
    /// Fails with [`Error::CounterRegression`] if any stored counter would be
    /// lowered or dropped, nothing is written in that case. Stored entries
    /// that are not valid counters are kept unless `counts` names their
    /// keyset.
    #[instrument(skip(self))]
    pub fn set_all(&self, counts: &KeysetCounts) -> Result<(), Error> {
        codec::update(
            self.backend.as_ref(),
            KEYSET_COUNTS_KEY,
            codec::parse_counts,
            |stored| {
                let stored = stored
                    .as_mut()
                    .ok_or_else(|| Error::CorruptDocument(KEYSET_COUNTS_KEY.to_owned()))?;

                let mut next = RawCounts::new();

                for (keyset_id, entry) in stored.iter() {
                    let requested = counts.get(keyset_id).copied();

                    match (codec::counter_value(entry), requested) {
                        (Some(current), requested) => {
                            if requested.is_none_or(|requested| requested < current) {
                                return Err(Error::CounterRegression {
                                    keyset_id: keyset_id.clone(),
                                    current,
                                    requested,
                                });
                            }
                        }
                        (None, None) => {
                            next.insert(keyset_id.clone(), entry.clone());
                        }
                        (None, Some(requested)) => {
                            tracing::warn!(
                                "Replacing invalid counter of keyset {} with {}",
                                keyset_id,
                                requested
                            );
                        }
                    }
                }

                for (keyset_id, count) in counts {
                    next.insert(keyset_id.clone(), codec::encode_entry(count)?);
                }

                *stored = next;
                Ok(())
            },
        )
    }

    /// Reserve `count` counter values for `keyset_id`
    ///
    /// The counter is advanced by `count` and committed to the backend before
    /// the reserved range is returned. An error means nothing was reserved.
    /// A stored counter that cannot be read is never treated as zero: the
    /// allocation fails with [`Error::InvalidCounter`], or with
    /// [`Error::CorruptDocument`] when the whole document is unreadable.
    #[instrument(skip(self))]
    pub fn allocate(&self, keyset_id: &str, count: u32) -> Result<Range<u32>, Error> {
        let reserved = codec::update(
            self.backend.as_ref(),
            KEYSET_COUNTS_KEY,
            codec::parse_counts,
            |stored| {
                let stored = stored
                    .as_mut()
                    .ok_or_else(|| Error::CorruptDocument(KEYSET_COUNTS_KEY.to_owned()))?;

                let current = match stored.get(keyset_id) {
                    Some(entry) => codec::counter_value(entry)
                        .ok_or_else(|| Error::InvalidCounter(keyset_id.to_owned()))?,
                    None => 0,
                };

                if count == 0 {
                    return Ok(current..current);
                }

                let next = current
                    .checked_add(count)
                    .ok_or_else(|| Error::CounterOverflow {
                        keyset_id: keyset_id.to_owned(),
                        current,
                        count,
                    })?;

                stored.insert(keyset_id.to_owned(), codec::encode_entry(&next)?);
                Ok(current..next)
            },
        )?;

        tracing::debug!(
            "Reserved counters {}..{} for keyset {}",
            reserved.start,
            reserved.end,
            keyset_id
        );

        Ok(reserved)
    }
}
