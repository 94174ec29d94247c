//! Unspent proofs

use std::collections::HashSet;

use serde_json::Value;
use tracing::instrument;

use crate::backend::{DynPersistenceBackend, PROOFS_KEY};
use crate::codec;
use crate::types::{Proof, ProofId};
use crate::{Amount, Error};

/// Sum of the proof amounts
///
/// Saturates instead of overflowing, a balance is never an error.
pub fn compute_balance(proofs: &[Proof]) -> Amount {
    Amount::saturating_sum(proofs.iter().map(|proof| proof.amount))
}

/// Persisted set of unspent proofs
#[derive(Debug, Clone)]
pub struct ProofStore {
    backend: DynPersistenceBackend,
}

impl ProofStore {
    /// Create new [`ProofStore`]
    pub fn new(backend: DynPersistenceBackend) -> Self {
        Self { backend }
    }

    /// Well formed proofs currently held
    #[instrument(skip(self))]
    pub fn list(&self) -> Vec<Proof> {
        let raw = codec::read_raw(self.backend.as_ref(), PROOFS_KEY);
        codec::decode_list(PROOFS_KEY, raw.as_deref())
    }

    /// Overwrite the whole collection
    #[instrument(skip_all)]
    pub fn replace(&self, proofs: &[Proof]) -> Result<(), Error> {
        codec::write(self.backend.as_ref(), PROOFS_KEY, proofs)
    }

    /// Add proofs not already held, returns the proofs that were added
    ///
    /// Stored entries are kept as they are, malformed ones included.
    #[instrument(skip_all)]
    pub fn add(&self, proofs: Vec<Proof>) -> Result<Vec<Proof>, Error> {
        codec::update(
            self.backend.as_ref(),
            PROOFS_KEY,
            codec::parse_list,
            |entries| {
                let mut known: HashSet<ProofId> = entries
                    .iter()
                    .filter_map(|entry| codec::decode_entry::<Proof>(entry).ok())
                    .map(|proof| proof.id())
                    .collect();
                let mut added = Vec::new();

                for proof in proofs.iter() {
                    if known.insert(proof.id()) {
                        entries.push(codec::encode_entry(proof)?);
                        added.push(proof.clone());
                    } else {
                        tracing::debug!("Proof {} already held", proof.id());
                    }
                }

                Ok(added)
            },
        )
    }

    /// Remove proofs by identity, returns the proofs that were removed
    ///
    /// Only well formed proofs are matched, every other entry stays in place.
    #[instrument(skip_all)]
    pub fn remove(&self, ids: &[ProofId]) -> Result<Vec<Proof>, Error> {
        let ids: HashSet<&ProofId> = ids.iter().collect();

        codec::update(
            self.backend.as_ref(),
            PROOFS_KEY,
            codec::parse_list,
            |entries| {
                let mut removed = Vec::new();

                entries.retain(|entry| match codec::decode_entry::<Proof>(entry) {
                    Ok(proof) if ids.contains(&proof.id()) => {
                        removed.push(proof);
                        false
                    }
                    _ => true,
                });

                Ok(removed)
            },
        )
    }

    /// Balance of the held proofs
    pub fn balance(&self) -> Amount {
        compute_balance(&self.list())
    }

    /// Balance computed straight from the persisted bytes
    ///
    /// Bypasses any caller side copy of the proofs; the result is always equal
    /// to [`ProofStore::balance`] for the same stored document.
    #[instrument(skip(self))]
    pub fn refresh_balance(&self) -> Amount {
        let raw = match self.backend.read(PROOFS_KEY) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::error!("Could not refresh balance: {}", err);
                return Amount::ZERO;
            }
        };

        let balance = compute_balance(&codec::decode_list(PROOFS_KEY, raw.as_deref()));
        tracing::debug!("Refreshed balance: {}", balance);
        balance
    }

    /// Inspect the stored proofs document
    pub fn report(&self) -> ProofReport {
        let raw = codec::read_raw(self.backend.as_ref(), PROOFS_KEY);
        ProofReport::new(raw)
    }
}

/// Diagnostic view of the stored proofs document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofReport {
    /// Raw stored document
    pub raw: Option<String>,
    /// Whether the document is a JSON array
    pub is_array: bool,
    /// Number of entries in the stored array
    pub entries: usize,
    /// Number of well formed proofs
    pub valid: usize,
    /// Indexes of the entries that are dropped on read
    pub malformed: Vec<usize>,
    /// Balance of the well formed proofs
    pub balance: Amount,
}

impl ProofReport {
    fn new(raw: Option<String>) -> Self {
        let parsed = raw
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok());

        let (is_array, entries, malformed) = match parsed {
            Some(Value::Array(entries)) => {
                let malformed = entries
                    .iter()
                    .enumerate()
                    .filter(|(_, entry)| {
                        serde_json::from_value::<Proof>((*entry).clone()).is_err()
                    })
                    .map(|(index, _)| index)
                    .collect::<Vec<_>>();
                (true, entries.len(), malformed)
            }
            _ => (false, 0, Vec::new()),
        };

        let proofs: Vec<Proof> = codec::decode_list(PROOFS_KEY, raw.as_deref());

        Self {
            is_array,
            entries,
            valid: proofs.len(),
            malformed,
            balance: compute_balance(&proofs),
            raw,
        }
    }
}
