//! Spent proofs log

use tracing::instrument;

use crate::backend::{DynPersistenceBackend, SPENT_PROOFS_KEY};
use crate::codec;
use crate::types::{ProofId, SpentProof};
use crate::Error;

/// Persisted append log of redeemed proofs
///
/// Appending never rewrites existing records, including the ones that fail
/// to decode. The log never deduplicates; reconciling against the unspent set
/// is up to the caller (see [`crate::WalletStore::spend`]).
#[derive(Debug, Clone)]
pub struct SpentProofStore {
    backend: DynPersistenceBackend,
}

impl SpentProofStore {
    /// Create new [`SpentProofStore`]
    pub fn new(backend: DynPersistenceBackend) -> Self {
        Self { backend }
    }

    /// Spent proofs recorded so far
    #[instrument(skip(self))]
    pub fn list(&self) -> Vec<SpentProof> {
        let raw = codec::read_raw(self.backend.as_ref(), SPENT_PROOFS_KEY);
        codec::decode_list(SPENT_PROOFS_KEY, raw.as_deref())
    }

    /// Overwrite the whole log
    #[instrument(skip_all)]
    pub fn replace(&self, records: &[SpentProof]) -> Result<(), Error> {
        codec::write(self.backend.as_ref(), SPENT_PROOFS_KEY, records)
    }

    /// Append one record
    #[instrument(skip_all)]
    pub fn append(&self, record: SpentProof) -> Result<(), Error> {
        self.extend(std::slice::from_ref(&record))
    }

    /// Append several records in one write
    #[instrument(skip_all)]
    pub fn extend(&self, records: &[SpentProof]) -> Result<(), Error> {
        if records.is_empty() {
            return Ok(());
        }

        codec::update(
            self.backend.as_ref(),
            SPENT_PROOFS_KEY,
            codec::parse_list,
            |entries| {
                for record in records {
                    entries.push(codec::encode_entry(record)?);
                }
                Ok(())
            },
        )
    }

    /// Whether a proof with this identity was recorded as spent
    pub fn contains(&self, id: &ProofId) -> bool {
        self.list().iter().any(|record| &record.id() == id)
    }
}
