//! Wallet store
//!
//! Bundles the stores of one wallet over a single backend and keeps the
//! unspent and spent proof sets disjoint.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::instrument;

use crate::backend::{DynPersistenceBackend, PersistenceBackend};
use crate::counters::KeysetCounterStore;
use crate::proofs::{compute_balance, ProofStore};
use crate::quotes::QuoteStore;
use crate::seed::SeedProvider;
use crate::spent::SpentProofStore;
use crate::types::{Proof, ProofId, QuoteState, SpentProof};
use crate::{Amount, Error};

/// All persisted collections of one wallet
#[derive(Debug, Clone)]
pub struct WalletStore {
    /// Unspent proofs
    pub proofs: ProofStore,
    /// Spent proofs
    pub spent: SpentProofStore,
    /// Mint quotes
    pub quotes: QuoteStore,
    /// Keyset counters
    pub counters: KeysetCounterStore,
    /// Seed material
    pub seed: SeedProvider,
}

impl WalletStore {
    /// Create new [`WalletStore`] on `backend`
    pub fn new<B>(backend: B) -> Self
    where
        B: PersistenceBackend + 'static,
    {
        Self::from_dyn(Arc::new(backend))
    }

    /// Create new [`WalletStore`] on an already shared backend
    pub fn from_dyn(backend: DynPersistenceBackend) -> Self {
        Self {
            proofs: ProofStore::new(Arc::clone(&backend)),
            spent: SpentProofStore::new(Arc::clone(&backend)),
            quotes: QuoteStore::new(Arc::clone(&backend)),
            counters: KeysetCounterStore::new(Arc::clone(&backend)),
            seed: SeedProvider::new(backend),
        }
    }

    /// Balance of the unspent proofs
    pub fn balance(&self) -> Amount {
        compute_balance(&self.proofs.list())
    }

    /// Balance re-read from the persisted proofs
    pub fn refresh_balance(&self) -> Amount {
        self.proofs.refresh_balance()
    }

    /// Take ownership of new proofs
    ///
    /// Proofs already recorded as spent are refused, proofs already held are
    /// skipped. Returns the proofs actually added.
    #[instrument(skip_all)]
    pub fn receive(&self, proofs: Vec<Proof>) -> Result<Vec<Proof>, Error> {
        let spent: HashSet<ProofId> = self.spent.list().iter().map(SpentProof::id).collect();

        let (refused, fresh): (Vec<Proof>, Vec<Proof>) = proofs
            .into_iter()
            .partition(|proof| spent.contains(&proof.id()));

        for proof in refused.iter() {
            tracing::warn!("Refusing proof {} already recorded as spent", proof.id());
        }

        let added = self.proofs.add(fresh)?;
        tracing::debug!(
            "Received {} proofs worth {}",
            added.len(),
            compute_balance(&added)
        );

        Ok(added)
    }

    /// Move proofs from the unspent set to the spent log
    ///
    /// Proofs leave the unspent set first so that an interruption can lose a
    /// record but never leave a proof in both sets. Identities already in the
    /// spent log are not appended again. Returns the proofs moved.
    #[instrument(skip_all)]
    pub fn spend(&self, ids: &[ProofId]) -> Result<Vec<Proof>, Error> {
        let removed = self.proofs.remove(ids)?;

        let recorded: HashSet<ProofId> = self.spent.list().iter().map(SpentProof::id).collect();
        let records: Vec<SpentProof> = removed
            .iter()
            .filter(|proof| !recorded.contains(&proof.id()))
            .cloned()
            .map(SpentProof::from)
            .collect();

        self.spent.extend(&records)?;
        tracing::debug!(
            "Spent {} proofs worth {}",
            removed.len(),
            compute_balance(&removed)
        );

        Ok(removed)
    }

    /// Store the proofs minted for a paid quote and stop tracking the quote
    ///
    /// Fails with [`Error::UnknownQuote`] or [`Error::QuoteNotPaid`] without
    /// touching any collection.
    #[instrument(skip(self, proofs))]
    pub fn claim_quote(&self, quote_id: &str, proofs: Vec<Proof>) -> Result<Vec<Proof>, Error> {
        let quote = self
            .quotes
            .get(quote_id)
            .ok_or_else(|| Error::UnknownQuote(quote_id.to_owned()))?;

        if quote.state != QuoteState::Paid {
            return Err(Error::QuoteNotPaid(quote_id.to_owned()));
        }

        let added = self.receive(proofs)?;
        self.quotes.remove(quote_id)?;

        tracing::info!("Claimed quote {} for {}", quote_id, quote.amount);

        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, PROOFS_KEY};
    use crate::types::MintQuote;

    fn proof(amount: u64, secret: &str) -> Proof {
        Proof::new(Amount::from(amount), "009a1f293253e41e", secret, "02ab")
    }

    fn quote(id: &str) -> MintQuote {
        MintQuote {
            id: id.to_string(),
            amount: Amount::from(12),
            expiry: Some(1_900_000_000),
            date: "2024-05-01".to_string(),
            mint: "https://mint.example.com".parse().unwrap(),
            invoice: "lnbc120n1pexample".to_string(),
            state: QuoteState::Pending,
        }
    }

    fn assert_disjoint(wallet: &WalletStore) {
        let unspent: HashSet<ProofId> = wallet.proofs.list().iter().map(Proof::id).collect();
        assert!(wallet
            .spent
            .list()
            .iter()
            .all(|spent| !unspent.contains(&spent.id())));
    }

    #[test]
    fn test_receive_refuses_identity_only_records() {
        let wallet = WalletStore::new(MemoryBackend::new());
        wallet.spent.append(proof(4, "a").id().into()).unwrap();

        let added = wallet.receive(vec![proof(4, "a"), proof(1, "b")]).unwrap();
        assert_eq!(added, vec![proof(1, "b")]);
        assert_disjoint(&wallet);
    }

    #[test]
    fn test_receive_and_spend() {
        let wallet = WalletStore::new(MemoryBackend::new());

        wallet
            .receive(vec![proof(1, "a"), proof(2, "b"), proof(8, "c")])
            .unwrap();
        assert_eq!(wallet.balance(), Amount::from(11));

        let spent = wallet.spend(&[proof(2, "b").id()]).unwrap();
        assert_eq!(spent, vec![proof(2, "b")]);
        assert_eq!(wallet.balance(), Amount::from(9));
        assert_eq!(wallet.refresh_balance(), Amount::from(9));
        assert_eq!(wallet.spent.list(), vec![SpentProof::from(proof(2, "b"))]);
        assert_disjoint(&wallet);
    }

    #[test]
    fn test_receive_refuses_spent_proofs() {
        let wallet = WalletStore::new(MemoryBackend::new());
        wallet.receive(vec![proof(4, "a")]).unwrap();
        wallet.spend(&[proof(4, "a").id()]).unwrap();

        let added = wallet.receive(vec![proof(4, "a"), proof(1, "b")]).unwrap();
        assert_eq!(added, vec![proof(1, "b")]);
        assert_disjoint(&wallet);
    }

    #[test]
    fn test_spend_does_not_duplicate_records() {
        let wallet = WalletStore::new(MemoryBackend::new());
        wallet.spent.append(proof(4, "a").into()).unwrap();
        // Proof present in both sets, e.g. written by an older client
        wallet.proofs.replace(&[proof(4, "a")]).unwrap();

        wallet.spend(&[proof(4, "a").id()]).unwrap();

        assert_eq!(wallet.spent.list().len(), 1);
        assert!(wallet.proofs.list().is_empty());
    }

    #[test]
    fn test_spend_unknown_is_noop() {
        let wallet = WalletStore::new(MemoryBackend::new());
        wallet.receive(vec![proof(4, "a")]).unwrap();

        assert!(wallet.spend(&[proof(4, "zzz").id()]).unwrap().is_empty());
        assert!(wallet.spent.list().is_empty());
        assert_eq!(wallet.balance(), Amount::from(4));
    }

    #[test]
    fn test_claim_quote() {
        let wallet = WalletStore::new(MemoryBackend::new());
        wallet.quotes.add(quote("q1")).unwrap();

        assert!(matches!(
            wallet.claim_quote("q1", vec![proof(4, "a"), proof(8, "b")]),
            Err(Error::QuoteNotPaid(_))
        ));
        assert_eq!(wallet.balance(), Amount::ZERO);

        wallet.quotes.set_state("q1", QuoteState::Paid).unwrap();
        let added = wallet
            .claim_quote("q1", vec![proof(4, "a"), proof(8, "b")])
            .unwrap();

        assert_eq!(added.len(), 2);
        assert_eq!(wallet.balance(), Amount::from(12));
        assert!(wallet.quotes.list().is_empty());

        assert!(matches!(
            wallet.claim_quote("q1", vec![]),
            Err(Error::UnknownQuote(_))
        ));
    }

    #[test]
    fn test_stores_share_backend() {
        let backend = MemoryBackend::with_values([(
            PROOFS_KEY,
            r#"[{"amount":4,"id":"k","secret":"a","C":"c"},{"amount":"bad"},{"amount":8,"id":"k","secret":"b","C":"c"}]"#,
        )]);
        let tab_a = WalletStore::new(backend.clone());
        let tab_b = WalletStore::new(backend);

        assert_eq!(tab_a.balance(), Amount::from(12));

        tab_b.spend(&[ProofId {
            keyset_id: "k".to_string(),
            secret: "a".to_string(),
        }])
        .unwrap();

        assert_eq!(tab_a.balance(), Amount::from(8));
    }
}
