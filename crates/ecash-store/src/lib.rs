//! Ecash wallet local store
//!
//! Persistence and bookkeeping for an ecash wallet: the unspent proofs, the log
//! of spent proofs, mint quotes, keyset derivation counters and the wallet
//! seed. Every collection is a JSON document stored under its own key of a
//! [`PersistenceBackend`].
//!
//! Reading never fails. Missing or corrupt documents read as empty and
//! malformed entries are dropped, so a damaged local state degrades to fewer
//! proofs instead of an unusable wallet.
//!
//! ```
//! use ecash_store::backend::MemoryBackend;
//! use ecash_store::{Amount, Proof, WalletStore};
//!
//! let wallet = WalletStore::new(MemoryBackend::new());
//! wallet
//!     .receive(vec![Proof::new(Amount::from(8), "009a1f293253e41e", "secret", "02ab")])
//!     .expect("stored");
//!
//! assert_eq!(wallet.balance(), Amount::from(8));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod amount;
pub mod backend;
mod codec;
pub mod counters;
pub mod error;
pub mod proofs;
pub mod quotes;
pub mod seed;
pub mod spent;
pub mod types;
pub mod wallet;

pub use amount::Amount;
pub use backend::{DynPersistenceBackend, MemoryBackend, PersistenceBackend};
pub use counters::KeysetCounterStore;
pub use error::Error;
pub use proofs::{compute_balance, ProofReport, ProofStore};
pub use quotes::QuoteStore;
pub use seed::SeedProvider;
pub use spent::SpentProofStore;
pub use types::{KeysetCounts, MintQuote, Proof, ProofId, QuoteState, SpentProof};
pub use wallet::WalletStore;
