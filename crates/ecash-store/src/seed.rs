//! Wallet seed
//!
//! The stored material is BIP39 entropy, hex encoded. A full mnemonic phrase is
//! accepted as well. Either way the 64 byte wallet seed is the BIP39 seed of
//! that mnemonic with an empty passphrase.

use bip39::Mnemonic;
use tracing::instrument;

use crate::backend::{DynPersistenceBackend, SEED_KEY};
use crate::Error;

/// Entropy generated for a fresh seed, a 12 word mnemonic
const SEED_ENTROPY_LEN: usize = 16;

/// Supplies and persists the wallet seed material
#[derive(Debug, Clone)]
pub struct SeedProvider {
    backend: DynPersistenceBackend,
}

impl SeedProvider {
    /// Create new [`SeedProvider`]
    pub fn new(backend: DynPersistenceBackend) -> Self {
        Self { backend }
    }

    /// Current seed material, generated and persisted on first access
    #[instrument(skip(self))]
    pub fn get(&self) -> Result<String, Error> {
        let mut seed = None;

        self.backend.read_modify_write(SEED_KEY, &mut |current| match current {
            Some(current) => {
                seed = Some(current);
                Ok(None)
            }
            None => {
                tracing::info!("No wallet seed stored, generating a new one");
                let fresh = generate_seed();
                seed = Some(fresh.clone());
                Ok(Some(fresh))
            }
        })?;

        seed.ok_or_else(|| Error::Internal("Seed was not loaded".to_owned()))
    }

    /// Persist new seed material
    ///
    /// The material must be hex encoded BIP39 entropy or a mnemonic phrase.
    /// Surrounding whitespace is not stored.
    #[instrument(skip_all)]
    pub fn set(&self, value: &str) -> Result<(), Error> {
        let value = value.trim();
        parse_mnemonic(value)?;
        self.backend.write(SEED_KEY, value)
    }

    /// Replace the seed with freshly generated material
    ///
    /// Proofs derived from the previous seed can no longer be restored once it
    /// is gone.
    #[instrument(skip(self))]
    pub fn rotate(&self) -> Result<String, Error> {
        let fresh = generate_seed();
        self.backend.write(SEED_KEY, &fresh)?;
        tracing::info!("Wallet seed rotated");
        Ok(fresh)
    }

    /// Mnemonic of the current seed
    pub fn mnemonic(&self) -> Result<Mnemonic, Error> {
        parse_mnemonic(&self.get()?)
    }

    /// 64 byte seed used for deterministic secret derivation
    pub fn seed_bytes(&self) -> Result<[u8; 64], Error> {
        Ok(self.mnemonic()?.to_seed_normalized(""))
    }
}

fn generate_seed() -> String {
    let entropy: [u8; SEED_ENTROPY_LEN] = rand::random();
    hex::encode(entropy)
}

fn parse_mnemonic(material: &str) -> Result<Mnemonic, Error> {
    let material = material.trim();

    if material.is_empty() {
        return Err(Error::InvalidSeed);
    }

    if material.contains(char::is_whitespace) {
        return Ok(Mnemonic::parse(material)?);
    }

    let entropy = hex::decode(material)?;
    Ok(Mnemonic::from_entropy(&entropy)?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::{MemoryBackend, PersistenceBackend};

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn provider() -> (Arc<MemoryBackend>, SeedProvider) {
        let backend = Arc::new(MemoryBackend::new());
        (backend.clone(), SeedProvider::new(backend))
    }

    #[test]
    fn test_seed_generated_once() {
        let (backend, provider) = provider();

        let seed = provider.get().unwrap();
        assert_eq!(seed.len(), SEED_ENTROPY_LEN * 2);
        assert_eq!(backend.read(SEED_KEY).unwrap(), Some(seed.clone()));

        assert_eq!(provider.get().unwrap(), seed);
        assert_eq!(provider.mnemonic().unwrap().word_count(), 12);
    }

    #[test]
    fn test_hex_entropy_and_phrase_agree() {
        let (_, provider) = provider();

        provider.set("00000000000000000000000000000000").unwrap();
        let from_hex = provider.seed_bytes().unwrap();

        provider.set(PHRASE).unwrap();
        let from_phrase = provider.seed_bytes().unwrap();

        assert_eq!(from_hex, from_phrase);
    }

    #[test]
    fn test_set_rejects_unusable_material() {
        let (_, provider) = provider();
        provider.set(PHRASE).unwrap();

        assert!(provider.set("").is_err());
        assert!(provider.set("not hex").is_err());
        assert!(provider.set("abcd").is_err());

        assert_eq!(provider.get().unwrap(), PHRASE);
    }

    #[test]
    fn test_set_stores_trimmed_material() {
        let (backend, provider) = provider();

        provider.set(&format!("  {PHRASE}\n")).unwrap();

        assert_eq!(backend.read(SEED_KEY).unwrap().as_deref(), Some(PHRASE));
        assert_eq!(provider.get().unwrap(), PHRASE);
    }

    #[test]
    fn test_rotate() {
        let (_, provider) = provider();
        let first = provider.get().unwrap();

        let rotated = provider.rotate().unwrap();
        assert_ne!(first, rotated);
        assert_eq!(provider.get().unwrap(), rotated);
    }
}
