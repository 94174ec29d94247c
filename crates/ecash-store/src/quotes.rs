//! Mint quotes
//!
//! A passive ledger: nothing here watches the clock or the mint. Callers poll
//! [`QuoteStore::list`], decide when a quote got paid or ran out of time and
//! drive the transitions.

use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::backend::{DynPersistenceBackend, PENDING_QUOTES_KEY};
use crate::codec::{self, RawEntry};
use crate::types::{MintQuote, QuoteState};
use crate::Error;

/// Just the id of a stored quote
#[derive(Deserialize)]
struct QuoteRef {
    id: String,
}

fn entry_id(entry: &RawValue) -> Option<String> {
    codec::decode_entry::<QuoteRef>(entry)
        .ok()
        .map(|quote| quote.id)
}

/// Re-encode a stored quote with only its `state` field replaced
fn with_state(entry: &RawValue, state: QuoteState) -> Result<RawEntry, Error> {
    let mut fields: Map<String, Value> = codec::decode_entry(entry)?;
    fields.insert("state".to_string(), serde_json::to_value(state)?);
    codec::encode_entry(&fields)
}

/// Persisted collection of mint quotes
///
/// Updates only rewrite the quotes they change, every other stored entry is
/// kept as it is.
#[derive(Debug, Clone)]
pub struct QuoteStore {
    backend: DynPersistenceBackend,
}

impl QuoteStore {
    /// Create new [`QuoteStore`]
    pub fn new(backend: DynPersistenceBackend) -> Self {
        Self { backend }
    }

    /// Quotes currently tracked
    #[instrument(skip(self))]
    pub fn list(&self) -> Vec<MintQuote> {
        let raw = codec::read_raw(self.backend.as_ref(), PENDING_QUOTES_KEY);
        codec::decode_list(PENDING_QUOTES_KEY, raw.as_deref())
    }

    /// Quote by id
    pub fn get(&self, id: &str) -> Option<MintQuote> {
        self.list().into_iter().find(|quote| quote.id == id)
    }

    /// Overwrite the whole collection
    #[instrument(skip_all)]
    pub fn replace(&self, quotes: &[MintQuote]) -> Result<(), Error> {
        codec::write(self.backend.as_ref(), PENDING_QUOTES_KEY, quotes)
    }

    /// Track a new quote in the [`QuoteState::Pending`] state
    ///
    /// Ids are not checked for uniqueness, callers look the id up with
    /// [`QuoteStore::get`] first.
    #[instrument(skip(self, quote), fields(quote_id = %quote.id))]
    pub fn add(&self, mut quote: MintQuote) -> Result<(), Error> {
        quote.state = QuoteState::Pending;

        codec::update(
            self.backend.as_ref(),
            PENDING_QUOTES_KEY,
            codec::parse_list,
            |entries| {
                if entries
                    .iter()
                    .any(|entry| entry_id(entry).as_deref() == Some(quote.id.as_str()))
                {
                    tracing::warn!("Adding quote {} a second time", quote.id);
                }
                entries.push(codec::encode_entry(&quote)?);
                Ok(())
            },
        )
    }

    /// Move quote `id` to `new_state`
    ///
    /// Unknown ids, repeated states and transitions out of a final state are
    /// no-ops. Returns whether the stored state changed.
    #[instrument(skip(self))]
    pub fn set_state(&self, id: &str, new_state: QuoteState) -> Result<bool, Error> {
        codec::update(
            self.backend.as_ref(),
            PENDING_QUOTES_KEY,
            codec::parse_list,
            |entries| {
                let mut changed = false;
                let mut found = false;

                for entry in entries.iter_mut() {
                    let Ok(quote) = codec::decode_entry::<MintQuote>(&**entry) else {
                        continue;
                    };

                    if quote.id != id {
                        continue;
                    }
                    found = true;

                    if quote.state == new_state {
                        continue;
                    }

                    if !quote.state.can_transition_to(new_state) {
                        tracing::warn!(
                            "Ignoring quote {} transition from {} to {}",
                            id,
                            quote.state,
                            new_state
                        );
                        continue;
                    }

                    *entry = with_state(&**entry, new_state)?;
                    changed = true;
                }

                if !found {
                    tracing::debug!("Quote {} not found", id);
                }

                Ok(changed)
            },
        )
    }

    /// Stop tracking quote `id`, returns whether a quote was removed
    #[instrument(skip(self))]
    pub fn remove(&self, id: &str) -> Result<bool, Error> {
        codec::update(
            self.backend.as_ref(),
            PENDING_QUOTES_KEY,
            codec::parse_list,
            |entries| {
                let before = entries.len();
                entries.retain(|entry| entry_id(entry).as_deref() != Some(id));

                if entries.len() == before {
                    tracing::debug!("Quote {} not found", id);
                }

                Ok(entries.len() != before)
            },
        )
    }

    /// Expire every pending quote whose expiry is at or before `now`
    ///
    /// Returns the ids that moved to [`QuoteState::Expired`].
    #[instrument(skip(self))]
    pub fn expire_overdue(&self, now: u64) -> Result<Vec<String>, Error> {
        codec::update(
            self.backend.as_ref(),
            PENDING_QUOTES_KEY,
            codec::parse_list,
            |entries| {
                let mut expired = Vec::new();

                for entry in entries.iter_mut() {
                    let Ok(quote) = codec::decode_entry::<MintQuote>(&**entry) else {
                        continue;
                    };

                    if quote.is_overdue(now) {
                        *entry = with_state(&**entry, QuoteState::Expired)?;
                        expired.push(quote.id);
                    }
                }

                Ok(expired)
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::{MemoryBackend, PersistenceBackend};
    use crate::Amount;

    fn quote(id: &str, expiry: u64) -> MintQuote {
        MintQuote {
            id: id.to_string(),
            amount: Amount::from(100),
            expiry: Some(expiry),
            date: "2024-05-01T10:00:00.000Z".to_string(),
            mint: "https://mint.example.com".parse().unwrap(),
            invoice: "lnbc1u1pjexample".to_string(),
            state: QuoteState::Pending,
        }
    }

    fn store() -> (Arc<MemoryBackend>, QuoteStore) {
        let backend = Arc::new(MemoryBackend::new());
        (backend.clone(), QuoteStore::new(backend))
    }

    #[test]
    fn test_quote_lifecycle() {
        let (_, store) = store();

        store.add(quote("q1", 1_700_000_000)).unwrap();
        assert!(store.set_state("q1", QuoteState::Paid).unwrap());

        let quotes = store.list();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].id, "q1");
        assert_eq!(quotes[0].state, QuoteState::Paid);

        assert!(store.remove("q1").unwrap());
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_add_forces_pending() {
        let (_, store) = store();
        let mut paid = quote("q1", 10);
        paid.state = QuoteState::Paid;

        store.add(paid).unwrap();
        assert_eq!(store.get("q1").unwrap().state, QuoteState::Pending);
    }

    #[test]
    fn test_add_keeps_duplicate_ids() {
        let (_, store) = store();
        store.add(quote("q1", 10)).unwrap();
        store.add(quote("q1", 20)).unwrap();

        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn test_set_state_is_idempotent() {
        let (backend, store) = store();
        store.add(quote("q1", 10)).unwrap();

        assert!(store.set_state("q1", QuoteState::Paid).unwrap());
        let once = backend.read(PENDING_QUOTES_KEY).unwrap();

        assert!(!store.set_state("q1", QuoteState::Paid).unwrap());
        assert_eq!(backend.read(PENDING_QUOTES_KEY).unwrap(), once);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let (backend, store) = store();
        store.add(quote("q1", 10)).unwrap();
        let before = backend.read(PENDING_QUOTES_KEY).unwrap();

        assert!(!store.remove("nonexistent").unwrap());
        assert!(!store.set_state("nonexistent", QuoteState::Expired).unwrap());

        assert_eq!(backend.read(PENDING_QUOTES_KEY).unwrap(), before);
    }

    #[test]
    fn test_final_states_do_not_go_back() {
        let (_, store) = store();
        store.add(quote("paid", 10)).unwrap();
        store.add(quote("expired", 10)).unwrap();
        store.set_state("paid", QuoteState::Paid).unwrap();
        store.set_state("expired", QuoteState::Expired).unwrap();

        assert!(!store.set_state("paid", QuoteState::Pending).unwrap());
        assert!(!store.set_state("paid", QuoteState::Expired).unwrap());
        assert!(!store.set_state("expired", QuoteState::Pending).unwrap());
        assert!(!store.set_state("expired", QuoteState::Paid).unwrap());

        assert_eq!(store.get("paid").unwrap().state, QuoteState::Paid);
        assert_eq!(store.get("expired").unwrap().state, QuoteState::Expired);
    }

    #[test]
    fn test_expire_overdue() {
        let (_, store) = store();
        store.add(quote("old", 100)).unwrap();
        store.add(quote("edge", 200)).unwrap();
        store.add(quote("fresh", 300)).unwrap();
        store.add(quote("paid", 50)).unwrap();
        store.set_state("paid", QuoteState::Paid).unwrap();

        let expired = store.expire_overdue(200).unwrap();
        assert_eq!(expired, vec!["old".to_string(), "edge".to_string()]);

        assert_eq!(store.get("fresh").unwrap().state, QuoteState::Pending);
        assert_eq!(store.get("paid").unwrap().state, QuoteState::Paid);
        assert!(store.expire_overdue(200).unwrap().is_empty());
    }

    const Q1: &str = r#"{"id":"q1","amount":100,"expiry":10,"date":"d","mint":"https://mint.example.com","invoice":"lnbc","state":"pending"}"#;
    const Q2: &str = r#"{"id":"q2","amount":100,"expiry":10,"date":"d","mint":"not a url","invoice":"lnbc","state":"pending"}"#;

    #[test]
    fn test_updates_rewrite_only_the_changed_quote() {
        let backend = Arc::new(MemoryBackend::with_values([(
            PENDING_QUOTES_KEY,
            format!("[{Q1},{Q2}]"),
        )]));
        let store = QuoteStore::new(backend.clone());

        assert!(store.set_state("q1", QuoteState::Paid).unwrap());
        assert_eq!(
            backend.read(PENDING_QUOTES_KEY).unwrap(),
            Some(format!("[{},{Q2}]", Q1.replace("pending", "paid")))
        );

        assert!(store.expire_overdue(100).unwrap().is_empty());
        assert!(!store.set_state("q2", QuoteState::Expired).unwrap());

        assert!(store.remove("q1").unwrap());
        assert_eq!(
            backend.read(PENDING_QUOTES_KEY).unwrap(),
            Some(format!("[{Q2}]"))
        );
    }

    #[test]
    fn test_quote_without_expiry_never_expires() {
        let raw = r#"[{"id":"q1","amount":100,"expiry":null,"date":"d","mint":"https://mint.example.com","invoice":"lnbc","state":"pending"}]"#;
        let backend = MemoryBackend::with_values([(PENDING_QUOTES_KEY, raw)]);
        let store = QuoteStore::new(Arc::new(backend));

        let quotes = store.list();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].expiry, None);

        assert!(store.expire_overdue(u64::MAX).unwrap().is_empty());
        assert_eq!(store.get("q1").unwrap().state, QuoteState::Pending);
    }

    #[test]
    fn test_malformed_quotes_are_dropped() {
        let raw = r#"[
            {"id":"q1","amount":100,"expiry":10,"date":"d","mint":"https://mint.example.com","invoice":"lnbc","state":"pending"},
            {"id":"q2","amount":100,"expiry":10,"date":"d","mint":"not a url","invoice":"lnbc","state":"pending"},
            {"id":"q3","amount":100,"expiry":10,"date":"d","mint":"https://mint.example.com","invoice":"lnbc","state":"issued"}
        ]"#;
        let backend = MemoryBackend::with_values([(PENDING_QUOTES_KEY, raw)]);
        let store = QuoteStore::new(Arc::new(backend));

        let quotes = store.list();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].id, "q1");
    }
}
