//! Decoding of persisted documents
//!
//! Reads never fail: a missing key, a document that is not JSON or a document
//! with the wrong top-level shape all decode to the empty collection, and
//! malformed elements are dropped one by one.
//!
//! Writes work on the raw entries of a document. An update only re-encodes the
//! entries it changes, every other entry (malformed or not) is written back
//! byte for byte.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;

use crate::backend::PersistenceBackend;
use crate::types::KeysetCounts;
use crate::Error;

/// Undecoded element of a stored document
pub(crate) type RawEntry = Box<RawValue>;

/// Undecoded keyset counters
pub(crate) type RawCounts = BTreeMap<String, RawEntry>;

/// Split a stored JSON array into its raw elements
pub(crate) fn parse_list(key: &str, raw: Option<&str>) -> Vec<RawEntry> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str::<Vec<RawEntry>>(raw) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!("Stored {} is not a JSON array, using empty list: {}", key, err);
            Vec::new()
        }
    }
}

/// Decode a JSON array, keeping only the elements that deserialize into `T`
pub(crate) fn decode_list<T>(key: &str, raw: Option<&str>) -> Vec<T>
where
    T: DeserializeOwned,
{
    parse_list(key, raw)
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match decode_entry(entry) {
            Ok(item) => Some(item),
            Err(err) => {
                tracing::warn!("Dropping malformed {} entry at {}: {}", key, index, err);
                None
            }
        })
        .collect()
}

/// Decode one raw element
pub(crate) fn decode_entry<T>(entry: &RawValue) -> Result<T, serde_json::Error>
where
    T: DeserializeOwned,
{
    serde_json::from_str(entry.get())
}

/// Encode one element
pub(crate) fn encode_entry<T>(value: &T) -> Result<RawEntry, Error>
where
    T: Serialize + ?Sized,
{
    Ok(serde_json::value::to_raw_value(value)?)
}

/// Split a stored JSON object into its raw counters
///
/// A missing document is an empty map, `None` means the stored document is
/// not a JSON object at all.
pub(crate) fn parse_counts(key: &str, raw: Option<&str>) -> Option<RawCounts> {
    let Some(raw) = raw else {
        return Some(RawCounts::new());
    };

    match serde_json::from_str::<RawCounts>(raw) {
        Ok(counts) => Some(counts),
        Err(err) => {
            tracing::warn!("Stored {} is not a JSON object: {}", key, err);
            None
        }
    }
}

/// Counter value of a raw entry, `None` unless it is a `u32`
pub(crate) fn counter_value(entry: &RawValue) -> Option<u32> {
    serde_json::from_str(entry.get()).ok()
}

/// Decode a JSON object of keyset id to counter, dropping non `u32` values
pub(crate) fn decode_counts(key: &str, raw: Option<&str>) -> KeysetCounts {
    parse_counts(key, raw)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(keyset_id, entry)| match counter_value(&entry) {
            Some(count) => Some((keyset_id, count)),
            None => {
                tracing::warn!(
                    "Dropping invalid {} entry for {}: {}",
                    key,
                    keyset_id,
                    entry.get()
                );
                None
            }
        })
        .collect()
}

/// Read `key` from the backend, backend failures read as a missing key
pub(crate) fn read_raw(backend: &dyn PersistenceBackend, key: &str) -> Option<String> {
    match backend.read(key) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!("Could not read {} from backend: {}", key, err);
            None
        }
    }
}

/// Serialize `value` and overwrite `key`
pub(crate) fn write<T>(backend: &dyn PersistenceBackend, key: &str, value: &T) -> Result<(), Error>
where
    T: Serialize + ?Sized,
{
    let encoded = serde_json::to_string(value)?;
    backend.write(key, &encoded)
}

/// Decode `key`, apply `mutate` and write the result back in one
/// [`PersistenceBackend::read_modify_write`] cycle
///
/// Nothing is written when `mutate` fails or leaves the decoded document
/// unchanged.
pub(crate) fn update<T, R, D, F>(
    backend: &dyn PersistenceBackend,
    key: &str,
    decode: D,
    mut mutate: F,
) -> Result<R, Error>
where
    T: Serialize,
    D: Fn(&str, Option<&str>) -> T,
    F: FnMut(&mut T) -> Result<R, Error>,
{
    let mut output = None;

    backend.read_modify_write(key, &mut |current| {
        let mut value = decode(key, current.as_deref());
        let before = serde_json::to_string(&value)?;

        let result = mutate(&mut value)?;
        let encoded = serde_json::to_string(&value)?;
        output = Some(result);

        if encoded == before {
            Ok(None)
        } else {
            Ok(Some(encoded))
        }
    })?;

    output.ok_or_else(|| Error::Internal(format!("Update of {key} did not run")))
}
