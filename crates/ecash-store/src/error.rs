//! Ecash store errors

use thiserror::Error;

/// Ecash store Error
#[derive(Debug, Error)]
pub enum Error {
    /// Persistence backend error
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
    /// Serde Error
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    /// Bip39 Error
    #[error(transparent)]
    Bip39(#[from] bip39::Error),
    /// Hex Error
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
    /// Keyset counter would overflow
    #[error("Counter overflow for keyset {keyset_id}: {current} + {count}")]
    CounterOverflow {
        /// Keyset id
        keyset_id: String,
        /// Counter value currently persisted
        current: u32,
        /// Requested number of derivations
        count: u32,
    },
    /// Keyset counter would move backwards
    #[error(
        "Counter for keyset {keyset_id} cannot go from {current} to {}",
        .requested.map_or_else(|| "removed".to_owned(), |requested| requested.to_string())
    )]
    CounterRegression {
        /// Keyset id
        keyset_id: String,
        /// Counter value currently persisted
        current: u32,
        /// Counter value requested, `None` when the keyset was dropped
        requested: Option<u32>,
    },
    /// Stored keyset counter is not a valid counter value
    #[error("Stored counter for keyset {0} is invalid")]
    InvalidCounter(String),
    /// Stored document cannot be updated without losing data
    #[error("Stored {0} is corrupt")]
    CorruptDocument(String),
    /// Seed material cannot be interpreted
    #[error("Invalid seed material")]
    InvalidSeed,
    /// Quote is not in the state required by the operation
    #[error("Quote {0} is not paid")]
    QuoteNotPaid(String),
    /// Unknown Quote
    #[error("Unknown Quote {0}")]
    UnknownQuote(String),
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_regression_message() {
        let lowered = Error::CounterRegression {
            keyset_id: "a".to_string(),
            current: 10,
            requested: Some(5),
        };
        assert_eq!(
            lowered.to_string(),
            "Counter for keyset a cannot go from 10 to 5"
        );

        let dropped = Error::CounterRegression {
            keyset_id: "a".to_string(),
            current: 10,
            requested: None,
        };
        assert_eq!(
            dropped.to_string(),
            "Counter for keyset a cannot go from 10 to removed"
        );
    }
}
