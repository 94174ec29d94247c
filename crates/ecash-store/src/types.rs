//! Wallet store types

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::Amount;

/// Keyset id to derivation counter
pub type KeysetCounts = BTreeMap<String, u32>;

/// Proof
///
/// Only the fields this layer reasons about are typed, any other protocol
/// field (`witness`, `dleq`, ...) is kept untouched in [`Proof::extra`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Amount in sats
    pub amount: Amount,
    /// Keyset id
    #[serde(rename = "id", alias = "keysetId")]
    pub keyset_id: String,
    /// Secret message
    pub secret: String,
    /// Unblinded signature
    #[serde(rename = "C")]
    pub c: String,
    /// Remaining protocol fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Proof {
    /// Create new [`Proof`]
    pub fn new<K, S, C>(amount: Amount, keyset_id: K, secret: S, c: C) -> Self
    where
        K: Into<String>,
        S: Into<String>,
        C: Into<String>,
    {
        Self {
            amount,
            keyset_id: keyset_id.into(),
            secret: secret.into(),
            c: c.into(),
            extra: Map::new(),
        }
    }

    /// Identity of the proof
    pub fn id(&self) -> ProofId {
        ProofId {
            keyset_id: self.keyset_id.clone(),
            secret: self.secret.clone(),
        }
    }
}

/// Record of a redeemed proof
///
/// Only the identity is required. Records written from a full [`Proof`] keep
/// its amount, signature and protocol fields in [`SpentProof::extra`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentProof {
    /// Keyset id
    #[serde(rename = "id", alias = "keysetId")]
    pub keyset_id: String,
    /// Secret message
    pub secret: String,
    /// Remaining fields of the proof
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SpentProof {
    /// Identity of the spent proof
    pub fn id(&self) -> ProofId {
        ProofId {
            keyset_id: self.keyset_id.clone(),
            secret: self.secret.clone(),
        }
    }

    /// Amount of the spent proof, if recorded
    pub fn amount(&self) -> Option<Amount> {
        self.extra.get("amount").and_then(Value::as_u64).map(Amount::from)
    }
}

impl From<Proof> for SpentProof {
    fn from(proof: Proof) -> Self {
        let mut extra = Map::new();
        extra.insert("amount".to_string(), Value::from(u64::from(proof.amount)));
        extra.insert("C".to_string(), Value::String(proof.c));
        extra.extend(proof.extra);

        Self {
            keyset_id: proof.keyset_id,
            secret: proof.secret,
            extra,
        }
    }
}

impl From<ProofId> for SpentProof {
    fn from(id: ProofId) -> Self {
        Self {
            keyset_id: id.keyset_id,
            secret: id.secret,
            extra: Map::new(),
        }
    }
}

/// Proof identity: `keyset id + secret`
///
/// Deserializes from any stored proof or spent record, other fields are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProofId {
    /// Keyset id
    #[serde(rename = "id", alias = "keysetId")]
    pub keyset_id: String,
    /// Secret
    pub secret: String,
}

impl fmt::Display for ProofId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.keyset_id, self.secret)
    }
}

/// Possible states of a mint quote
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteState {
    /// Invoice issued, not paid yet
    #[default]
    Pending,
    /// Mint confirmed payment, proofs can be claimed
    Paid,
    /// Quote expired before payment
    Expired,
}

impl QuoteState {
    /// Check if moving from `self` to `new_state` is allowed
    ///
    /// Valid transitions:
    /// - Pending -> Paid, Expired
    /// - Paid, Expired -> (no transitions allowed)
    ///
    /// Staying in the same state is always allowed.
    pub fn can_transition_to(self, new_state: QuoteState) -> bool {
        self == new_state
            || matches!(
                (self, new_state),
                (QuoteState::Pending, QuoteState::Paid) | (QuoteState::Pending, QuoteState::Expired)
            )
    }
}

impl fmt::Display for QuoteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl FromStr for QuoteState {
    type Err = String;

    fn from_str(state: &str) -> Result<Self, Self::Err> {
        match state.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("Unknown quote state: {state}")),
        }
    }
}

/// Mint quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintQuote {
    /// Quote id
    pub id: String,
    /// Amount in sats
    pub amount: Amount,
    /// Unix timestamp (seconds) after which the quote is no longer valid,
    /// `None` if the mint did not set one
    pub expiry: Option<u64>,
    /// Creation date as displayed to the user
    pub date: String,
    /// Mint url
    pub mint: Url,
    /// Payment request
    pub invoice: String,
    /// Quote state
    #[serde(default)]
    pub state: QuoteState,
}

impl MintQuote {
    /// Whether the quote is pending and past its expiry at `now`
    ///
    /// A quote without expiry is never overdue.
    pub fn is_overdue(&self, now: u64) -> bool {
        self.state == QuoteState::Pending && self.expiry.is_some_and(|expiry| expiry <= now)
    }
}
