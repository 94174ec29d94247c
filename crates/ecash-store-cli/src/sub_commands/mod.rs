pub mod balance;
pub mod counters;
pub mod proofs;
pub mod quotes;
pub mod seed;
