//! Redb persistence backend for ecash-store

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod backend;
pub mod error;

pub use backend::RedbBackend;
