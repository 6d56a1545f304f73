//! # Adapters
//!
//! Concrete implementations of the outbound ports.

pub mod crypto;
pub mod store;

pub use crypto::CurveCryptoProvider;
pub use store::InMemoryKVStore;
