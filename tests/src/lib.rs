//! # Service Node Test Suite
//!
//! Scenarios that drive the registry and the quorum cop together over an
//! in-memory chain.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── lifecycle.rs         # Registration, rewards, unlock, expiry
//!     ├── reorg.rs             # Detach and rebuild equivalence
//!     ├── quorum_cop.rs        # Uptime proofs → votes → deregistration
//!     └── stake_invariants.rs  # Property tests over contributions
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sn-tests
//! cargo test -p sn-tests integration::quorum_cop
//! RUST_LOG=debug cargo test -p sn-tests -- --nocapture
//! ```

pub mod integration;
