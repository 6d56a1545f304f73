//! # Shared Types Crate
//!
//! Primitives, chain entities, network messages and blockchain hook traits
//! shared by the service node subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-subsystem types are defined here.
//! - **Parsed Inputs**: transaction extras arrive as typed fields, never raw bytes.
//! - **Hex Everywhere**: every key, hash and signature prints as lowercase hex.

pub mod entities;
pub mod errors;
pub mod hooks;
pub mod network;
pub mod primitives;

pub use entities::*;
pub use errors::*;
pub use hooks::*;
pub use network::*;
pub use primitives::*;
