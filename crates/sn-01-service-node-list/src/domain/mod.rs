//! # Domain Module
//!
//! Core domain types for the Service Node List subsystem.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod messages;
pub mod rollback;
pub mod staking;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use messages::*;
pub use rollback::*;
pub use staking::*;
