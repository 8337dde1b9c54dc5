//! Billkit Shared Types
//!
//! This crate contains the entitlement data model shared by the engine, the
//! configuration loader and any host that serializes check results.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
