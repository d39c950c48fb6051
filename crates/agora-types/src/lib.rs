//! Agora Types - Core type definitions for the Agora governance engine.
//!
//! This crate provides the fundamental types used throughout Agora:
//! - Addresses (20-byte, Bech32m encoded)
//! - Member identity helpers

pub mod address;
pub mod error;

#[cfg(feature = "serde")]
mod serialization;

pub use address::Address;
pub use error::TypesError;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, TypesError};
}
