//! Chip profile types and catalog
//!
//! This module provides types for describing the chips that can be
//! seated in the socket, and the compiled-in catalog of known chips.

pub mod catalog;
mod options;
mod types;

pub use options::Options;
pub use types::*;
