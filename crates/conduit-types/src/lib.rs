//! Conduit Types - Shared domain types
//!
//! This crate contains domain types used across conduit crates:
//! - User identity as seen by the auth layer
//! - Process-wide operating mode

pub mod identity;
pub mod mode;

pub use identity::*;
pub use mode::*;
