//! # Access Control
//!
//! The boolean permission oracle consulted before any read. How grants are
//! administered is outside this crate; [`MemoryAccessGate`] serves a fixed
//! grant table loaded from configuration.

pub mod config;
pub mod gate;
pub mod principal;

pub use config::{Access, AccessConfig, GrantConfig};
pub use gate::{AccessGate, MemoryAccessGate};
pub use principal::Principal;
