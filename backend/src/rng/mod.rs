//! Deterministic random number generation
//!
//! Uses xorshift64* algorithm for fast, deterministic random number generation.
//! All bootstrap draws go through this module.

mod xorshift;

pub use xorshift::RngManager;
