//! Shared utilities.
//!
//! Currently only test doubles for the engine and reporter seams.

#[cfg(test)]
pub mod testutil;
