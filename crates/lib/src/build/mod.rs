//! Stage definitions and outcomes.
//!
//! A build stage turns a [`BuildSpec`] into exactly one [`BuildOutcome`].
//! There are two stage kinds: the compiler image, and the development
//! environment image layered on top of it.
//!
//! # Submodules
//!
//! - [`plan`] - Expanding user requests into ordered specs, tag naming, validation

pub mod plan;
mod types;

pub use plan::{AllArgs, CompilerArgs, EnvironmentArgs, SpecError, Workflow};
pub use types::*;
