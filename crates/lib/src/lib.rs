//! clangbox-lib: Core types and logic for clangbox
//!
//! This crate builds versioned Clang toolchain images and the development
//! environment images layered on top of them:
//! - `build`: stage specs, naming conventions and outcomes
//! - `engine`: the container engine boundary and its Docker implementation
//! - `execute`: running stages in order with prerequisite gating
//! - `sink`: per-stage build logs

pub mod build;
pub mod config;
pub mod consts;
pub mod engine;
pub mod execute;
pub mod oracle;
pub mod progress;
pub mod report;
pub mod sink;
pub mod util;
