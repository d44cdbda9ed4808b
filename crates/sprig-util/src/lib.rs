//! Shared utilities for sprig.
//!
//! This crate provides the cross-cutting concerns used by the other sprig
//! crates: the unified error type and checksum verification for archives
//! handed over by the staging layer.

pub mod errors;
pub mod hash;
