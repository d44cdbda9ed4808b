//! Core spec language for the sprig package manager.
//!
//! A *spec* describes a software configuration: a package name, acceptable
//! versions, a compiler, boolean build variants, a target architecture and a
//! tree of dependency specs. This crate parses spec strings, renders them in
//! canonical form, and answers the two questions every other subsystem asks:
//! does one spec satisfy another, and can two specs be merged.
//!
//! This crate is intentionally free of async code and I/O, apart from loading
//! the optional configuration file.

pub mod config;
pub mod spec;
pub mod version;

pub use spec::{parse, parse_anonymous, Spec};
pub use version::{Version, VersionList, VersionRange};
