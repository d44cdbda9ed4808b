//! Package definitions and spec-guarded dispatch.
//!
//! A [`PackageDefinition`] records what a package knows about itself: its
//! versions and their archive checksums, the specs it depends on, the virtual
//! packages it provides, the patches it applies and its *multimethods*,
//! operations with several implementations each guarded by a `when` spec.
//!
//! [`dispatch`] picks the implementation of an operation that best matches a
//! concrete spec, looking the package up in a [`PackageRepository`].

pub mod multimethod;
pub mod package;
pub mod repository;

pub use multimethod::{dispatch, Candidate, MultiMethod};
pub use package::{PackageDefinition, Patch, Provision, VersionDescriptor};
pub use repository::{PackageRepository, Repository};
