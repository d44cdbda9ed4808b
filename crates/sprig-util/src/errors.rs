use std::fmt;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// The part of a spec that failed to intersect during `constrain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Name,
    Version,
    Compiler,
    Variant,
    Architecture,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Version => "version",
            Self::Compiler => "compiler",
            Self::Variant => "variant",
            Self::Architecture => "architecture",
        };
        f.write_str(s)
    }
}

/// Unified error type for all sprig operations.
#[derive(Debug, Error, Diagnostic)]
pub enum SprigError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed token stream or grammar violation in a spec string.
    #[error("Parse error: {message}")]
    #[diagnostic(
        code(sprig::parse),
        help("Specs look like `name@1.2:1.4%compiler+variant~variant=arch ^dependency`")
    )]
    Parse {
        message: String,
        #[source_code]
        input: String,
        #[label("here")]
        span: SourceSpan,
    },

    /// A version string or version range that cannot be represented.
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// The same variant was given twice for one spec node.
    #[error("Cannot specify variant '{variant}' twice in spec '{spec}'")]
    DuplicateVariant { spec: String, variant: String },

    /// A second compiler was given for one spec node.
    #[error("Spec '{spec}' cannot have two compilers")]
    DuplicateCompiler { spec: String },

    /// A second dependency of the same name was given for one spec node.
    #[error("Spec '{spec}' cannot depend on '{dependency}' twice")]
    DuplicateDependency { spec: String, dependency: String },

    /// A second architecture was given for one spec node.
    #[error("Spec '{spec}' cannot have two architectures")]
    DuplicateArchitecture { spec: String },

    /// Two specs could not be merged because a constraint has no common solution.
    #[error("Unsatisfiable {constraint} constraint: '{provided}' does not satisfy '{required}'")]
    #[diagnostic(help("Relax one of the constraints and try again"))]
    Unsatisfiable {
        constraint: ConstraintKind,
        provided: String,
        required: String,
    },

    /// No guarded implementation (and no default) applies to a spec.
    #[error("Package '{package}' has no method '{method}' that applies to '{spec}'")]
    #[diagnostic(help(
        "The package does not support this build configuration; check its `when` clauses"
    ))]
    NoSuchMethod {
        package: String,
        method: String,
        spec: String,
    },

    /// Several equally specific implementations apply and ties are configured as errors.
    #[error("Call to '{method}' on '{package}' is ambiguous for '{spec}': {}", .candidates.join(", "))]
    #[diagnostic(help("Set `dispatch.ambiguity = \"first-declared\"` to pick the first candidate"))]
    AmbiguousMethod {
        package: String,
        method: String,
        spec: String,
        candidates: Vec<String>,
    },

    /// A package name is unknown to the repository.
    #[error("Package '{name}' not found")]
    NotFound { name: String },

    /// A package with the same name is already registered.
    #[error("Package '{name}' is already registered")]
    DuplicatePackage { name: String },

    /// A package relation refers back to the package itself.
    #[error("Package '{package}' cannot pass itself to {relation}")]
    CircularReference { package: String, relation: String },

    /// A `when` clause that names a different package.
    #[error("Invalid spec for package '{package}': {spec}")]
    InvalidWhen { package: String, spec: String },

    /// Checksum lookup or verification failed.
    #[error("Checksum error: {message}")]
    Checksum { message: String },

    /// Invalid or unreadable configuration file.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check ~/.sprig/config.toml for syntax errors"))]
    Config { message: String },
}

/// Convenience alias for results carrying a [`SprigError`].
pub type SprigResult<T> = Result<T, SprigError>;
