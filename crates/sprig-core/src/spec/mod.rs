//! The spec constraint tree and the constraint engine.
//!
//! A [`Spec`] carries a package name, a [`VersionList`], an optional
//! [`CompilerSpec`], a [`VariantMap`], an optional [`Architecture`] and its
//! dependency specs. Dependencies are kept one level deep, as in the textual
//! form, where every `^dep` belongs to the root. A spec may name a given
//! dependency, variant, compiler or architecture at most once; the mutators
//! enforce this and refuse to overwrite.
//!
//! Two questions are answered here:
//! - [`Spec::satisfies`]: does this spec meet every constraint of another?
//! - [`Spec::constrain`]: merge another spec's constraints into this one,
//!   failing without modification when they conflict.

mod compiler;
pub mod lexer;
mod parser;
mod variant;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sprig_util::errors::{ConstraintKind, SprigError, SprigResult};

use crate::version::{Version, VersionList};

pub use compiler::CompilerSpec;
pub use parser::{parse, parse_anonymous};
pub use variant::VariantMap;

/// An opaque target platform token such as `x86_64` or `bgqos_0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Architecture(String);

impl Architecture {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A package constraint together with the constraints on its dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Spec {
    name: String,
    versions: VersionList,
    compiler: Option<CompilerSpec>,
    variants: VariantMap,
    architecture: Option<Architecture>,
    dependencies: BTreeMap<String, Spec>,
}

impl Spec {
    /// A spec for `name` with no other constraints.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: VersionList::any(),
            compiler: None,
            variants: VariantMap::new(),
            architecture: None,
            dependencies: BTreeMap::new(),
        }
    }

    /// Parse text containing exactly one root spec (with any `^` dependencies).
    pub fn parse(input: &str) -> SprigResult<Self> {
        let mut specs = parse(input)?;
        if specs.len() != 1 {
            return Err(SprigError::Parse {
                message: format!("Expected exactly one spec, found {}", specs.len()),
                input: input.to_string(),
                span: (0, input.len()).into(),
            });
        }
        Ok(specs.remove(0))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn versions(&self) -> &VersionList {
        &self.versions
    }

    pub fn compiler(&self) -> Option<&CompilerSpec> {
        self.compiler.as_ref()
    }

    pub fn variants(&self) -> &VariantMap {
        &self.variants
    }

    pub fn architecture(&self) -> Option<&Architecture> {
        self.architecture.as_ref()
    }

    /// Dependencies, keyed and ordered by name.
    pub fn dependencies(&self) -> &BTreeMap<String, Spec> {
        &self.dependencies
    }

    /// A dependency by name.
    pub fn dependency(&self, name: &str) -> Option<&Spec> {
        self.dependencies.get(name)
    }

    /// This spec or its dependency with the given name.
    pub fn find(&self, name: &str) -> Option<&Spec> {
        if self.name == name {
            return Some(self);
        }
        self.dependency(name)
    }

    /// Restrict the acceptable versions. The list must admit at least one version.
    pub fn set_versions(&mut self, versions: VersionList) -> SprigResult<()> {
        versions.ensure_nonempty()?;
        self.versions = versions;
        Ok(())
    }

    pub fn set_compiler(&mut self, compiler: CompilerSpec) -> SprigResult<()> {
        if self.compiler.is_some() {
            return Err(SprigError::DuplicateCompiler {
                spec: self.name.clone(),
            });
        }
        self.compiler = Some(compiler);
        Ok(())
    }

    pub fn add_variant(&mut self, name: impl Into<String>, enabled: bool) -> SprigResult<()> {
        let name = name.into();
        if !self.variants.insert(name.clone(), enabled) {
            return Err(SprigError::DuplicateVariant {
                spec: self.name.clone(),
                variant: name,
            });
        }
        Ok(())
    }

    pub fn set_architecture(&mut self, architecture: Architecture) -> SprigResult<()> {
        if self.architecture.is_some() {
            return Err(SprigError::DuplicateArchitecture {
                spec: self.name.clone(),
            });
        }
        self.architecture = Some(architecture);
        Ok(())
    }

    /// Add a dependency to this spec.
    ///
    /// The dependency's own dependencies are hoisted next to it, merging with
    /// any of the same name already present, so the tree stays one level
    /// deep. Naming a dependency that is already present is an error. On
    /// any error the spec is unchanged.
    pub fn add_dependency(&mut self, mut dependency: Spec) -> SprigResult<()> {
        if self.dependencies.contains_key(&dependency.name) {
            return Err(SprigError::DuplicateDependency {
                spec: self.name.clone(),
                dependency: dependency.name,
            });
        }

        let nested = std::mem::take(&mut dependency.dependencies);
        let mut dependencies = self.dependencies.clone();
        dependencies.insert(dependency.name.clone(), dependency);
        for (name, child) in nested {
            match dependencies.get_mut(&name) {
                Some(existing) => existing.constrain(&child)?,
                None => {
                    dependencies.insert(name, child);
                }
            }
        }
        self.dependencies = dependencies;
        Ok(())
    }

    /// The pinned version, when the version list is a single exact version.
    ///
    /// Together with [`Spec::name`] this identifies the archive to checksum.
    pub fn concrete_version(&self) -> Option<&Version> {
        self.versions.concrete()
    }

    /// Whether this spec and every dependency has a single version, a
    /// versioned compiler and an architecture.
    pub fn is_concrete(&self) -> bool {
        self.versions.concrete().is_some()
            && self.compiler.as_ref().is_some_and(CompilerSpec::is_concrete)
            && self.architecture.is_some()
            && self.dependencies.values().all(Spec::is_concrete)
    }

    /// Whether this spec meets every constraint of `other`.
    ///
    /// Versions (and compiler versions) only need to overlap. Variants,
    /// compiler and architecture missing on either side do not block
    /// satisfaction. Every dependency named by `other` must be present here
    /// and satisfy it recursively.
    pub fn satisfies(&self, other: &Spec) -> bool {
        self.satisfies_node(other)
            && other.dependencies.iter().all(|(name, theirs)| {
                self.dependencies
                    .get(name)
                    .is_some_and(|mine| mine.satisfies(theirs))
            })
    }

    /// Whether `constrain(other)` would succeed: like [`Spec::satisfies`],
    /// except dependencies only one side names are not required.
    pub fn is_compatible(&self, other: &Spec) -> bool {
        self.satisfies_node(other)
            && other.dependencies.iter().all(|(name, theirs)| {
                self.dependencies
                    .get(name)
                    .map_or(true, |mine| mine.is_compatible(theirs))
            })
    }

    /// Whether every constraint of `other` already holds here, so merging
    /// `other` in would change nothing.
    ///
    /// Unlike [`Spec::satisfies`] this treats an unset field as wider than a
    /// set one: `libelf+debug` implies `libelf`, but not the reverse.
    pub fn implies(&self, other: &Spec) -> bool {
        self.constrained(other).is_ok_and(|merged| merged == *self)
    }

    fn satisfies_node(&self, other: &Spec) -> bool {
        let compiler_ok = match (&self.compiler, &other.compiler) {
            (Some(mine), Some(theirs)) => mine.satisfies(theirs),
            _ => true,
        };
        let arch_ok = match (&self.architecture, &other.architecture) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => true,
        };
        self.name == other.name
            && self.versions.satisfies(&other.versions)
            && compiler_ok
            && self.variants.satisfies(&other.variants)
            && arch_ok
    }

    /// Intersect `other`'s constraints into this spec.
    ///
    /// All or nothing: on error `self` is left exactly as it was.
    pub fn constrain(&mut self, other: &Spec) -> SprigResult<()> {
        *self = self.constrained(other)?;
        Ok(())
    }

    /// The intersection of both specs as a new spec.
    pub fn constrained(&self, other: &Spec) -> SprigResult<Spec> {
        let mut scratch = self.clone();
        if let Err(e) = scratch.merge(other) {
            tracing::debug!("cannot constrain {self} with {other}: {e}");
            return Err(e);
        }
        Ok(scratch)
    }

    /// Merge in place. Leaves `self` partially merged on error, so only call
    /// it on a scratch copy.
    fn merge(&mut self, other: &Spec) -> SprigResult<()> {
        if self.name != other.name {
            return Err(unsatisfiable(ConstraintKind::Name, &self.name, &other.name));
        }

        let versions = self.versions.intersect(&other.versions);
        if versions.is_empty() {
            return Err(unsatisfiable(
                ConstraintKind::Version,
                &self.versions,
                &other.versions,
            ));
        }
        self.versions = versions;

        if let Some(theirs) = &other.compiler {
            let merged = match &self.compiler {
                None => theirs.clone(),
                Some(mine) => {
                    let versions = mine.versions().intersect(theirs.versions());
                    if mine.name() != theirs.name() || versions.is_empty() {
                        return Err(unsatisfiable(ConstraintKind::Compiler, mine, theirs));
                    }
                    CompilerSpec::with_versions(mine.name(), versions)?
                }
            };
            self.compiler = Some(merged);
        }

        if let Some((name, enabled)) = self.variants.conflict_with(&other.variants) {
            let sigil = |on: bool| if on { '+' } else { '~' };
            return Err(unsatisfiable(
                ConstraintKind::Variant,
                format!("{}{name}", sigil(!enabled)),
                format!("{}{name}", sigil(enabled)),
            ));
        }
        self.variants.absorb(&other.variants);

        if let Some(theirs) = &other.architecture {
            match &self.architecture {
                None => self.architecture = Some(theirs.clone()),
                Some(mine) if mine != theirs => {
                    return Err(unsatisfiable(
                        ConstraintKind::Architecture,
                        format!("={mine}"),
                        format!("={theirs}"),
                    ));
                }
                Some(_) => {}
            }
        }

        for (name, theirs) in &other.dependencies {
            match self.dependencies.get_mut(name) {
                Some(mine) => mine.merge(theirs)?,
                None => {
                    self.dependencies.insert(name.clone(), theirs.clone());
                }
            }
        }
        Ok(())
    }
}

fn unsatisfiable(
    constraint: ConstraintKind,
    provided: impl fmt::Display,
    required: impl fmt::Display,
) -> SprigError {
    SprigError::Unsatisfiable {
        constraint,
        provided: provided.to_string(),
        required: required.to_string(),
    }
}

impl fmt::Display for Spec {
    /// Canonical form: `name@versions%compiler+on~off=arch^dep^dep`, with
    /// version alternatives ascending and variants and dependencies sorted by
    /// name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.versions.is_any() {
            write!(f, "@{}", self.versions)?;
        }
        if let Some(compiler) = &self.compiler {
            write!(f, "{compiler}")?;
        }
        write!(f, "{}", self.variants)?;
        if let Some(arch) = &self.architecture {
            write!(f, "={arch}")?;
        }
        for dep in self.dependencies.values() {
            write!(f, "^{dep}")?;
        }
        Ok(())
    }
}

impl FromStr for Spec {
    type Err = SprigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Spec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Spec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(s: &str) -> Spec {
        Spec::parse(s).unwrap()
    }

    #[test]
    fn new_spec_is_unconstrained() {
        let s = Spec::new("libelf");
        assert!(s.versions().is_any());
        assert!(s.compiler().is_none());
        assert!(s.variants().is_empty());
        assert_eq!(s.to_string(), "libelf");
    }

    #[test]
    fn programmatic_duplicates_rejected() {
        let mut s = Spec::new("x");
        s.add_variant("debug", true).unwrap();
        assert!(matches!(
            s.add_variant("debug", true),
            Err(SprigError::DuplicateVariant { .. })
        ));
        s.set_compiler(CompilerSpec::new("gcc")).unwrap();
        assert!(matches!(
            s.set_compiler(CompilerSpec::new("gcc")),
            Err(SprigError::DuplicateCompiler { .. })
        ));
        s.set_architecture(Architecture::new("x86_64")).unwrap();
        assert!(matches!(
            s.set_architecture(Architecture::new("x86_64")),
            Err(SprigError::DuplicateArchitecture { .. })
        ));
        s.add_dependency(Spec::new("y")).unwrap();
        assert!(matches!(
            s.add_dependency(Spec::new("y")),
            Err(SprigError::DuplicateDependency { .. })
        ));
        assert_eq!(s.to_string(), "x%gcc+debug=x86_64^y");
    }

    #[test]
    fn nested_dependencies_are_hoisted() {
        let mut root = Spec::new("stat");
        let mut dyninst = Spec::new("dyninst");
        dyninst.add_dependency(spec("libdwarf@20130729")).unwrap();
        root.add_dependency(dyninst).unwrap();

        assert!(root.dependency("dyninst").unwrap().dependencies().is_empty());
        let found = root.find("libdwarf").unwrap();
        assert_eq!(found.concrete_version().unwrap().to_string(), "20130729");
        assert_eq!(root.find("stat").unwrap().name(), "stat");
        assert_eq!(root.to_string(), "stat^dyninst^libdwarf@20130729");
    }

    #[test]
    fn hoisted_conflict_leaves_spec_untouched() {
        let mut root = spec("stat^libdwarf@1");
        let before = root.clone();
        assert!(matches!(
            root.add_dependency(spec("dyninst^libdwarf@2")),
            Err(SprigError::Unsatisfiable { .. })
        ));
        assert_eq!(root, before);
    }

    #[test]
    fn empty_version_list_rejected() {
        let mut s = spec("libelf@1.2");
        let err = s.set_versions(VersionList::from_ranges(vec![])).unwrap_err();
        assert!(matches!(err, SprigError::InvalidVersion { .. }), "got: {err}");
        assert_eq!(s.to_string(), "libelf@1.2");
    }

    #[test]
    fn concreteness() {
        assert!(spec("libelf@0.8.13%gcc@4.7.2=x86_64").is_concrete());
        assert!(!spec("libelf@0.8.13%gcc=x86_64").is_concrete());
        assert!(!spec("libelf@0.8:0.9%gcc@4.7.2=x86_64").is_concrete());
        assert!(!spec("libelf@0.8.13%gcc@4.7.2=x86_64^libdwarf").is_concrete());
    }

    #[test]
    fn failed_constrain_leaves_spec_untouched() {
        let mut s = spec("libdwarf@1:3+debug^libelf@0:2.0");
        let before = s.clone();
        let err = s.constrain(&spec("libdwarf@2+debug^libelf@2.1:3")).unwrap_err();
        assert!(matches!(
            err,
            SprigError::Unsatisfiable {
                constraint: ConstraintKind::Version,
                ..
            }
        ));
        assert_eq!(s, before);
    }

    #[test]
    fn compatible_ignores_missing_dependencies() {
        let concrete = spec("multimethod^foobar");
        let guard = spec("multimethod^mpich");
        assert!(!concrete.satisfies(&guard));
        assert!(concrete.is_compatible(&guard));
        assert!(!spec("multimethod^mpich@1").is_compatible(&spec("multimethod^mpich@2")));
    }
}
