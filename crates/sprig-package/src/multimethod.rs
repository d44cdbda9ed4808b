//! Spec-guarded multimethods.
//!
//! Candidates are ranked in tiers. First come guards the concrete spec
//! satisfies. Failing that, guards it is merely compatible with: nothing
//! conflicts, but the guard names a dependency the concrete spec lacks. The
//! default implementation is used only when both tiers are empty.
//!
//! Within a tier the most specific guards win: `g1` beats `g2` when `g1`
//! implies `g2` but not the reverse. Incomparable winners are resolved by
//! declaration order, or rejected under [`AmbiguityPolicy::Error`].

use std::collections::BTreeMap;

use sprig_core::config::{AmbiguityPolicy, DispatchConfig};
use sprig_core::Spec;
use sprig_util::errors::{SprigError, SprigResult};

use crate::repository::PackageRepository;

/// A guarded implementation.
#[derive(Debug, Clone)]
pub struct Candidate<M> {
    pub guard: Spec,
    pub implementation: M,
}

/// All implementations of one operation on one package, in declaration order.
#[derive(Debug, Clone)]
pub struct MultiMethod<M> {
    package: String,
    name: String,
    candidates: Vec<Candidate<M>>,
    default: Option<M>,
}

impl<M> MultiMethod<M> {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
            candidates: Vec::new(),
            default: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn candidates(&self) -> &[Candidate<M>] {
        &self.candidates
    }

    pub fn default_implementation(&self) -> Option<&M> {
        self.default.as_ref()
    }

    /// Add an implementation guarded by `guard`.
    pub fn register(&mut self, guard: Spec, implementation: M) {
        self.candidates.push(Candidate {
            guard,
            implementation,
        });
    }

    /// Set the unguarded implementation, returning any previous one.
    pub fn set_default(&mut self, implementation: M) -> Option<M> {
        self.default.replace(implementation)
    }

    /// Select the implementation for `concrete`, breaking ties by declaration order.
    pub fn resolve(&self, concrete: &Spec) -> SprigResult<&M> {
        self.resolve_with(concrete, AmbiguityPolicy::FirstDeclared)
    }

    pub fn resolve_with(&self, concrete: &Spec, policy: AmbiguityPolicy) -> SprigResult<&M> {
        self.select(concrete, concrete, policy)
    }

    /// Rank guards against `subject`, which is `concrete` possibly extended
    /// with provided virtual dependencies. Errors and logs name `concrete`.
    fn select(&self, concrete: &Spec, subject: &Spec, policy: AmbiguityPolicy) -> SprigResult<&M> {
        let mut tier: Vec<&Candidate<M>> = self
            .candidates
            .iter()
            .filter(|c| subject.satisfies(&c.guard))
            .collect();
        if tier.is_empty() {
            tier = self
                .candidates
                .iter()
                .filter(|c| subject.is_compatible(&c.guard))
                .collect();
            if !tier.is_empty() {
                tracing::debug!(
                    "{}.{}: no guard satisfied by {concrete}, falling back to {} compatible guard(s)",
                    self.package,
                    self.name,
                    tier.len()
                );
            }
        }

        if tier.is_empty() {
            return match &self.default {
                Some(default) => {
                    tracing::debug!("{}.{}: using default for {concrete}", self.package, self.name);
                    Ok(default)
                }
                None => Err(SprigError::NoSuchMethod {
                    package: self.package.clone(),
                    method: self.name.clone(),
                    spec: concrete.to_string(),
                }),
            };
        }

        let best = most_specific(&tier);
        if best.len() > 1 {
            let guards: Vec<String> = best.iter().map(|c| c.guard.to_string()).collect();
            match policy {
                AmbiguityPolicy::Error => {
                    return Err(SprigError::AmbiguousMethod {
                        package: self.package.clone(),
                        method: self.name.clone(),
                        spec: concrete.to_string(),
                        candidates: guards,
                    });
                }
                AmbiguityPolicy::FirstDeclared => {
                    tracing::warn!(
                        "{}.{} is ambiguous for {concrete} ({}); using the first declared",
                        self.package,
                        self.name,
                        guards.join(", ")
                    );
                }
            }
        }

        let chosen = best[0];
        tracing::debug!(
            "{}.{}: {concrete} dispatched to when='{}'",
            self.package,
            self.name,
            chosen.guard
        );
        Ok(&chosen.implementation)
    }
}

/// Candidates no other candidate is strictly more specific than, in declaration order.
fn most_specific<'a, M>(tier: &[&'a Candidate<M>]) -> Vec<&'a Candidate<M>> {
    tier.iter()
        .copied()
        .filter(|c| {
            !tier
                .iter()
                .any(|other| other.guard.implies(&c.guard) && !c.guard.implies(&other.guard))
        })
        .collect()
}

/// Look up `concrete`'s package in `repo` and select its implementation of `operation`.
///
/// A guard on a virtual dependency (`^mpi@2:`) is met by a concrete
/// dependency whose package provides a matching spec (`^mpich2@1.2` when
/// mpich2 declares `provides("mpi@:2.2", when = "@1.2:")`).
pub fn dispatch<'r, R: PackageRepository>(
    repo: &'r R,
    operation: &str,
    concrete: &Spec,
    config: &DispatchConfig,
) -> SprigResult<&'r R::Method> {
    let package = repo.lookup_package(concrete.name())?;
    let method = package
        .method(operation)
        .ok_or_else(|| SprigError::NoSuchMethod {
            package: package.name().to_string(),
            method: operation.to_string(),
            spec: concrete.to_string(),
        })?;
    let subject = with_provided_virtuals(repo, concrete)?;
    method.select(concrete, &subject, config.ambiguity)
}

/// `concrete` with a dependency added for each virtual package its
/// dependencies provide. Several provisions of the same virtual package
/// contribute the union of their versions. Virtual packages the concrete
/// spec already names are left alone.
fn with_provided_virtuals<R: PackageRepository>(repo: &R, concrete: &Spec) -> SprigResult<Spec> {
    let mut provided: BTreeMap<String, Spec> = BTreeMap::new();
    for dep in concrete.dependencies().values() {
        let package = match repo.lookup_package(dep.name()) {
            Ok(package) => package,
            Err(SprigError::NotFound { .. }) => continue,
            Err(e) => return Err(e),
        };
        for provision in package.provisions_for(dep) {
            let name = provision.provided.name();
            if concrete.dependency(name).is_some() {
                continue;
            }
            match provided.get_mut(name) {
                Some(existing) => {
                    let versions = existing.versions().union(provision.provided.versions());
                    existing.set_versions(versions)?;
                }
                None => {
                    provided.insert(name.to_string(), provision.provided.clone());
                }
            }
        }
    }

    if provided.is_empty() {
        return Ok(concrete.clone());
    }
    let mut subject = concrete.clone();
    for spec in provided.into_values() {
        subject.add_dependency(spec)?;
    }
    tracing::debug!("{concrete} dispatches as {subject}");
    Ok(subject)
}
