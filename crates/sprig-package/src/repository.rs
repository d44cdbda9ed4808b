use std::collections::BTreeMap;

use sprig_core::Spec;
use sprig_util::errors::{SprigError, SprigResult};

use crate::package::PackageDefinition;

/// Source of package definitions for dispatch.
pub trait PackageRepository {
    /// Implementation type of the packages' multimethods.
    type Method;

    /// Find a package by name.
    fn lookup_package(&self, name: &str) -> SprigResult<&PackageDefinition<Self::Method>>;
}

/// An in-memory package repository.
#[derive(Debug, Clone)]
pub struct Repository<M> {
    packages: BTreeMap<String, PackageDefinition<M>>,
}

impl<M> Default for Repository<M> {
    fn default() -> Self {
        Self {
            packages: BTreeMap::new(),
        }
    }
}

impl<M> Repository<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package. Names must be unique.
    pub fn add(&mut self, package: PackageDefinition<M>) -> SprigResult<()> {
        if self.packages.contains_key(package.name()) {
            return Err(SprigError::DuplicatePackage {
                name: package.name().to_string(),
            });
        }
        tracing::debug!("registered package {}", package.name());
        self.packages.insert(package.name().to_string(), package);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PackageDefinition<M>> {
        self.packages.get(name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Packages sorted by name.
    pub fn packages(&self) -> impl Iterator<Item = &PackageDefinition<M>> {
        self.packages.values()
    }

    /// Packages declaring a provision compatible with `virtual_spec`.
    pub fn providers_for(&self, virtual_spec: &Spec) -> Vec<&PackageDefinition<M>> {
        self.packages
            .values()
            .filter(|p| p.provides_spec(virtual_spec))
            .collect()
    }

    /// A name no package defines but at least one package provides.
    pub fn is_virtual(&self, name: &str) -> bool {
        !self.packages.contains_key(name)
            && self
                .packages
                .values()
                .any(|p| p.provisions().iter().any(|prov| prov.provided.name() == name))
    }
}

impl<M> PackageRepository for Repository<M> {
    type Method = M;

    fn lookup_package(&self, name: &str) -> SprigResult<&PackageDefinition<M>> {
        self.packages.get(name).ok_or_else(|| SprigError::NotFound {
            name: name.to_string(),
        })
    }
}
