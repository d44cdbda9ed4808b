use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use sprig_core::{parse, parse_anonymous, Spec, Version};
use sprig_util::errors::{SprigError, SprigResult};
use sprig_util::hash::verify_checksum;

use crate::multimethod::MultiMethod;

/// Archive metadata for one known version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDescriptor {
    pub checksum: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A patch file applied to a package's source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Patch {
    pub package: String,
    pub path: String,
    /// Leading path components to strip, as in `patch -p<level>`.
    pub level: u32,
}

/// A virtual package provided while the provider matches `when`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provision {
    pub provided: Spec,
    pub when: Spec,
}

/// Everything a package declares about itself.
///
/// `M` is the implementation type stored by the package's multimethods.
#[derive(Debug, Clone)]
pub struct PackageDefinition<M> {
    name: String,
    homepage: Option<String>,
    url: Option<String>,
    versions: BTreeMap<Version, VersionDescriptor>,
    dependencies: BTreeMap<String, Spec>,
    provisions: Vec<Provision>,
    patches: Vec<(Spec, Vec<Patch>)>,
    methods: BTreeMap<String, MultiMethod<M>>,
}

impl<M> PackageDefinition<M> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            homepage: None,
            url: None,
            versions: BTreeMap::new(),
            dependencies: BTreeMap::new(),
            provisions: Vec::new(),
            patches: Vec::new(),
            methods: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn homepage(&self) -> Option<&str> {
        self.homepage.as_deref()
    }

    pub fn set_homepage(&mut self, homepage: impl Into<String>) {
        self.homepage = Some(homepage.into());
    }

    /// The package-wide download URL, used for versions without their own.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = Some(url.into());
    }

    /// Declare a known version and the hex digest of its archive.
    pub fn version(&mut self, version: &str, checksum: &str) -> SprigResult<()> {
        self.add_version(version, checksum, None)
    }

    /// Declare a known version downloaded from its own URL.
    pub fn version_with_url(&mut self, version: &str, checksum: &str, url: &str) -> SprigResult<()> {
        self.add_version(version, checksum, Some(url.to_string()))
    }

    fn add_version(&mut self, version: &str, checksum: &str, url: Option<String>) -> SprigResult<()> {
        let version = Version::parse(version)?;
        self.versions.insert(
            version,
            VersionDescriptor {
                checksum: checksum.to_string(),
                url,
            },
        );
        Ok(())
    }

    /// Known versions, oldest first.
    pub fn versions(&self) -> impl Iterator<Item = (&Version, &VersionDescriptor)> {
        self.versions.iter()
    }

    pub fn checksum_for(&self, version: &Version) -> Option<&str> {
        self.versions.get(version).map(|d| d.checksum.as_str())
    }

    /// The version's own URL, or the package URL.
    pub fn url_for(&self, version: &Version) -> Option<&str> {
        self.versions
            .get(version)
            .and_then(|d| d.url.as_deref())
            .or(self.url.as_deref())
    }

    /// Check a downloaded archive against the digest declared for `version`.
    pub fn verify_archive(&self, version: &Version, path: &Path) -> SprigResult<()> {
        let digest = self.checksum_for(version).ok_or_else(|| SprigError::Checksum {
            message: format!("No checksum known for {}@{version}", self.name),
        })?;
        if verify_checksum(path, digest)? {
            Ok(())
        } else {
            Err(SprigError::Checksum {
                message: format!(
                    "{} does not match the checksum for {}@{version}",
                    path.display(),
                    self.name
                ),
            })
        }
    }

    /// Declare dependencies, given as spec text (`"libdwarf"`, `"mpich@3: hwloc"`).
    pub fn depends_on(&mut self, specs: &str) -> SprigResult<()> {
        for spec in parse(specs)? {
            if spec.name() == self.name {
                return Err(self.circular("depends_on"));
            }
            if self.dependencies.contains_key(spec.name()) {
                return Err(SprigError::DuplicateDependency {
                    spec: self.name.clone(),
                    dependency: spec.name().to_string(),
                });
            }
            self.dependencies.insert(spec.name().to_string(), spec);
        }
        Ok(())
    }

    pub fn dependencies(&self) -> &BTreeMap<String, Spec> {
        &self.dependencies
    }

    /// Declare virtual packages this package provides, optionally only when
    /// it matches `when` (`"@1.2:"`, `"+mpi"`).
    pub fn provides(&mut self, specs: &str, when: Option<&str>) -> SprigResult<()> {
        let when = self.when_spec(when)?;
        for provided in parse(specs)? {
            if provided.name() == self.name {
                return Err(self.circular("provides"));
            }
            self.provisions.push(Provision {
                provided,
                when: when.clone(),
            });
        }
        Ok(())
    }

    pub fn provisions(&self) -> &[Provision] {
        &self.provisions
    }

    /// Provisions in effect for `concrete`, an instance of this package.
    pub fn provisions_for<'a>(&'a self, concrete: &'a Spec) -> impl Iterator<Item = &'a Provision> + 'a {
        self.provisions
            .iter()
            .filter(move |p| concrete.satisfies(&p.when))
    }

    /// Whether some provision of this package can stand in for `virtual_spec`.
    pub fn provides_spec(&self, virtual_spec: &Spec) -> bool {
        self.provisions
            .iter()
            .any(|p| p.provided.satisfies(virtual_spec))
    }

    /// Declare a patch applied with `-p1` when the package matches `when`.
    pub fn patch(&mut self, path: &str, when: Option<&str>) -> SprigResult<()> {
        self.patch_with_level(path, when, 1)
    }

    pub fn patch_with_level(&mut self, path: &str, when: Option<&str>, level: u32) -> SprigResult<()> {
        let when = self.when_spec(when)?;
        let patch = Patch {
            package: self.name.clone(),
            path: path.to_string(),
            level,
        };
        match self.patches.iter_mut().find(|(guard, _)| *guard == when) {
            Some((_, patches)) => patches.push(patch),
            None => self.patches.push((when, vec![patch])),
        }
        Ok(())
    }

    /// Patches whose `when` clause `concrete` satisfies, in declaration order.
    pub fn patches_for(&self, concrete: &Spec) -> Vec<&Patch> {
        self.patches
            .iter()
            .filter(|(when, _)| concrete.satisfies(when))
            .flat_map(|(_, patches)| patches)
            .collect()
    }

    /// Register an implementation of `operation` guarded by a `when` clause.
    pub fn when(&mut self, operation: &str, guard: &str, implementation: M) -> SprigResult<()> {
        let guard = parse_anonymous(guard, &self.name)?;
        self.method_mut(operation).register(guard, implementation);
        Ok(())
    }

    /// Register the unguarded fallback for `operation`.
    pub fn default_method(&mut self, operation: &str, implementation: M) {
        self.method_mut(operation).set_default(implementation);
    }

    pub fn method(&self, operation: &str) -> Option<&MultiMethod<M>> {
        self.methods.get(operation)
    }

    fn method_mut(&mut self, operation: &str) -> &mut MultiMethod<M> {
        let package = &self.name;
        self.methods
            .entry(operation.to_string())
            .or_insert_with(|| MultiMethod::new(package.clone(), operation))
    }

    fn when_spec(&self, when: Option<&str>) -> SprigResult<Spec> {
        parse_anonymous(when.unwrap_or(&self.name), &self.name)
    }

    fn circular(&self, relation: &str) -> SprigError {
        SprigError::CircularReference {
            package: self.name.clone(),
            relation: relation.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_falls_back_to_package_url() {
        let mut pkg: PackageDefinition<()> = PackageDefinition::new("stat");
        pkg.set_url("https://example.org/stat-2.0.0.tar.gz");
        pkg.version("2.0.0", "c7494210b0ba26b577171b92838e1a9b").unwrap();
        pkg.version_with_url("2.1.0", "ece26beaf057aa9134d62adcdda1ba91", "https://mirror/stat-2.1.0.tgz")
            .unwrap();

        let v200 = Version::parse("2.0.0").unwrap();
        let v210 = Version::parse("2.1.0").unwrap();
        assert_eq!(pkg.url_for(&v200), Some("https://example.org/stat-2.0.0.tar.gz"));
        assert_eq!(pkg.url_for(&v210), Some("https://mirror/stat-2.1.0.tgz"));
    }

    #[test]
    fn patches_with_same_guard_are_grouped() {
        let mut pkg: PackageDefinition<()> = PackageDefinition::new("stat");
        pkg.patch("a.patch", Some("@2:")).unwrap();
        pkg.patch_with_level("b.patch", Some("@2:"), 0).unwrap();
        assert_eq!(pkg.patches.len(), 1);
        assert_eq!(pkg.patches[0].1.len(), 2);
    }

    #[test]
    fn invalid_version_rejected() {
        let mut pkg: PackageDefinition<()> = PackageDefinition::new("stat");
        assert!(matches!(
            pkg.version("2.0$", "00"),
            Err(SprigError::InvalidVersion { .. })
        ));
    }
}
