use std::fmt;

use sprig_util::errors::SprigResult;

use crate::version::VersionList;

/// A compiler constraint: `%intel@12.1:12.6`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompilerSpec {
    name: String,
    versions: VersionList,
}

impl CompilerSpec {
    /// A compiler with no version restriction.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: VersionList::any(),
        }
    }

    /// A compiler restricted to `versions`, which must admit at least one version.
    pub fn with_versions(name: impl Into<String>, versions: VersionList) -> SprigResult<Self> {
        let mut compiler = Self::new(name);
        compiler.set_versions(versions)?;
        Ok(compiler)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn versions(&self) -> &VersionList {
        &self.versions
    }

    pub fn set_versions(&mut self, versions: VersionList) -> SprigResult<()> {
        versions.ensure_nonempty()?;
        self.versions = versions;
        Ok(())
    }

    /// Same compiler with overlapping versions.
    pub fn satisfies(&self, other: &CompilerSpec) -> bool {
        self.name == other.name && self.versions.satisfies(&other.versions)
    }

    pub fn is_concrete(&self) -> bool {
        self.versions.concrete().is_some()
    }
}

impl fmt::Display for CompilerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.name)?;
        if !self.versions.is_any() {
            write!(f, "@{}", self.versions)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_util::errors::SprigError;

    #[test]
    fn empty_version_list_rejected() {
        let err = CompilerSpec::with_versions("gcc", VersionList::from_ranges(vec![])).unwrap_err();
        assert!(matches!(err, SprigError::InvalidVersion { .. }), "got: {err}");

        let mut gcc = CompilerSpec::new("gcc");
        assert!(gcc.set_versions(VersionList::from_ranges(vec![])).is_err());
        assert!(gcc.versions().is_any());
        assert_eq!(gcc.to_string(), "%gcc");
    }
}
