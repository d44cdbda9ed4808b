use std::collections::BTreeMap;
use std::fmt;

/// Named boolean build options of one spec node, kept sorted by name.
///
/// A variant missing from the map is unconstrained, not disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VariantMap {
    variants: BTreeMap<String, bool>,
}

impl VariantMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a variant. Returns `false`, leaving the map untouched, if the
    /// name is already present with either polarity.
    pub fn insert(&mut self, name: impl Into<String>, enabled: bool) -> bool {
        let name = name.into();
        if self.variants.contains_key(&name) {
            return false;
        }
        self.variants.insert(name, enabled);
        true
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.variants.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.variants.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Every variant set in `other` has the same value here, or is absent here.
    pub fn satisfies(&self, other: &VariantMap) -> bool {
        other
            .iter()
            .all(|(name, enabled)| self.get(name).map_or(true, |mine| mine == enabled))
    }

    /// The first variant set with opposite polarity in the two maps.
    pub fn conflict_with<'a>(&'a self, other: &'a VariantMap) -> Option<(&'a str, bool)> {
        other
            .iter()
            .find(|(name, enabled)| self.get(name).is_some_and(|mine| mine != *enabled))
    }

    /// Add every variant from `other` that is not already present.
    pub(crate) fn absorb(&mut self, other: &VariantMap) {
        for (name, enabled) in other.iter() {
            self.variants.entry(name.to_string()).or_insert(enabled);
        }
    }
}

impl fmt::Display for VariantMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, enabled) in self.iter() {
            let sigil = if enabled { '+' } else { '~' };
            write!(f, "{sigil}{name}")?;
        }
        Ok(())
    }
}
