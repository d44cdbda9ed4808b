//! Version parsing, comparison, inclusive ranges and normalized version lists.
//!
//! Versions are split into segments at `.`, `-` and `_`, and additionally at
//! every transition between digits and letters, so `12.1_1e` becomes
//! `[12, 1, 1, "e"]`. Segments compare left to right:
//! - numeric segments compare as integers (leading zeros are ignored)
//! - alphabetic segments compare lexicographically
//! - a numeric segment is newer than an alphabetic one at the same position
//! - if one version is a prefix of the other, the shorter one is older

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sprig_util::errors::{SprigError, SprigResult};

/// A parsed version with comparable segments.
///
/// Equality and ordering only look at the segments, so `1.2` and `1-2` are
/// the same version; the original text is kept for display.
#[derive(Debug, Clone)]
pub struct Version {
    original: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    /// Digits with leading zeros stripped (`"0"` stays `"0"`).
    Numeric(String),
    Text(String),
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Numeric(a), Segment::Numeric(b)) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            (Segment::Numeric(_), Segment::Text(_)) => Ordering::Greater,
            (Segment::Text(_), Segment::Numeric(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Version {
    pub fn parse(version: &str) -> SprigResult<Self> {
        let segments = parse_segments(version)?;
        Ok(Self {
            original: version.to_string(),
            segments,
        })
    }

    /// The version exactly as it was written.
    pub fn as_str(&self) -> &str {
        &self.original
    }
}

fn invalid(version: &str, reason: impl Into<String>) -> SprigError {
    SprigError::InvalidVersion {
        version: version.to_string(),
        reason: reason.into(),
    }
}

fn parse_segments(version: &str) -> SprigResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut current = String::new();

    for ch in version.chars() {
        if matches!(ch, '.' | '-' | '_') {
            flush_segment(&mut segments, &mut current);
        } else if ch.is_ascii_alphanumeric() {
            let boundary = current
                .chars()
                .last()
                .is_some_and(|last| last.is_ascii_digit() != ch.is_ascii_digit());
            if boundary {
                flush_segment(&mut segments, &mut current);
            }
            current.push(ch);
        } else {
            return Err(invalid(version, format!("unexpected character '{ch}'")));
        }
    }
    flush_segment(&mut segments, &mut current);

    if segments.is_empty() {
        return Err(invalid(version, "a version needs at least one segment"));
    }
    Ok(segments)
}

fn flush_segment(segments: &mut Vec<Segment>, current: &mut String) {
    if current.is_empty() {
        return;
    }
    let token = std::mem::take(current);
    if token.bytes().all(|b| b.is_ascii_digit()) {
        let trimmed = token.trim_start_matches('0');
        let digits = if trimmed.is_empty() { "0" } else { trimmed };
        segments.push(Segment::Numeric(digits.to_string()));
    } else {
        segments.push(Segment::Text(token));
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments.cmp(&other.segments)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl FromStr for Version {
    type Err = SprigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// An inclusive range of versions. A missing bound is unbounded on that side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    low: Option<Version>,
    high: Option<Version>,
}

fn cmp_low(a: Option<&Version>, b: Option<&Version>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

fn cmp_high(a: Option<&Version>, b: Option<&Version>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

impl VersionRange {
    /// Build a range, rejecting a low bound above the high bound.
    pub fn new(low: Option<Version>, high: Option<Version>) -> SprigResult<Self> {
        if let (Some(l), Some(h)) = (&low, &high) {
            if l > h {
                return Err(invalid(
                    &format!("{l}:{h}"),
                    "the low bound is greater than the high bound",
                ));
            }
        }
        Ok(Self { low, high })
    }

    /// The range containing every version.
    pub fn any() -> Self {
        Self {
            low: None,
            high: None,
        }
    }

    /// The range containing exactly one version.
    pub fn exact(version: Version) -> Self {
        Self {
            low: Some(version.clone()),
            high: Some(version),
        }
    }

    pub fn low(&self) -> Option<&Version> {
        self.low.as_ref()
    }

    pub fn high(&self) -> Option<&Version> {
        self.high.as_ref()
    }

    pub fn is_any(&self) -> bool {
        self.low.is_none() && self.high.is_none()
    }

    /// The single version this range denotes, if it is an exact version.
    pub fn as_exact(&self) -> Option<&Version> {
        match (&self.low, &self.high) {
            (Some(l), Some(h)) if l == h => Some(l),
            _ => None,
        }
    }

    /// Check if a version lies within this range.
    pub fn contains(&self, version: &Version) -> bool {
        self.low.as_ref().map_or(true, |l| version >= l)
            && self.high.as_ref().map_or(true, |h| version <= h)
    }

    /// Two ranges satisfy each other when they share at least one version.
    pub fn satisfies(&self, other: &VersionRange) -> bool {
        let (low, high) = self.overlap_bounds(other);
        match (low, high) {
            (Some(l), Some(h)) => l <= h,
            _ => true,
        }
    }

    /// The versions common to both ranges, or `None` if they are disjoint.
    pub fn intersect(&self, other: &VersionRange) -> Option<VersionRange> {
        if !self.satisfies(other) {
            return None;
        }
        let (low, high) = self.overlap_bounds(other);
        Some(VersionRange {
            low: low.cloned(),
            high: high.cloned(),
        })
    }

    fn overlap_bounds<'a>(
        &'a self,
        other: &'a VersionRange,
    ) -> (Option<&'a Version>, Option<&'a Version>) {
        let low = match cmp_low(self.low(), other.low()) {
            Ordering::Less => other.low(),
            _ => self.low(),
        };
        let high = match cmp_high(self.high(), other.high()) {
            Ordering::Greater => other.high(),
            _ => self.high(),
        };
        (low, high)
    }

    /// The smallest range covering both; only meaningful for overlapping ranges.
    fn hull(&self, other: &VersionRange) -> VersionRange {
        let low = match cmp_low(self.low(), other.low()) {
            Ordering::Greater => other.low(),
            _ => self.low(),
        };
        let high = match cmp_high(self.high(), other.high()) {
            Ordering::Less => other.high(),
            _ => self.high(),
        };
        VersionRange {
            low: low.cloned(),
            high: high.cloned(),
        }
    }
}

impl Ord for VersionRange {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_low(self.low(), other.low()).then_with(|| cmp_high(self.high(), other.high()))
    }
}

impl PartialOrd for VersionRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = self.as_exact() {
            return write!(f, "{v}");
        }
        if let Some(l) = &self.low {
            write!(f, "{l}")?;
        }
        f.write_str(":")?;
        if let Some(h) = &self.high {
            write!(f, "{h}")?;
        }
        Ok(())
    }
}

impl FromStr for VersionRange {
    type Err = SprigError;

    /// Parse `1.2`, `1.2:`, `:1.4` or `1.2:1.4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bound = |part: &str| -> SprigResult<Option<Version>> {
            let part = part.trim();
            if part.is_empty() {
                Ok(None)
            } else {
                Version::parse(part).map(Some)
            }
        };
        match s.split_once(':') {
            Some((_, high)) if high.contains(':') => Err(invalid(s, "more than one ':'")),
            Some((low, high)) => Self::new(bound(low)?, bound(high)?),
            None => Version::parse(s).map(Self::exact),
        }
    }
}

impl From<Version> for VersionRange {
    fn from(v: Version) -> Self {
        Self::exact(v)
    }
}

/// A normalized union of version ranges: sorted ascending, with overlapping
/// ranges coalesced and duplicates removed.
///
/// The default list accepts any version and is the identity for
/// [`VersionList::intersect`]. A list with no ranges at all is *empty*: it is
/// the result of intersecting disjoint lists and accepts nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionList {
    ranges: Vec<VersionRange>,
}

impl Default for VersionList {
    fn default() -> Self {
        Self::any()
    }
}

impl VersionList {
    /// The unconstrained list.
    pub fn any() -> Self {
        Self {
            ranges: vec![VersionRange::any()],
        }
    }

    /// Build a normalized list from arbitrary ranges.
    pub fn from_ranges(ranges: impl IntoIterator<Item = VersionRange>) -> Self {
        Self {
            ranges: normalize(ranges.into_iter().collect()),
        }
    }

    pub fn ranges(&self) -> &[VersionRange] {
        &self.ranges
    }

    /// Whether this list places no restriction on the version.
    pub fn is_any(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].is_any()
    }

    /// Whether no version at all is acceptable.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Reject the empty list, which no spec or compiler may carry.
    pub fn ensure_nonempty(&self) -> SprigResult<()> {
        if self.is_empty() {
            return Err(invalid("", "an empty version list admits no version"));
        }
        Ok(())
    }

    /// The single version this list pins, if it is concrete.
    pub fn concrete(&self) -> Option<&Version> {
        match self.ranges.as_slice() {
            [only] => only.as_exact(),
            _ => None,
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.ranges.iter().any(|r| r.contains(version))
    }

    /// True when the two lists share at least one version.
    pub fn satisfies(&self, other: &VersionList) -> bool {
        self.ranges
            .iter()
            .any(|a| other.ranges.iter().any(|b| a.satisfies(b)))
    }

    pub fn union(&self, other: &VersionList) -> VersionList {
        Self::from_ranges(self.ranges.iter().chain(other.ranges.iter()).cloned())
    }

    pub fn intersect(&self, other: &VersionList) -> VersionList {
        if self.is_any() {
            return other.clone();
        }
        if other.is_any() {
            return self.clone();
        }
        Self::from_ranges(
            self.ranges
                .iter()
                .flat_map(|a| other.ranges.iter().filter_map(move |b| a.intersect(b))),
        )
    }
}

fn normalize(mut ranges: Vec<VersionRange>) -> Vec<VersionRange> {
    ranges.sort();
    let mut out: Vec<VersionRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match out.last_mut() {
            Some(last) if last.satisfies(&range) => *last = last.hull(&range),
            _ => out.push(range),
        }
    }
    out
}

impl From<VersionRange> for VersionList {
    fn from(range: VersionRange) -> Self {
        Self {
            ranges: vec![range],
        }
    }
}

impl From<Version> for VersionList {
    fn from(v: Version) -> Self {
        Self::from(VersionRange::exact(v))
    }
}

impl fmt::Display for VersionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}

impl FromStr for VersionList {
    type Err = SprigError;

    /// Parse comma-separated alternatives such as `1.2:1.4,1.6`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ranges = s
            .split(',')
            .map(VersionRange::from_str)
            .collect::<SprigResult<Vec<_>>>()?;
        Ok(Self::from_ranges(ranges))
    }
}

impl Serialize for VersionList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn list(s: &str) -> VersionList {
        s.parse().unwrap()
    }

    #[test]
    fn basic_ordering() {
        assert!(v("1.0") < v("2.0"));
        assert!(v("1.0.0") < v("1.0.1"));
        assert!(v("1.0.1") < v("1.1.0"));
        assert!(v("1.9") < v("1.10"));
    }

    #[test]
    fn segments_split_at_letter_digit_boundaries() {
        let parsed = v("12.1_1e");
        assert_eq!(
            parsed.segments,
            vec![
                Segment::Numeric("12".into()),
                Segment::Numeric("1".into()),
                Segment::Numeric("1".into()),
                Segment::Text("e".into()),
            ]
        );
    }

    #[test]
    fn numeric_is_newer_than_text() {
        assert!(v("1.2.3") > v("1.2.b"));
        assert!(v("1.4b7") < v("1.4.7"));
    }

    #[test]
    fn shorter_prefix_is_older() {
        assert!(v("1.0") < v("1.0.0"));
        assert!(v("1.4") < v("1.4b7-rc3"));
        assert_ne!(v("1.0"), v("1.0.0"));
    }

    #[test]
    fn separators_do_not_matter_for_equality() {
        assert_eq!(v("1.2-3"), v("1_2.3"));
        assert_eq!(v("1-2").to_string(), "1-2");
    }

    #[test]
    fn leading_zeros_are_ignored() {
        assert_eq!(v("1.01"), v("1.1"));
        assert!(v("1.010") > v("1.9"));
    }

    #[test]
    fn huge_numeric_segments_still_compare() {
        assert!(v("1.99999999999999999999999") > v("1.99999999999999999999998"));
        assert!(v("1.99999999999999999999999") > v("1.abc"));
    }

    #[test]
    fn invalid_versions_rejected() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("...").is_err());
        assert!(Version::parse("1.2+3").is_err());
    }

    #[test]
    fn range_contains_inclusive() {
        let range: VersionRange = "1.0:2.0".parse().unwrap();
        assert!(range.contains(&v("1.0")));
        assert!(range.contains(&v("1.5")));
        assert!(range.contains(&v("2.0")));
        assert!(!range.contains(&v("0.9")));
        assert!(!range.contains(&v("2.1")));
    }

    #[test]
    fn inverted_range_rejected() {
        assert!("2.0:1.0".parse::<VersionRange>().is_err());
        assert!("1:2:3".parse::<VersionRange>().is_err());
    }

    #[test]
    fn unbounded_intersection_takes_other_bound() {
        let open: VersionRange = "1.2:".parse().unwrap();
        let capped: VersionRange = ":1.4".parse().unwrap();
        assert_eq!(open.intersect(&capped).unwrap().to_string(), "1.2:1.4");
        assert_eq!(
            VersionRange::any().intersect(&capped).unwrap(),
            capped
        );
    }

    #[test]
    fn exact_ranges_intersect_only_when_equal() {
        let a = VersionRange::exact(v("1.2"));
        let b = VersionRange::exact(v("1.3"));
        assert!(a.intersect(&b).is_none());
        assert_eq!(a.intersect(&a.clone()), Some(a));
    }

    #[test]
    fn list_sorted_and_coalesced() {
        assert_eq!(list("1.6,1.2:1.4").to_string(), "1.2:1.4,1.6");
        assert_eq!(list("4,2:3,1").to_string(), "1,2:3,4");
        assert_eq!(list("1:3,2:5").to_string(), "1:5");
        assert_eq!(list("2:3,3").to_string(), "2:3");
        assert_eq!(list("1.2,1.2").to_string(), "1.2");
    }

    #[test]
    fn list_with_unbounded_range_is_any() {
        assert!(list(":").is_any());
        assert!(list("1.2,:").is_any());
        assert!(VersionList::default().is_any());
    }

    #[test]
    fn list_intersection() {
        assert_eq!(
            list("0:2.5").intersect(&list("2.1:3")).to_string(),
            "2.1:2.5"
        );
        assert!(list("0:2.0").intersect(&list("2.1:3")).is_empty());
        assert_eq!(VersionList::any().intersect(&list("1.2")), list("1.2"));
    }

    #[test]
    fn list_union() {
        assert_eq!(list("1.2").union(&list("1.4:1.6")).to_string(), "1.2,1.4:1.6");
        assert!(list("1.2").union(&VersionList::any()).is_any());
    }

    #[test]
    fn list_concrete() {
        assert_eq!(list("1.2").concrete(), Some(&v("1.2")));
        assert_eq!(list("1.2:1.4").concrete(), None);
        assert_eq!(list("1.2,1.4").concrete(), None);
    }

    #[test]
    fn list_satisfies_is_overlap() {
        assert!(list("0.8.13").satisfies(&list("0:1")));
        assert!(list("0:1").satisfies(&list("0.8.13")));
        assert!(!list("2:3").satisfies(&list("0:1")));
    }

    #[test]
    fn display() {
        assert_eq!(v("8.1_1e").to_string(), "8.1_1e");
        assert_eq!(list(":1.4b7-rc3").to_string(), ":1.4b7-rc3");
        assert_eq!(list("1.2e6:").to_string(), "1.2e6:");
    }
}
