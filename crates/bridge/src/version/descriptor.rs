use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{de, Deserialize, Deserializer, Serialize};

const MC_MARKER: &str = "(MC:";
const MAX_SEGMENTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty version string")]
    Empty,
    #[error("`{raw}` contains no numeric version segments")]
    NoNumbers { raw: String },
    #[error("segment `{segment}` of `{raw}` is not a version number")]
    Segment { raw: String, segment: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    Exact,
    /// Some segments were unreadable and defaulted to zero.
    Approximate,
    /// Nothing numeric could be read at all.
    Unknown,
}

/// A host version as `(major, minor, patch, qualifier)`.
///
/// Ordering and equality only look at the tuple; how the value was read
/// (see [`Accuracy`]) does not take part in comparisons. A missing
/// qualifier sorts below any present one.
///
/// Deserializing goes through [`try_parse`](Self::try_parse), so a
/// malformed version in a data file is an error rather than a guess.
#[derive(Debug, Clone, Serialize)]
#[serde(into = "String")]
pub struct VersionDescriptor {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub qualifier: Option<String>,
    accuracy: Accuracy,
}

struct Scan<'a> {
    numeric: &'a str,
    qualifier: Option<&'a str>,
}

impl<'a> Scan<'a> {
    fn new(raw: &'a str) -> Self {
        let mut text = raw.trim();
        if let Some(start) = text.find(MC_MARKER) {
            let rest = &text[start + MC_MARKER.len()..];
            let end = rest.find(')').unwrap_or(rest.len());
            text = rest[..end].trim();
        }
        let text = text.strip_prefix('v').unwrap_or(text);

        match text.find(['-', '+', ' ']) {
            Some(split) => {
                let qualifier = text[split + 1..].trim();
                Self {
                    numeric: &text[..split],
                    qualifier: (!qualifier.is_empty()).then_some(qualifier),
                }
            }
            None => Self {
                numeric: text,
                qualifier: None,
            },
        }
    }

    fn segments(&self) -> impl Iterator<Item = &'a str> {
        let numeric = self.numeric;
        numeric.split('.').filter(move |_| !numeric.is_empty())
    }
}

impl VersionDescriptor {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            qualifier: None,
            accuracy: Accuracy::Exact,
        }
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn unknown() -> Self {
        Self {
            major: 0,
            minor: 0,
            patch: 0,
            qualifier: None,
            accuracy: Accuracy::Unknown,
        }
    }

    /// Lenient parse used at boot. Never fails: unreadable segments become
    /// zero and mark the result approximate, and input with no numbers at
    /// all yields [`VersionDescriptor::unknown`].
    pub fn parse(raw: &str) -> Self {
        let scan = Scan::new(raw);
        let mut numbers = [0u32; MAX_SEGMENTS];
        let mut read_any = false;
        let mut approximate = false;

        for (index, segment) in scan.segments().enumerate() {
            if index >= MAX_SEGMENTS {
                approximate = true;
                break;
            }
            match segment.parse::<u32>() {
                Ok(value) => {
                    numbers[index] = value;
                    read_any = true;
                }
                Err(_) => approximate = true,
            }
        }

        if !read_any {
            return Self::unknown();
        }

        Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            qualifier: scan.qualifier.map(str::to_owned),
            accuracy: if approximate {
                Accuracy::Approximate
            } else {
                Accuracy::Exact
            },
        }
    }

    /// Strict parse: rejects anything [`parse`](Self::parse) would have to
    /// approximate.
    pub fn try_parse(raw: &str) -> Result<Self, ParseError> {
        let scan = Scan::new(raw);
        if scan.numeric.is_empty() {
            return if raw.trim().is_empty() {
                Err(ParseError::Empty)
            } else {
                Err(ParseError::NoNumbers {
                    raw: raw.to_owned(),
                })
            };
        }

        for (index, segment) in scan.segments().enumerate() {
            if index >= MAX_SEGMENTS || segment.parse::<u32>().is_err() {
                return Err(ParseError::Segment {
                    raw: raw.to_owned(),
                    segment: segment.to_owned(),
                });
            }
        }

        Ok(Self::parse(raw))
    }

    pub fn accuracy(&self) -> Accuracy {
        self.accuracy
    }

    pub fn is_unknown(&self) -> bool {
        self.accuracy == Accuracy::Unknown
    }

    pub fn is_approximate(&self) -> bool {
        self.accuracy != Accuracy::Exact
    }

    fn key(&self) -> (u32, u32, u32, Option<&str>) {
        (self.major, self.minor, self.patch, self.qualifier.as_deref())
    }
}

pub fn compare(a: &VersionDescriptor, b: &VersionDescriptor) -> Ordering {
    a.cmp(b)
}

impl PartialEq for VersionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for VersionDescriptor {}

impl PartialOrd for VersionDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Hash for VersionDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for VersionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return f.write_str("unknown");
        }
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, "-{qualifier}")?;
        }
        Ok(())
    }
}

impl From<String> for VersionDescriptor {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for VersionDescriptor {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl<'de> Deserialize<'de> for VersionDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::try_parse(&raw).map_err(de::Error::custom)
    }
}

impl From<VersionDescriptor> for String {
    fn from(version: VersionDescriptor) -> Self {
        version.to_string()
    }
}

/// The versioned package segment of a CraftBukkit server class, e.g.
/// `v1_8_R3` in `org.bukkit.craftbukkit.v1_8_R3.CraftServer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageTag {
    tag: String,
    major: u32,
    minor: u32,
    revision: u32,
}

impl PackageTag {
    pub fn parse(tag: &str) -> Option<Self> {
        let mut parts = tag.strip_prefix('v')?.split('_');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let revision = parts.next()?.strip_prefix('R')?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            tag: tag.to_owned(),
            major,
            minor,
            revision,
        })
    }

    /// Unversioned package layouts (newer Paper builds) have no tag.
    pub fn from_server_class(class_name: &str) -> Option<Self> {
        class_name.split('.').find_map(Self::parse)
    }

    pub fn as_str(&self) -> &str {
        &self.tag
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn descriptor(&self) -> VersionDescriptor {
        VersionDescriptor::new(self.major, self.minor, 0)
            .with_qualifier(format!("R{}", self.revision))
    }
}

impl fmt::Display for PackageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_release() {
        let version = VersionDescriptor::parse("1.20.4");
        assert_eq!(version, VersionDescriptor::new(1, 20, 4));
        assert_eq!(version.qualifier, None);
        assert_eq!(version.accuracy(), Accuracy::Exact);
    }

    #[test]
    fn test_bukkit_and_paper_spellings() {
        let bukkit = VersionDescriptor::parse("1.20.4-R0.1-SNAPSHOT");
        assert_eq!((bukkit.major, bukkit.minor, bukkit.patch), (1, 20, 4));
        assert_eq!(bukkit.qualifier.as_deref(), Some("R0.1-SNAPSHOT"));

        let paper = VersionDescriptor::parse("git-Paper-496 (MC: 1.20.4)");
        assert_eq!(paper, VersionDescriptor::new(1, 20, 4));
    }

    #[test]
    fn test_missing_patch_is_zero() {
        let version = VersionDescriptor::parse("1.13");
        assert_eq!(version, VersionDescriptor::new(1, 13, 0));
        assert!(!version.is_approximate());
    }

    #[test]
    fn test_garbage_degrades() {
        let unknown = VersionDescriptor::parse("not a version");
        assert!(unknown.is_unknown());
        assert_eq!(unknown.to_string(), "unknown");

        let partial = VersionDescriptor::parse("1.x.2");
        assert_eq!(partial, VersionDescriptor::new(1, 0, 2));
        assert_eq!(partial.accuracy(), Accuracy::Approximate);
    }

    #[test]
    fn test_strict_parse_errors() {
        assert_eq!(VersionDescriptor::try_parse("  "), Err(ParseError::Empty));
        assert!(matches!(
            VersionDescriptor::try_parse("1.x.2"),
            Err(ParseError::Segment { segment, .. }) if segment == "x"
        ));
        assert!(matches!(
            VersionDescriptor::try_parse("release"),
            Err(ParseError::NoNumbers { .. }) | Err(ParseError::Segment { .. })
        ));
        assert!(VersionDescriptor::try_parse("1.8.8").is_ok());
    }

    #[test]
    fn test_qualifier_absent_sorts_lowest() {
        let plain = VersionDescriptor::new(1, 20, 4);
        let snapshot = VersionDescriptor::parse("1.20.4-R0.1-SNAPSHOT");
        assert_eq!(compare(&plain, &snapshot), Ordering::Less);
        assert_eq!(compare(&snapshot, &plain), Ordering::Greater);
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let ordered = ["1.8.8", "1.12.2", "1.13", "1.17.1", "1.20.4", "1.21"];
        for pair in ordered.windows(2) {
            let a = VersionDescriptor::parse(pair[0]);
            let b = VersionDescriptor::parse(pair[1]);
            assert!(a < b, "{a} should sort before {b}");
        }
    }

    #[test]
    fn test_package_tag() {
        let tag = PackageTag::from_server_class("org.bukkit.craftbukkit.v1_8_R3.CraftServer")
            .unwrap();
        assert_eq!(tag.as_str(), "v1_8_R3");
        assert_eq!(tag.revision(), 3);
        assert_eq!(
            tag.descriptor(),
            VersionDescriptor::new(1, 8, 0).with_qualifier("R3")
        );

        assert!(PackageTag::from_server_class("org.bukkit.craftbukkit.CraftServer").is_none());
        assert!(PackageTag::parse("v1_8").is_none());
    }

    #[test]
    fn test_serde_uses_string_form() {
        #[derive(Deserialize)]
        struct Holder {
            since: VersionDescriptor,
        }

        let holder: Holder = toml::from_str("since = \"1.17.1\"").unwrap();
        assert_eq!(holder.since, VersionDescriptor::new(1, 17, 1));

        let err = toml::from_str::<Holder>("since = \"1.2O.2\"").err().unwrap();
        assert!(err.to_string().contains("2O"), "{err}");
    }

    proptest! {
        #[test]
        fn parse_then_compare_is_reflexive(
            major in 0u32..100,
            minor in 0u32..100,
            patch in 0u32..100,
        ) {
            let raw = format!("{major}.{minor}.{patch}");
            let a = VersionDescriptor::parse(&raw);
            let b = VersionDescriptor::parse(&raw);
            prop_assert_eq!(compare(&a, &b), Ordering::Equal);
            prop_assert_eq!(compare(&a, &a), Ordering::Equal);
        }

        #[test]
        fn display_round_trips(
            major in 0u32..100,
            minor in 0u32..100,
            patch in 0u32..100,
            qualifier in proptest::option::of("[A-Z][A-Za-z0-9.]{0,8}"),
        ) {
            let mut version = VersionDescriptor::new(major, minor, patch);
            if let Some(qualifier) = qualifier {
                version = version.with_qualifier(qualifier);
            }
            prop_assert_eq!(VersionDescriptor::parse(&version.to_string()), version);
        }
    }
}
