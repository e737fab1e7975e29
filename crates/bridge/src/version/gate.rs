use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::descriptor::{compare, VersionDescriptor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResult {
    pub allowed: bool,
    pub reason: String,
}

impl GateResult {
    fn allow(reason: String) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny(reason: String) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

/// `allowed` iff `current` is not older than `required`.
pub fn gate(current: &VersionDescriptor, required: &VersionDescriptor) -> GateResult {
    match compare(current, required) {
        Ordering::Less => GateResult::deny(format!("{current} is older than required {required}")),
        Ordering::Equal => GateResult::allow(format!("{current} is exactly {required}")),
        Ordering::Greater => GateResult::allow(format!("{current} is newer than {required}")),
    }
}

/// Half-open range of host versions: `since` inclusive, `until` exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRange {
    #[serde(default)]
    pub since: Option<VersionDescriptor>,
    #[serde(default)]
    pub until: Option<VersionDescriptor>,
}

impl VersionRange {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn since(version: impl Into<VersionDescriptor>) -> Self {
        Self {
            since: Some(version.into()),
            until: None,
        }
    }

    pub fn until(version: impl Into<VersionDescriptor>) -> Self {
        Self {
            since: None,
            until: Some(version.into()),
        }
    }

    pub fn between(
        since: impl Into<VersionDescriptor>,
        until: impl Into<VersionDescriptor>,
    ) -> Self {
        Self {
            since: Some(since.into()),
            until: Some(until.into()),
        }
    }

    pub fn contains(&self, version: &VersionDescriptor) -> bool {
        let above = self.since.as_ref().is_none_or(|since| version >= since);
        let below = self.until.as_ref().is_none_or(|until| version < until);
        above && below
    }

    /// A range that can never contain anything.
    pub fn is_empty(&self) -> bool {
        matches!((&self.since, &self.until), (Some(since), Some(until)) if since >= until)
    }

    /// Lower is more specific: bounded on both sides, then one side, then open.
    pub fn specificity(&self) -> u8 {
        match (&self.since, &self.until) {
            (Some(_), Some(_)) => 0,
            (Some(_), None) | (None, Some(_)) => 1,
            (None, None) => 2,
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.since, &self.until) {
            (None, None) => f.write_str("any version"),
            (Some(since), None) => write!(f, ">= {since}"),
            (None, Some(until)) => write!(f, "< {until}"),
            (Some(since), Some(until)) => write!(f, ">= {since}, < {until}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VersionGate {
    current: VersionDescriptor,
}

impl VersionGate {
    pub const FLATTENING: (u32, u32, u32) = (1, 13, 0);

    pub fn new(current: VersionDescriptor) -> Self {
        Self { current }
    }

    pub fn current(&self) -> &VersionDescriptor {
        &self.current
    }

    pub fn check(&self, required: &VersionDescriptor) -> GateResult {
        gate(&self.current, required)
    }

    pub fn at_least(&self, major: u32, minor: u32, patch: u32) -> bool {
        self.check(&VersionDescriptor::new(major, minor, patch))
            .allowed
    }

    pub fn within(&self, range: &VersionRange) -> GateResult {
        if let Some(since) = &range.since {
            let lower = self.check(since);
            if !lower.allowed {
                return lower;
            }
        }
        if let Some(until) = &range.until {
            if self.check(until).allowed {
                return GateResult::deny(format!(
                    "{} is at or past the upper bound {until}",
                    self.current
                ));
            }
        }
        GateResult::allow(format!("{} is within {range}", self.current))
    }

    /// Pre-flattening hosts (1.12 and older).
    pub fn is_legacy(&self) -> bool {
        !self.is_modern()
    }

    pub fn is_modern(&self) -> bool {
        let (major, minor, patch) = Self::FLATTENING;
        self.at_least(major, minor, patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(raw: &str) -> VersionDescriptor {
        VersionDescriptor::parse(raw)
    }

    #[test]
    fn test_gate_newer_host() {
        let current = v("1.20.4");
        assert_eq!(current, VersionDescriptor::new(1, 20, 4));

        let result = gate(&current, &v("1.19.0"));
        assert!(result.allowed);
        assert!(result.reason.contains("newer"));
    }

    #[test]
    fn test_gate_equal_and_older() {
        assert!(gate(&v("1.17"), &v("1.17.0")).allowed);

        let denied = gate(&v("1.16.5"), &v("1.17"));
        assert!(!denied.allowed);
        assert!(denied.reason.contains("older"));
    }

    #[test]
    fn test_range_bounds() {
        let range = VersionRange::between("1.17", "1.20.2");
        assert!(!range.contains(&v("1.16.5")));
        assert!(range.contains(&v("1.17")));
        assert!(range.contains(&v("1.20.1")));
        assert!(!range.contains(&v("1.20.2")));
        assert!(VersionRange::any().contains(&v("1.8.8")));
        assert!(VersionRange::between("1.20", "1.17").is_empty());
        assert!(!range.is_empty());
    }

    #[test]
    fn test_within_reports_reason() {
        let gate = VersionGate::new(v("1.20.4"));
        let result = gate.within(&VersionRange::until("1.17"));
        assert!(!result.allowed);
        assert!(result.reason.contains("upper bound"));
        assert!(gate.within(&VersionRange::since("1.20.2")).allowed);
    }

    #[test]
    fn test_legacy_and_modern() {
        assert!(VersionGate::new(v("1.8.8")).is_legacy());
        assert!(VersionGate::new(v("1.12.2")).is_legacy());
        assert!(VersionGate::new(v("1.13")).is_modern());
        assert!(!VersionGate::new(v("1.21.1")).is_legacy());
    }

    #[test]
    fn test_specificity_order() {
        let bounded = VersionRange::between("1.8", "1.9").specificity();
        assert!(bounded < VersionRange::since("1.8").specificity());
        assert!(VersionRange::until("1.9").specificity() < VersionRange::any().specificity());
    }

    proptest! {
        #[test]
        fn older_hosts_are_never_allowed(
            a in (0u32..50, 0u32..50, 0u32..50),
            b in (0u32..50, 0u32..50, 0u32..50),
        ) {
            prop_assume!(a < b);
            let current = VersionDescriptor::new(a.0, a.1, a.2);
            let required = VersionDescriptor::new(b.0, b.1, b.2);
            prop_assert!(!gate(&current, &required).allowed);
            prop_assert!(gate(&required, &current).allowed);
        }
    }
}
