//! Candidate layouts: where a logical owner lives inside a host, per
//! version range. The table is data, loaded from the built-in list and
//! optionally from TOML overrides.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::host::{CONSTRUCTOR_NAME, MemberKind};
use crate::version::{PackageTag, VersionDescriptor, VersionRange};

/// Placeholder in class names and parameter descriptors, replaced with the
/// host's package tag (`v1_8_R3`).
pub const PACKAGE_PLACEHOLDER: &str = "{v}";

/// Expands [`PACKAGE_PLACEHOLDER`]. `None` when the template needs a tag the
/// host does not have.
pub fn expand_package(template: &str, package: Option<&PackageTag>) -> Option<String> {
    if !template.contains(PACKAGE_PLACEHOLDER) {
        return Some(template.to_owned());
    }
    package.map(|tag| template.replace(PACKAGE_PLACEHOLDER, tag.as_str()))
}

/// How one logical member is spelled on a candidate class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBinding {
    pub kind: MemberKind,
    /// Logical name, as it appears in requests.
    pub name: String,
    /// Internal name when it differs from the logical one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<String>,
    /// Internal parameter descriptors. When absent they are derived from
    /// the request through the key registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
}

impl MemberBinding {
    pub fn constructor() -> Self {
        Self::new(MemberKind::Constructor, super::AccessorRequest::CONSTRUCTOR)
    }

    pub fn method(name: &str) -> Self {
        Self::new(MemberKind::Method, name)
    }

    pub fn field(name: &str) -> Self {
        Self::new(MemberKind::Field, name)
    }

    fn new(kind: MemberKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_owned(),
            internal: None,
            params: None,
        }
    }

    pub fn internal(mut self, name: &str) -> Self {
        self.internal = Some(name.to_owned());
        self
    }

    pub fn params(mut self, params: &[&str]) -> Self {
        self.params = Some(params.iter().map(|p| (*p).to_owned()).collect());
        self
    }

    /// The name to look up on the host. Constructors always use the host's
    /// constructor name.
    pub fn internal_name(&self) -> &str {
        match self.kind {
            MemberKind::Constructor => CONSTRUCTOR_NAME,
            MemberKind::Method | MemberKind::Field => {
                self.internal.as_deref().unwrap_or(&self.name)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLayout {
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<VersionDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<VersionDescriptor>,
    pub class: String,
    /// Members not listed here are looked up under their logical name.
    #[serde(default, rename = "member")]
    pub members: Vec<MemberBinding>,
}

impl CandidateLayout {
    pub fn new(owner: &str, class: &str) -> Self {
        Self {
            owner: owner.to_owned(),
            since: None,
            until: None,
            class: class.to_owned(),
            members: Vec::new(),
        }
    }

    pub fn since(mut self, version: impl Into<VersionDescriptor>) -> Self {
        self.since = Some(version.into());
        self
    }

    pub fn until(mut self, version: impl Into<VersionDescriptor>) -> Self {
        self.until = Some(version.into());
        self
    }

    pub fn member(mut self, binding: MemberBinding) -> Self {
        self.members.push(binding);
        self
    }

    pub fn range(&self) -> VersionRange {
        VersionRange {
            since: self.since.clone(),
            until: self.until.clone(),
        }
    }

    pub fn class_name(&self, package: Option<&PackageTag>) -> Option<String> {
        expand_package(&self.class, package)
    }

    pub fn binding(&self, kind: MemberKind, name: &str) -> Option<&MemberBinding> {
        self.members.iter().find(|m| m.kind == kind && m.name == name)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        let range = self.range();
        if range.is_empty() {
            return Err(ConfigurationError::EmptyRange {
                owner: self.owner.clone(),
                class: self.class.clone(),
                range,
            });
        }

        let mut seen = HashSet::new();
        for binding in &self.members {
            if !seen.insert((binding.kind, binding.name.as_str())) {
                return Err(ConfigurationError::DuplicateBinding {
                    owner: self.owner.clone(),
                    class: self.class.clone(),
                    kind: binding.kind,
                    name: binding.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn same_slot(&self, other: &CandidateLayout) -> bool {
        self.owner == other.owner
            && self.class == other.class
            && self.since == other.since
            && self.until == other.until
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("failed to read layout file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Bad TOML, or a field that fails to parse, such as a version bound.
    #[error("malformed layout file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Config(#[from] ConfigurationError),
}

#[derive(Deserialize)]
struct LayoutFile {
    #[serde(default)]
    layout: Vec<CandidateLayout>,
}

/// Candidate layouts grouped by owner, each group in walk order: most
/// specific range first, declaration order among equals.
#[derive(Debug, Clone, Default)]
pub struct LayoutTable {
    by_owner: BTreeMap<String, Vec<CandidateLayout>>,
}

impl LayoutTable {
    pub fn from_layouts(
        layouts: impl IntoIterator<Item = CandidateLayout>,
    ) -> Result<Self, ConfigurationError> {
        let mut by_owner: BTreeMap<String, Vec<CandidateLayout>> = BTreeMap::new();
        for layout in layouts {
            layout.validate()?;
            let group = by_owner.entry(layout.owner.clone()).or_default();
            if group.iter().any(|existing| existing.same_slot(&layout)) {
                return Err(ConfigurationError::DuplicateLayout {
                    owner: layout.owner.clone(),
                    class: layout.class.clone(),
                    range: layout.range(),
                });
            }
            group.push(layout);
        }

        let mut table = Self { by_owner };
        table.sort();
        Ok(table)
    }

    pub fn builtin() -> Result<Self, ConfigurationError> {
        Self::from_layouts(super::builtin::layouts())
    }

    pub fn from_toml_str(source: &str) -> Result<Self, LayoutError> {
        let file: LayoutFile = toml::from_str(source)?;
        Ok(Self::from_layouts(file.layout)?)
    }

    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let source = std::fs::read_to_string(path).map_err(|source| LayoutError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Layers `overrides` on top of this table. An override replaces the
    /// entry with the same owner, class and range, and is walked before
    /// other entries of the same specificity.
    pub fn merge_overrides(&mut self, overrides: LayoutTable) {
        for (owner, layouts) in overrides.by_owner {
            let group = self.by_owner.entry(owner).or_default();
            group.retain(|existing| !layouts.iter().any(|o| o.same_slot(existing)));
            let mut merged = layouts;
            merged.append(group);
            *group = merged;
        }
        self.sort();
    }

    pub fn candidates(&self, owner: &str) -> &[CandidateLayout] {
        self.by_owner.get(owner).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.by_owner.keys().map(String::as_str)
    }

    /// Total number of candidates across all owners.
    pub fn len(&self) -> usize {
        self.by_owner.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_owner.values().all(Vec::is_empty)
    }

    fn sort(&mut self) {
        for group in self.by_owner.values_mut() {
            group.sort_by_key(|layout| layout.range().specificity());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERRIDE: &str = r#"
        [[layout]]
        owner = "GameProfile"
        since = "1.20.2"
        class = "com.mojang.authlib.GameProfile"

        [[layout.member]]
        kind = "method"
        name = "getProperties"
        internal = "propertiesView"

        [[layout]]
        owner = "Scoreboard"
        class = "net.minecraft.{v}.Scoreboard"
    "#;

    #[test]
    fn test_builtin_table_is_valid() {
        let table = LayoutTable::builtin().unwrap();
        assert!(!table.is_empty());
        let owners = [
            "GameProfile",
            "Property",
            "PropertyMap",
            "SkullMeta",
            "ItemStack",
            "CraftItemStack",
            "SetSlotPacket",
            "PlayerConnection",
        ];
        for owner in owners {
            assert!(!table.candidates(owner).is_empty(), "{owner} has no candidates");
        }
    }

    #[test]
    fn test_walk_order_prefers_specific_ranges() {
        let table = LayoutTable::from_layouts([
            CandidateLayout::new("Thing", "a.Open"),
            CandidateLayout::new("Thing", "a.Since").since("1.17"),
            CandidateLayout::new("Thing", "a.Between").since("1.17").until("1.20"),
            CandidateLayout::new("Thing", "a.Until").until("1.17"),
        ])
        .unwrap();

        let classes: Vec<_> = table.candidates("Thing").iter().map(|l| l.class.as_str()).collect();
        assert_eq!(classes, ["a.Between", "a.Since", "a.Until", "a.Open"]);
        assert!(table.candidates("Other").is_empty());
    }

    #[test]
    fn test_rejects_inconsistent_layouts() {
        let duplicate = LayoutTable::from_layouts([
            CandidateLayout::new("Thing", "a.B").since("1.8"),
            CandidateLayout::new("Thing", "a.B").since("1.8"),
        ]);
        assert!(matches!(duplicate, Err(ConfigurationError::DuplicateLayout { .. })));

        let backwards = CandidateLayout::new("Thing", "a.B").since("1.20").until("1.17");
        let empty = LayoutTable::from_layouts([backwards]);
        assert!(matches!(empty, Err(ConfigurationError::EmptyRange { .. })));

        let binding = LayoutTable::from_layouts([CandidateLayout::new("Thing", "a.B")
            .member(MemberBinding::method("x"))
            .member(MemberBinding::method("x").internal("y"))]);
        assert!(matches!(binding, Err(ConfigurationError::DuplicateBinding { .. })));
    }

    #[test]
    fn test_toml_overrides_replace_matching_slot() {
        let mut table = LayoutTable::builtin().unwrap();
        let before = table.len();
        let overrides = LayoutTable::from_toml_str(OVERRIDE).unwrap();
        table.merge_overrides(overrides);

        assert_eq!(table.len(), before + 1);
        let first = &table.candidates("GameProfile")[0];
        let binding = first.binding(MemberKind::Method, "getProperties").unwrap();
        assert_eq!(binding.internal_name(), "propertiesView");
        assert_eq!(table.candidates("Scoreboard").len(), 1);
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            LayoutTable::from_toml_str("[[layout]]\nowner = 3"),
            Err(LayoutError::Parse(_))
        ));
        assert!(matches!(
            LayoutTable::from_toml_str(
                "[[layout]]\nowner = \"X\"\nclass = \"a.X\"\n\
                 [[layout]]\nowner = \"X\"\nclass = \"a.X\""
            ),
            Err(LayoutError::Config(ConfigurationError::DuplicateLayout { .. }))
        ));
    }

    #[test]
    fn test_malformed_version_bound_is_rejected() {
        let err = LayoutTable::from_toml_str(
            "[[layout]]\nowner = \"GameProfile\"\nsince = \"1.2O.2\"\nclass = \"a.B\"",
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::Parse(_)));
        assert!(err.to_string().contains("1.2O.2"), "{err}");

        let err = LayoutTable::from_toml_str(
            "[[layout]]\nowner = \"GameProfile\"\nuntil = \"\"\nclass = \"a.B\"",
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::Parse(_)));
    }

    #[test]
    fn test_load_reads_layout_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layouts.toml");
        std::fs::write(&path, OVERRIDE).unwrap();

        let table = LayoutTable::load(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.owners().count(), 2);
        let profile = &table.candidates("GameProfile")[0];
        assert_eq!(profile.range(), VersionRange::since("1.20.2"));
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = LayoutTable::load(&path).unwrap_err();
        let LayoutError::Io { path: reported, source } = &err else {
            panic!("expected Io, got {err:?}");
        };
        assert_eq!(reported, &path);
        assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_package_expansion() {
        let tag = PackageTag::parse("v1_8_R3").unwrap();
        let layout = CandidateLayout::new(
            "SkullMeta",
            "org.bukkit.craftbukkit.{v}.inventory.CraftMetaSkull",
        );
        assert_eq!(
            layout.class_name(Some(&tag)).as_deref(),
            Some("org.bukkit.craftbukkit.v1_8_R3.inventory.CraftMetaSkull")
        );
        assert_eq!(layout.class_name(None), None);
        assert_eq!(expand_package("java.lang.String", None).as_deref(), Some("java.lang.String"));
        assert_eq!(MemberBinding::constructor().internal_name(), CONSTRUCTOR_NAME);
    }
}
