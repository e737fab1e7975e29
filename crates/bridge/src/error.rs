use crate::host::MemberKind;
use crate::version::VersionRange;

/// A contradiction in one of the static tables shipped with the bridge.
/// Raised while the tables are assembled at startup, never at call time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("logical key `{logical}` maps to `{existing}`, cannot remap it to `{internal}`")]
    ConflictingLogicalKey {
        logical: String,
        existing: String,
        internal: String,
    },
    #[error("internal key `{internal}` belongs to `{existing}`, cannot alias it as `{logical}`")]
    ConflictingInternalKey {
        internal: String,
        existing: String,
        logical: String,
    },
    #[error("layout for `{owner}` -> `{class}` ({range}) is declared twice")]
    DuplicateLayout {
        owner: String,
        class: String,
        range: VersionRange,
    },
    #[error("layout for `{owner}` -> `{class}` binds {kind} `{name}` twice")]
    DuplicateBinding {
        owner: String,
        class: String,
        kind: MemberKind,
        name: String,
    },
    #[error("layout for `{owner}` -> `{class}` has an empty version range ({range})")]
    EmptyRange {
        owner: String,
        class: String,
        range: VersionRange,
    },
}
