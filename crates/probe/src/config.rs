use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use hostbridge::host::CONSTRUCTOR_NAME;
use hostbridge::{InMemoryHost, MemberKind, TextureValue};

/// A host member to strip before booting, written `<class>#<member>`.
/// `<init>` names the constructors; any other name drops methods and
/// fields with that name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDrop {
    pub class: String,
    pub member: String,
}

impl MemberDrop {
    pub fn apply(&self, host: &mut InMemoryHost) -> usize {
        if self.member == CONSTRUCTOR_NAME {
            return host.remove_member(&self.class, MemberKind::Constructor, &self.member);
        }
        host.remove_member(&self.class, MemberKind::Method, &self.member)
            + host.remove_member(&self.class, MemberKind::Field, &self.member)
    }
}

impl FromStr for MemberDrop {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (class, member) = s
            .split_once('#')
            .ok_or_else(|| format!("expected <class>#<member>, got {s:?}"))?;
        if class.is_empty() || member.is_empty() {
            return Err(format!("expected <class>#<member>, got {s:?}"));
        }
        Ok(Self {
            class: class.to_owned(),
            member: member.to_owned(),
        })
    }
}

impl fmt::Display for MemberDrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class, self.member)
    }
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub shape: String,
    pub version_override: Option<String>,
    pub layouts: Option<PathBuf>,
    pub texture: TextureValue,
    pub player: String,
    pub slot: i64,
    pub deliver: bool,
    pub closed_connection: bool,
    pub drop_members: Vec<MemberDrop>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            shape: "modern".into(),
            version_override: None,
            layouts: None,
            // {"textures":{}}
            texture: TextureValue::new("eyJ0ZXh0dXJlcyI6e319"),
            player: "probe".into(),
            slot: 36,
            deliver: false,
            closed_connection: false,
            drop_members: Vec::new(),
        }
    }
}
