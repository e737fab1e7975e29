use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::builder::SkullRequest;
use super::texture::TextureValue;

/// A named head texture that item code can ask for by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSkull {
    pub name: String,
    #[serde(flatten)]
    pub texture: TextureValue,
}

impl CustomSkull {
    pub fn new(name: &str, texture: TextureValue) -> Self {
        Self {
            name: name.to_owned(),
            texture,
        }
    }

    pub fn from_skin_url(name: &str, url: &str) -> Self {
        Self::new(name, TextureValue::from_skin_url(url))
    }
}

impl From<&CustomSkull> for SkullRequest {
    fn from(skull: &CustomSkull) -> Self {
        SkullRequest::new(skull.texture.clone()).with_profile_name(skull.name.as_str())
    }
}

#[derive(Deserialize)]
struct SkullFile {
    #[serde(default)]
    skull: Vec<CustomSkull>,
}

#[derive(Debug, Clone, Default)]
pub struct CustomSkulls {
    by_name: BTreeMap<String, CustomSkull>,
}

impl CustomSkulls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `[[skull]]` entries with `name`, `value` and an optional
    /// `signature`. Later entries replace earlier ones of the same name.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        let file: SkullFile = toml::from_str(source)?;
        let mut skulls = Self::new();
        for skull in file.skull {
            skulls.register(skull);
        }
        Ok(skulls)
    }

    /// Returns the skull previously registered under the same name.
    pub fn register(&mut self, skull: CustomSkull) -> Option<CustomSkull> {
        self.by_name.insert(skull.name.clone(), skull)
    }

    pub fn get(&self, name: &str) -> Option<&CustomSkull> {
        self.by_name.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<CustomSkull> {
        self.by_name.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CustomSkull> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_skull() {
        let skull =
            CustomSkull::from_skin_url("arrow_left", "http://textures.minecraft.net/texture/abc");
        let request = SkullRequest::from(&skull);
        assert_eq!(request.profile_name.as_deref(), Some("arrow_left"));
        assert_eq!(request.texture, skull.texture);
        assert!(request.delivery.is_none());
    }

    #[test]
    fn test_registry_from_toml() {
        let skulls = CustomSkulls::from_toml_str(
            r#"
            [[skull]]
            name = "globe"
            value = "eyJ0ZXh0dXJlcyI6e319"

            [[skull]]
            name = "chest"
            value = "abc"
            signature = "c2ln"

            [[skull]]
            name = "globe"
            value = "replaced"
            "#,
        )
        .unwrap();

        assert_eq!(skulls.len(), 2);
        assert_eq!(skulls.get("globe").unwrap().texture.value(), "replaced");
        assert!(skulls.get("chest").unwrap().texture.is_signed());
        let names: Vec<_> = skulls.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["chest", "globe"]);
    }
}
