use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct Payload {
    textures: Textures,
}

#[derive(Deserialize)]
struct Textures {
    #[serde(rename = "SKIN", default)]
    skin: Option<Skin>,
}

#[derive(Deserialize)]
struct Skin {
    url: String,
}

/// The texture property of a player profile. The value is passed to the
/// host untouched; it is only decoded on request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureValue {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
}

impl TextureValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            signature: None,
        }
    }

    pub fn signed(value: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            signature: Some(signature.into()),
        }
    }

    /// Wraps a skin URL in the payload the client expects.
    pub fn from_skin_url(url: &str) -> Self {
        let payload = serde_json::json!({ "textures": { "SKIN": { "url": url } } });
        Self::new(STANDARD.encode(payload.to_string()))
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// The skin URL inside the payload, if the value decodes to one.
    pub fn skin_url(&self) -> Option<String> {
        let json = STANDARD.decode(self.value.trim()).ok()?;
        let payload: Payload = serde_json::from_slice(&json).ok()?;
        payload.textures.skin.map(|skin| skin.url)
    }
}

impl From<&str> for TextureValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
