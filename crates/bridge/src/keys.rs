//! Two-way mapping between framework-defined logical keys and the names a
//! host uses internally. Built once at startup and read-only afterwards.

use std::collections::HashMap;

use crate::error::ConfigurationError;

/// Logical key of the profile property that carries a skull texture.
pub const TEXTURE_PROPERTY: &str = "skull.texture-property";

const BUILTIN_KEYS: &[(&str, &str)] = &[
    ("Object", "java.lang.Object"),
    ("String", "java.lang.String"),
    ("UUID", "java.util.UUID"),
    ("GameProfile", "com.mojang.authlib.GameProfile"),
    ("Property", "com.mojang.authlib.properties.Property"),
    ("PropertyMap", "com.mojang.authlib.properties.PropertyMap"),
    (TEXTURE_PROPERTY, "textures"),
];

#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Result<Self, ConfigurationError> {
        Self::from_entries(BUILTIN_KEYS.iter().copied())
    }

    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, ConfigurationError> {
        let mut registry = Self::new();
        for (logical, internal) in entries {
            registry.register(logical, internal)?;
        }
        Ok(registry)
    }

    /// Registering an identical pair twice is a no-op; reusing either side
    /// with a different partner is rejected.
    pub fn register(&mut self, logical: &str, internal: &str) -> Result<(), ConfigurationError> {
        if let Some(existing) = self.forward.get(logical) {
            if existing == internal {
                return Ok(());
            }
            return Err(ConfigurationError::ConflictingLogicalKey {
                logical: logical.to_owned(),
                existing: existing.clone(),
                internal: internal.to_owned(),
            });
        }
        if let Some(existing) = self.reverse.get(internal) {
            return Err(ConfigurationError::ConflictingInternalKey {
                internal: internal.to_owned(),
                existing: existing.clone(),
                logical: logical.to_owned(),
            });
        }

        self.forward.insert(logical.to_owned(), internal.to_owned());
        self.reverse.insert(internal.to_owned(), logical.to_owned());
        Ok(())
    }

    pub fn logical_to_internal(&self, logical: &str) -> Option<&str> {
        self.forward.get(logical).map(String::as_str)
    }

    pub fn internal_to_logical(&self, internal: &str) -> Option<&str> {
        self.reverse.get(internal).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward.iter().map(|(l, i)| (l.as_str(), i.as_str()))
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}
