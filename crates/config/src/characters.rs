//! Characters: the persona text placed at the top of the system message.
//!
//! Built-in characters ship inside the binary and cannot be changed.
//! Custom characters are stored in `characters.json` in the data directory.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

use crate::ConfigError;

/// The character used when none is configured or the configured one is gone.
pub const DEFAULT_CHARACTER: &str = "momo";

const BUILTIN_CHARACTERS: &str = include_str!("../resources/characters.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterKind {
    Builtin,
    Custom,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CharacterError {
    #[error("'{0}' is a built-in character and cannot be changed")]
    Protected(String),

    #[error("No character named '{0}'")]
    NotFound(String),

    #[error("Character description cannot be empty")]
    EmptyDescription,
}

/// Built-in and custom characters by name.
#[derive(Debug, Clone)]
pub struct CharacterBook {
    builtin: BTreeMap<String, String>,
    custom: BTreeMap<String, String>,
}

impl CharacterBook {
    /// Only the built-in characters.
    pub fn builtin() -> Self {
        let builtin = parse_map(BUILTIN_CHARACTERS);
        Self {
            builtin,
            custom: BTreeMap::new(),
        }
    }

    /// Built-ins plus custom characters from `path`.
    ///
    /// A missing or unreadable file means no custom characters.
    pub fn load(path: &Path) -> Self {
        let mut book = Self::builtin();
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return book,
        };
        if content.trim().is_empty() {
            return book;
        }
        if serde_json::from_str::<Value>(&content).is_err() {
            warn!(path = %path.display(), "Ignoring unreadable characters file");
            return book;
        }
        for (name, description) in parse_map(&content) {
            if !book.builtin.contains_key(&name) {
                book.custom.insert(name, description);
            }
        }
        book
    }

    /// Write the custom characters to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(&self.custom).map_err(|e| {
            ConfigError::WriteError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.custom
            .get(name)
            .or_else(|| self.builtin.get(name))
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtin.contains_key(name)
    }

    /// Persona for `name`, falling back to the default character.
    pub fn persona(&self, name: &str) -> &str {
        self.get(name)
            .or_else(|| self.get(DEFAULT_CHARACTER))
            .unwrap_or_default()
    }

    /// Built-ins first, then custom characters, each alphabetical.
    pub fn list(&self) -> Vec<(&str, CharacterKind)> {
        self.builtin
            .keys()
            .map(|n| (n.as_str(), CharacterKind::Builtin))
            .chain(self.custom.keys().map(|n| (n.as_str(), CharacterKind::Custom)))
            .collect()
    }

    /// Add or replace a custom character. A literal `\n` in the text is a newline.
    pub fn add(&mut self, name: &str, description: &str) -> Result<(), CharacterError> {
        if self.is_builtin(name) {
            return Err(CharacterError::Protected(name.to_string()));
        }
        let description = normalize_description(description)?;
        self.custom.insert(name.to_string(), description);
        Ok(())
    }

    pub fn edit(&mut self, name: &str, description: &str) -> Result<(), CharacterError> {
        if self.is_builtin(name) {
            return Err(CharacterError::Protected(name.to_string()));
        }
        if !self.custom.contains_key(name) {
            return Err(CharacterError::NotFound(name.to_string()));
        }
        let description = normalize_description(description)?;
        self.custom.insert(name.to_string(), description);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<(), CharacterError> {
        if self.is_builtin(name) {
            return Err(CharacterError::Protected(name.to_string()));
        }
        self.custom
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CharacterError::NotFound(name.to_string()))
    }
}

fn normalize_description(description: &str) -> Result<String, CharacterError> {
    let description = description.replace("\\n", "\n");
    if description.trim().is_empty() {
        return Err(CharacterError::EmptyDescription);
    }
    Ok(description)
}

/// Name → description pairs; non-string values are skipped.
fn parse_map(content: &str) -> BTreeMap<String, String> {
    match serde_json::from_str::<BTreeMap<String, Value>>(content) {
        Ok(map) => map
            .into_iter()
            .filter_map(|(name, value)| value.as_str().map(|d| (name, d.to_string())))
            .collect(),
        Err(e) => {
            warn!(error = %e, "Failed to parse character list");
            BTreeMap::new()
        }
    }
}
