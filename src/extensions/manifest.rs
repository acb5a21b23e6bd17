//! Extension manifest parsing.
//!
//! Each extension directory carries an `extension.toml` manifest that defines:
//! - Extension metadata (name, title, version, etc.)
//! - Capabilities (menu, trigger-only, which host events it listens to)

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ExtensionError, ExtensionResult};

/// File name of the manifest inside an extension directory.
pub const MANIFEST_FILE: &str = "extension.toml";

/// Complete extension manifest parsed from `extension.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub extension: ExtensionMeta,

    #[serde(default)]
    pub capabilities: Capabilities,
}

impl ExtensionManifest {
    /// Build a manifest in code, mostly useful for embedders and tests.
    pub fn new(name: &str, title: &str, capabilities: Capabilities) -> Self {
        Self {
            extension: ExtensionMeta {
                name: name.to_string(),
                title: title.to_string(),
                version: "1.0.0".to_string(),
                author: None,
                description: String::new(),
                shortdesc: None,
                url: None,
            },
            capabilities,
        }
    }

    /// Load manifest from a directory containing `extension.toml`.
    pub fn load(extension_dir: &Path) -> ExtensionResult<Self> {
        let manifest_path = extension_dir.join(MANIFEST_FILE);

        if !manifest_path.exists() {
            return Err(ExtensionError::ManifestNotFound(
                extension_dir.to_path_buf(),
            ));
        }

        let content = std::fs::read_to_string(&manifest_path)?;

        toml::from_str(&content).map_err(|e| ExtensionError::ManifestInvalid {
            path: manifest_path,
            message: e.to_string(),
        })
    }

    /// Validate the manifest for required fields.
    pub fn validate(&self) -> ExtensionResult<()> {
        let required = [
            ("extension.name", &self.extension.name),
            ("extension.title", &self.extension.title),
            ("extension.version", &self.extension.version),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ExtensionError::ManifestInvalid {
                    path: MANIFEST_FILE.into(),
                    message: format!("{} is required", field),
                });
            }
        }

        if self.capabilities.trigger_only && self.capabilities.menu {
            return Err(ExtensionError::ManifestInvalid {
                path: MANIFEST_FILE.into(),
                message: "a trigger-only extension cannot provide a menu".to_string(),
            });
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.extension.name
    }

    pub fn title(&self) -> &str {
        &self.extension.title
    }
}

/// Extension metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionMeta {
    /// Unique identifier.
    pub name: String,

    /// Human-readable display name, used in dialogs.
    pub title: String,

    /// Version string.
    pub version: String,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub description: String,

    /// One-line description for menus.
    #[serde(default)]
    pub shortdesc: Option<String>,

    #[serde(default)]
    pub url: Option<String>,
}

/// What an extension's script implements.
///
/// Host notifications are only forwarded to scripts that listen for them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Capabilities {
    /// Script implements `menu()` and `trigger_menu(id)`.
    pub menu: bool,

    /// Script is run once through `trigger()` and never activated.
    pub trigger_only: bool,

    /// Script implements `input_changed()`.
    pub input_listener: bool,

    /// Script implements `meta_changed()`.
    pub meta_listener: bool,

    /// Script implements `playing_changed(status)`.
    pub playing_listener: bool,
}

impl Capabilities {
    /// Short labels for display.
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.menu {
            labels.push("menu");
        }
        if self.trigger_only {
            labels.push("trigger-only");
        }
        if self.input_listener {
            labels.push("input-listener");
        }
        if self.meta_listener {
            labels.push("meta-listener");
        }
        if self.playing_listener {
            labels.push("playing-listener");
        }
        labels
    }
}
