//! `nova-ext validate`.

use std::path::Path;

use anyhow::{bail, Result};
use console::style;

use crate::extensions::{ExtensionManifest, MANIFEST_FILE};

/// Load and validate the manifest in `path`.
pub fn check(path: &Path) -> Result<ExtensionManifest> {
    if !path.join(MANIFEST_FILE).exists() {
        bail!(
            "Not a valid extension: {} (missing {})",
            path.display(),
            MANIFEST_FILE
        );
    }

    let manifest = ExtensionManifest::load(path)
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", MANIFEST_FILE, e))?;
    manifest
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid manifest: {}", e))?;
    Ok(manifest)
}

pub fn run_validate(path: &Path) -> Result<()> {
    let manifest = check(path)?;

    println!(
        "{} {} {}",
        style("✓").green().bold(),
        style(manifest.name()).cyan().bold(),
        style(format!("v{}", manifest.extension.version)).dim()
    );
    let caps = manifest.capabilities.labels();
    if caps.is_empty() {
        println!("  capabilities: {}", style("none").dim());
    } else {
        println!("  capabilities: {}", caps.join(", "));
    }
    Ok(())
}
