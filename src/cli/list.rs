//! `nova-ext list`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;

use crate::config::RuntimeConfig;
use crate::extensions::{
    ExtensionManager, ExtensionManifest, Interpreter, ManagerConfig, NoDialogs, ScriptEngine,
    ScriptError,
};

/// The CLI only reads manifests; nothing is ever run.
struct NoEngine;

impl ScriptEngine for NoEngine {
    fn create_interpreter(
        &self,
        manifest: &ExtensionManifest,
    ) -> Result<Box<dyn Interpreter>, ScriptError> {
        Err(ScriptError::InterpreterUnavailable(format!(
            "no script engine available to run '{}'",
            manifest.name()
        )))
    }
}

/// Scan `dir` (or the configured directory) and return the manifests found.
pub fn scan(config: &RuntimeConfig, dir: Option<PathBuf>) -> Result<Vec<ExtensionManifest>> {
    let mut manager_config = ManagerConfig::from(config);
    if let Some(dir) = dir {
        manager_config.extensions_dir = dir;
    }
    let extensions_dir = manager_config.extensions_dir.clone();

    let manager = ExtensionManager::new(manager_config, Arc::new(NoEngine), Arc::new(NoDialogs))
        .with_context(|| format!("Failed to scan {}", extensions_dir.display()))?;

    let mut manifests: Vec<ExtensionManifest> = manager
        .extensions()
        .iter()
        .map(|ext| ext.manifest().clone())
        .collect();
    manifests.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(manifests)
}

pub fn run_list(config: &RuntimeConfig, dir: Option<PathBuf>) -> Result<()> {
    let manifests = scan(config, dir)?;

    if manifests.is_empty() {
        println!("{}", style("No extensions installed").dim());
        return Ok(());
    }

    for manifest in &manifests {
        let caps = manifest.capabilities.labels();
        println!(
            "{} {} {}",
            style(manifest.name()).cyan().bold(),
            style(format!("v{}", manifest.extension.version)).dim(),
            manifest.title()
        );
        if !caps.is_empty() {
            println!("    {}", style(caps.join(", ")).dim());
        }
    }

    println!();
    println!("{} extension(s)", manifests.len());
    Ok(())
}
