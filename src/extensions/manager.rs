//! Extension manager - owns every extension instance.
//!
//! The ExtensionManager is responsible for:
//! - Scanning the extensions directory and registering manifests
//! - Activating extensions and tracking the activated list
//! - Routing UI and player events to the right extension queue
//! - Shutting every extension down before it goes away

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::command::{Command, WidgetId};
use super::dialog::DialogHost;
use super::error::{ExtensionError, ExtensionResult};
use super::input::InputItem;
use super::instance::{DeactivateOutcome, Extension, ExtensionInner, ExtensionStatus};
use super::manifest::ExtensionManifest;
use super::queue::PushOutcome;
use super::script::{MenuEntry, ScriptEngine};
use super::timer::TimerService;

/// Configuration for the extension manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Directory containing extensions.
    pub extensions_dir: PathBuf,

    /// How long a script may run without checking in.
    pub watchdog_period: Duration,

    /// How often the kill confirmation dialog is polled.
    pub watchdog_poll: Duration,

    /// Budget for the synchronous menu query.
    pub menu_timeout: Duration,

    /// How long shutdown waits for a killed worker before warning about it.
    pub kill_grace: Duration,

    /// Leave killed workers that outlive `kill_grace` running instead of
    /// waiting for them. Only safe if the script engine outlives the manager.
    pub detach_killed_workers: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            extensions_dir: default_extensions_dir(),
            watchdog_period: Duration::from_secs(10),
            watchdog_poll: Duration::from_millis(100),
            menu_timeout: Duration::from_millis(16),
            kill_grace: Duration::from_millis(500),
            detach_killed_workers: false,
        }
    }
}

fn default_extensions_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("nova").join("extensions"))
        .unwrap_or_else(|| PathBuf::from("~/.nova/extensions"))
}

/// State shared between the manager and its extension instances.
pub(crate) struct Runtime {
    pub(crate) config: ManagerConfig,
    pub(crate) engine: Arc<dyn ScriptEngine>,
    pub(crate) dialogs: Arc<dyn DialogHost>,
    pub(crate) timers: TimerService,
    /// The manager lock: list membership only.
    activated: Mutex<Vec<Extension>>,
    /// Makes every worker spawn fail.
    #[cfg(test)]
    pub(crate) fail_spawn: std::sync::atomic::AtomicBool,
}

impl Runtime {
    pub(crate) fn remove_activated(&self, ext: &Arc<ExtensionInner>) {
        let mut activated = self.activated.lock();
        match activated.iter().position(|e| Arc::ptr_eq(e.inner(), ext)) {
            Some(index) => {
                activated.remove(index);
            }
            None => {
                warn!(extension = %ext.manifest().name(), "redundant removal from the activated list");
            }
        }
    }
}

/// The extension manager owns all extension instances.
pub struct ExtensionManager {
    runtime: Arc<Runtime>,

    /// Registered extensions, in registration order.
    extensions: Vec<Extension>,
}

impl ExtensionManager {
    /// Create a new extension manager and scan the extensions directory.
    pub fn new(
        config: ManagerConfig,
        engine: Arc<dyn ScriptEngine>,
        dialogs: Arc<dyn DialogHost>,
    ) -> ExtensionResult<Self> {
        let timers = TimerService::start()?;

        let mut manager = Self {
            runtime: Arc::new(Runtime {
                config,
                engine,
                dialogs,
                timers,
                activated: Mutex::new(Vec::new()),
                #[cfg(test)]
                fail_spawn: std::sync::atomic::AtomicBool::new(false),
            }),
            extensions: Vec::new(),
        };

        manager.scan_extensions()?;
        Ok(manager)
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.runtime.config
    }

    /// Scan the extensions directory and register every new manifest.
    ///
    /// Returns the number of extensions added.
    pub fn scan_extensions(&mut self) -> ExtensionResult<usize> {
        let extensions_dir = self.runtime.config.extensions_dir.clone();

        if !extensions_dir.exists() {
            // No extensions directory - that's fine, just no extensions
            return Ok(0);
        }

        let mut added = 0;
        for entry in std::fs::read_dir(&extensions_dir)?.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            match ExtensionManifest::load(&path) {
                Ok(manifest) => {
                    if self.get(manifest.name()).is_some() {
                        debug!(extension = %manifest.name(), "already registered, skipping");
                        continue;
                    }
                    match self.register(manifest) {
                        Ok(_) => added += 1,
                        Err(e) => warn!(path = %path.display(), error = %e, "invalid extension"),
                    }
                }
                Err(ExtensionError::ManifestNotFound(_)) => {
                    // Not an extension directory, skip
                    continue;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load extension");
                    continue;
                }
            }
        }

        info!(dir = %extensions_dir.display(), added, "scanned extensions");
        Ok(added)
    }

    /// Register one extension.
    pub fn register(&mut self, manifest: ExtensionManifest) -> ExtensionResult<Extension> {
        manifest.validate()?;

        if self.get(manifest.name()).is_some() {
            warn!(extension = %manifest.name(), "duplicate extension name");
            return Err(ExtensionError::DuplicateExtension(manifest.name().to_string()));
        }

        let ext = Extension::new(ExtensionInner::new(manifest, Arc::clone(&self.runtime)));
        debug!(extension = %ext.name(), "registered extension");
        self.extensions.push(ext.clone());
        Ok(ext)
    }

    /// Replace a finished instance with a fresh one, so it can be activated
    /// again.
    pub fn reload(&mut self, ext: &Extension) -> ExtensionResult<Extension> {
        let index = self
            .extensions
            .iter()
            .position(|e| e == ext)
            .ok_or_else(|| ExtensionError::ExtensionNotFound(ext.name().to_string()))?;

        if self.is_activated(ext) {
            return Err(ExtensionError::AlreadyActive(ext.name().to_string()));
        }
        if !ext.inner().is_terminated() {
            return Err(ExtensionError::Busy(ext.name().to_string()));
        }
        let config = &self.runtime.config;
        ext.inner().join_worker(config.kill_grace, config.detach_killed_workers);

        let fresh = Extension::new(ExtensionInner::new(
            ext.manifest().clone(),
            Arc::clone(&self.runtime),
        ));
        self.extensions[index] = fresh.clone();
        Ok(fresh)
    }

    pub fn get(&self, name: &str) -> Option<Extension> {
        self.extensions.iter().find(|e| e.name() == name).cloned()
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// Snapshot of the activated list.
    pub fn activated(&self) -> Vec<Extension> {
        self.runtime.activated.lock().clone()
    }

    pub fn is_activated(&self, ext: &Extension) -> bool {
        self.runtime.activated.lock().contains(ext)
    }

    pub fn has_menu(&self, ext: &Extension) -> bool {
        ext.capabilities().menu
    }

    pub fn is_trigger_only(&self, ext: &Extension) -> bool {
        ext.capabilities().trigger_only
    }

    pub fn status(&self, ext: &Extension) -> ExtensionStatus {
        ext.status()
    }

    /// Start an extension's worker and queue its `activate()`.
    ///
    /// Activation itself happens asynchronously; a failing `activate()`
    /// deactivates the extension again.
    pub fn activate(&self, ext: &Extension) -> ExtensionResult<()> {
        if ext.capabilities().trigger_only {
            return Err(ExtensionError::Unsupported {
                extension: ext.name().to_string(),
                what: "activation",
            });
        }

        let mut activated = self.runtime.activated.lock();
        if activated.contains(ext) {
            return Err(ExtensionError::AlreadyActive(ext.name().to_string()));
        }

        activated.push(ext.clone());
        if let Err(e) = ext.inner().start() {
            activated.retain(|e| e != ext);
            return Err(e);
        }

        info!(extension = %ext.name(), "activating extension");
        Ok(())
    }

    /// Queue a polite deactivation, or kill the extension if the user is
    /// currently being asked whether it should be killed.
    pub fn deactivate(&self, ext: &Extension) -> ExtensionResult<DeactivateOutcome> {
        ext.inner().request_deactivation(true)
    }

    /// Run a trigger-only extension synchronously on the calling thread.
    pub fn trigger(&self, ext: &Extension) -> ExtensionResult<Value> {
        ext.inner().trigger()
    }

    pub fn trigger_menu_async(&self, ext: &Extension, id: u16) -> ExtensionResult<PushOutcome> {
        if !ext.capabilities().menu {
            return Err(ExtensionError::Unsupported {
                extension: ext.name().to_string(),
                what: "menu",
            });
        }
        ext.inner().enqueue(Command::TriggerMenu(id), true)
    }

    /// A widget of the extension's dialog was clicked.
    pub fn widget_clicked(
        &self,
        ext: &Extension,
        widget: WidgetId,
    ) -> ExtensionResult<PushOutcome> {
        ext.inner().enqueue(Command::Click(widget), true)
    }

    /// The extension's dialog was closed by the user.
    pub fn dialog_closed(&self, ext: &Extension) -> ExtensionResult<PushOutcome> {
        ext.inner().enqueue(Command::Close, true)
    }

    pub fn notify_input_changed(
        &self,
        ext: &Extension,
        item: Option<InputItem>,
    ) -> ExtensionResult<PushOutcome> {
        ext.inner().set_input(item)
    }

    pub fn notify_meta_changed(&self, ext: &Extension) -> ExtensionResult<PushOutcome> {
        if !ext.capabilities().meta_listener {
            return Ok(PushOutcome::Suppressed);
        }
        ext.inner().notify(Command::MetaChanged, true)
    }

    pub fn notify_playing_changed(
        &self,
        ext: &Extension,
        status: i32,
    ) -> ExtensionResult<PushOutcome> {
        if !ext.capabilities().playing_listener {
            return Ok(PushOutcome::Suppressed);
        }
        ext.inner().notify(Command::PlayingChanged(status), false)
    }

    /// Ask the script for its menu, on the calling thread.
    ///
    /// Fails with `Busy` rather than wait past the configured menu timeout.
    pub fn get_menu_entries(&self, ext: &Extension) -> ExtensionResult<Vec<MenuEntry>> {
        ext.inner().menu_entries()
    }

    /// Deactivate everything and wait for all worker threads.
    pub fn shutdown_all(&self) {
        for ext in self.activated() {
            match ext.inner().request_deactivation(true) {
                Ok(outcome) => debug!(extension = %ext.name(), ?outcome, "shutting down"),
                Err(e) if e.is_protocol_violation() => {}
                Err(e) => {
                    warn!(extension = %ext.name(), error = %e, "cannot queue deactivation");
                    ext.inner().kill("deactivation could not be queued");
                }
            }
        }

        let grace = self.runtime.config.kill_grace;
        let detach = self.runtime.config.detach_killed_workers;
        for ext in &self.extensions {
            ext.inner().join_worker(grace, detach);
        }
    }
}

impl Drop for ExtensionManager {
    fn drop(&mut self) {
        self.shutdown_all();
        self.runtime.timers.shutdown();
    }
}
