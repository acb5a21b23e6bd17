//! Fakes for driving the runtime in tests.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde_json::Value;

use super::command::WidgetId;
use super::dialog::{DialogHost, DialogId};
use super::error::ScriptError;
use super::input::PlayableItem;
use super::manager::ManagerConfig;
use super::manifest::{Capabilities, ExtensionManifest};
use super::script::{EntryPoint, Interpreter, ScriptContext, ScriptEngine};

/// How the fake script behaves.
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    pub fail_create: bool,
    pub fail_activate: bool,
    /// Entry point (by call label) that blocks until the gate opens.
    pub hang_on: Option<&'static str>,
    /// Keep hanging even after cancellation.
    pub ignore_cancel: bool,
    /// Widgets bound during `activate`.
    pub widgets: Vec<(WidgetId, &'static str)>,
    pub menu: Option<Value>,
    /// Entry point that asks for its own deactivation.
    pub deactivate_on: Option<&'static str>,
    pub panic_on: Option<&'static str>,
    /// Entry point that checks in with the watchdog.
    pub keep_alive_on: Option<&'static str>,
    /// Sleep inside every call.
    pub delay: Option<Duration>,
}

#[derive(Default)]
pub(crate) struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    pub fn open(&self) {
        *self.open.lock() = true;
        self.opened.notify_all();
    }

    fn wait(&self, timeout: Duration) -> bool {
        let mut open = self.open.lock();
        if !*open {
            self.opened.wait_for(&mut open, timeout);
        }
        *open
    }
}

/// Script engine that records every call it receives.
pub(crate) struct FakeEngine {
    script: Mutex<Script>,
    calls: Arc<Mutex<Vec<String>>>,
    gate: Arc<Gate>,
    created: AtomicUsize,
    destroyed: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            calls: Arc::new(Mutex::new(Vec::new())),
            gate: Arc::new(Gate::default()),
            created: AtomicUsize::new(0),
            destroyed: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock() = script;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, label: &str) -> usize {
        self.calls.lock().iter().filter(|call| *call == label).count()
    }

    /// Let every hanging call return.
    pub fn release(&self) {
        self.gate.open();
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl ScriptEngine for FakeEngine {
    fn create_interpreter(
        &self,
        manifest: &ExtensionManifest,
    ) -> Result<Box<dyn Interpreter>, ScriptError> {
        let script = self.script.lock().clone();
        if script.fail_create {
            return Err(ScriptError::InterpreterUnavailable(format!(
                "{}: out of memory",
                manifest.name()
            )));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeInterpreter {
            script,
            calls: Arc::clone(&self.calls),
            gate: Arc::clone(&self.gate),
            destroyed: Arc::clone(&self.destroyed),
        }))
    }
}

struct FakeInterpreter {
    script: Script,
    calls: Arc<Mutex<Vec<String>>>,
    gate: Arc<Gate>,
    destroyed: Arc<AtomicUsize>,
}

impl Drop for FakeInterpreter {
    fn drop(&mut self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

/// `click(7)`, `playing_changed(3)`, `activate`, ...
pub(crate) fn call_label(entry: &EntryPoint) -> String {
    match entry {
        EntryPoint::Click { widget, callback } => format!("{}({})", callback, widget.0),
        EntryPoint::PlayingChanged(status) => format!("playing_changed({})", status),
        EntryPoint::TriggerMenu(id) => format!("trigger_menu({})", id),
        other => other.name().to_string(),
    }
}

impl Interpreter for FakeInterpreter {
    fn call(
        &mut self,
        entry: &EntryPoint,
        ctx: &mut ScriptContext<'_>,
    ) -> Result<Value, ScriptError> {
        let label = call_label(entry);
        self.calls.lock().push(label.clone());

        if self.script.panic_on == Some(label.as_str()) {
            panic!("script engine blew up in {}", label);
        }
        if let Some(delay) = self.script.delay {
            thread::sleep(delay);
        }
        if *entry == EntryPoint::Activate {
            for (widget, callback) in &self.script.widgets {
                ctx.bind_widget(*widget, *callback);
            }
            if self.script.fail_activate {
                return Err(ScriptError::Raised {
                    entry: label,
                    message: "attempt to call a nil value".to_string(),
                });
            }
        }
        if self.script.keep_alive_on == Some(label.as_str()) {
            ctx.keep_alive();
        }
        if self.script.deactivate_on == Some(label.as_str()) {
            ctx.request_deactivate();
        }
        if self.script.hang_on == Some(label.as_str()) {
            while !self.gate.wait(Duration::from_millis(5)) {
                if ctx.is_cancelled() && !self.script.ignore_cancel {
                    return Err(ScriptError::Cancelled);
                }
            }
        }
        if *entry == EntryPoint::Menu {
            return self
                .script
                .menu
                .clone()
                .ok_or_else(|| ScriptError::MissingEntryPoint("menu".to_string()));
        }
        Ok(Value::Null)
    }
}

/// Dialog host whose user can be told to press the confirm button.
#[derive(Default)]
pub(crate) struct FakeDialogs {
    next: AtomicU64,
    shown: Mutex<Vec<DialogId>>,
    released: Mutex<HashSet<DialogId>>,
    confirmed: AtomicBool,
    refuse: bool,
}

impl FakeDialogs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A host that can never display anything.
    pub fn refusing() -> Arc<Self> {
        Arc::new(Self {
            refuse: true,
            ..Self::default()
        })
    }

    /// The user presses "Yes" on every dialog from now on.
    pub fn confirm(&self) {
        self.confirmed.store(true, Ordering::SeqCst);
    }

    pub fn shown(&self) -> usize {
        self.shown.lock().len()
    }

    pub fn released(&self) -> usize {
        self.released.lock().len()
    }

    pub fn showing(&self) -> usize {
        let released = self.released.lock();
        self.shown
            .lock()
            .iter()
            .filter(|id| !released.contains(id))
            .count()
    }
}

impl DialogHost for FakeDialogs {
    fn show_progress(
        &self,
        _title: &str,
        _message: &str,
        _confirm_label: &str,
    ) -> Option<DialogId> {
        if self.refuse {
            return None;
        }
        let id = DialogId(self.next.fetch_add(1, Ordering::SeqCst));
        self.shown.lock().push(id);
        Some(id)
    }

    fn is_cancelled(&self, id: DialogId) -> bool {
        self.confirmed.load(Ordering::SeqCst) && !self.released.lock().contains(&id)
    }

    fn release(&self, id: DialogId) {
        self.released.lock().insert(id);
    }
}

pub(crate) struct FakeItem {
    pub uri: String,
}

impl FakeItem {
    pub fn new(uri: &str) -> Arc<Self> {
        Arc::new(Self {
            uri: uri.to_string(),
        })
    }
}

impl PlayableItem for FakeItem {
    fn uri(&self) -> &str {
        &self.uri
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub(crate) fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
}

pub(crate) fn manifest(name: &str, capabilities: Capabilities) -> ExtensionManifest {
    ExtensionManifest::new(name, &format!("{} Extension", name), capabilities)
}

/// Fast timings, no extensions directory.
pub(crate) fn config(watchdog_period: Duration) -> ManagerConfig {
    ManagerConfig {
        extensions_dir: PathBuf::from("/nonexistent/nova-ext-tests"),
        watchdog_period,
        watchdog_poll: Duration::from_millis(10),
        menu_timeout: Duration::from_millis(50),
        kill_grace: Duration::from_millis(200),
        detach_killed_workers: false,
    }
}
