//! A running extension: its command queue, worker thread and kill protocol.
//!
//! Locking rules:
//! - `state` guards the queue and every flag below; it is held only briefly.
//! - `script` serialises access to the interpreter. The worker holds it for
//!   the whole script call, with `state` released.
//! - Never block on `script` while holding `state` (kill only `try_lock`s
//!   it). Taking `state` while holding `script` is fine.
//! - The manager's activated-list lock is only ever taken with no instance
//!   lock held, or outside them.

use std::any::Any;
use std::fmt;
use std::io;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::command::Command;
use super::dialog::{kill_dialog_message, DialogId, KILL_DIALOG_CONFIRM, KILL_DIALOG_TITLE};
use super::error::{ExtensionError, ExtensionResult, ScriptError};
use super::input::{DisplayItem, InputItem};
use super::manager::Runtime;
use super::manifest::{Capabilities, ExtensionManifest};
use super::queue::{CommandQueue, PushOutcome};
use super::script::{parse_menu, EntryPoint, Interpreter, MenuEntry, ScriptContext, WidgetRegistry};
use super::watchdog::{Watchdog, WatchdogState};

/// Floor for the "still waiting on a killed worker" warning.
const MIN_KILL_WARN_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle of an extension's worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerPhase {
    /// Never started.
    #[default]
    Idle,
    /// Dequeuing and executing commands.
    Running,
    /// Exiting; whatever is left in the queue is consumed without running.
    Draining,
    /// Thread has returned.
    Terminated,
}

/// Result of a deactivation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeactivateOutcome {
    /// A `Deactivate` command was queued.
    Queued,
    /// A `Deactivate` command was already pending.
    AlreadyQueued,
    /// The extension was unresponsive and got terminated on the spot.
    Killed,
}

/// Point-in-time view of an extension, for UIs and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionStatus {
    pub activated: bool,
    pub exiting: bool,
    pub killed: bool,
    pub phase: WorkerPhase,
    pub watchdog: WatchdogState,
    pub kill_dialog_shown: bool,
    /// Command the worker is executing right now.
    pub running: Option<Command>,
    pub queued: usize,
    pub executed: u64,
    pub discarded: u64,
    pub thread_running: bool,
    pub last_error: Option<String>,
}

pub(crate) struct InstanceState {
    queue: CommandQueue,
    activated: bool,
    exiting: bool,
    killed: bool,
    /// Member of the manager's activated list. Whoever clears this performs
    /// the removal, so it happens once.
    listed: bool,
    phase: WorkerPhase,
    running: Option<Command>,
    current_input: Option<InputItem>,
    pending_kill_dialog: Option<DialogId>,
    watchdog: Watchdog,
    thread_running: bool,
    cancel: Arc<AtomicBool>,
    executed: u64,
    discarded: u64,
    last_error: Option<String>,
}

impl InstanceState {
    fn new() -> Self {
        Self {
            queue: CommandQueue::new(),
            activated: false,
            exiting: false,
            killed: false,
            listed: false,
            phase: WorkerPhase::Idle,
            running: None,
            current_input: None,
            pending_kill_dialog: None,
            watchdog: Watchdog::new(),
            thread_running: false,
            cancel: Arc::new(AtomicBool::new(false)),
            executed: 0,
            discarded: 0,
            last_error: None,
        }
    }

    fn shutting_down(&self) -> bool {
        self.running == Some(Command::Deactivate) || self.queue.has_deactivate()
    }
}

#[derive(Default)]
struct ScriptSlot {
    interpreter: Option<Box<dyn Interpreter>>,
    widgets: WidgetRegistry,
}

impl ScriptSlot {
    fn destroy(&mut self) {
        self.interpreter = None;
        self.widgets.clear();
    }
}

struct KillOutcome {
    was_activated: bool,
    listed: bool,
}

pub(crate) struct ExtensionInner {
    manifest: ExtensionManifest,
    runtime: Arc<Runtime>,
    state: Mutex<InstanceState>,
    /// Signalled when work is queued or the instance starts exiting.
    work: Condvar,
    /// Signalled when the worker terminates or the instance is killed.
    exited: Condvar,
    script: Mutex<ScriptSlot>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ExtensionInner {
    pub(crate) fn new(manifest: ExtensionManifest, runtime: Arc<Runtime>) -> Arc<Self> {
        Arc::new(Self {
            manifest,
            runtime,
            state: Mutex::new(InstanceState::new()),
            work: Condvar::new(),
            exited: Condvar::new(),
            script: Mutex::new(ScriptSlot::default()),
            worker: Mutex::new(None),
        })
    }

    pub(crate) fn manifest(&self) -> &ExtensionManifest {
        &self.manifest
    }

    fn name(&self) -> &str {
        self.manifest.name()
    }

    fn capabilities(&self) -> Capabilities {
        self.manifest.capabilities
    }

    // Activation

    /// Queue `Activate` and spawn the worker.
    ///
    /// Called by the manager with the activated-list lock held, after the
    /// instance was added to the list.
    pub(crate) fn start(self: &Arc<Self>) -> ExtensionResult<()> {
        {
            let mut state = self.state.lock();
            if state.exiting {
                return Err(ExtensionError::AlreadyExiting(self.name().to_string()));
            }
            if state.thread_running || state.listed {
                return Err(ExtensionError::AlreadyActive(self.name().to_string()));
            }

            state.queue.push(Command::Activate)?;
            state.listed = true;
            state.thread_running = true;
            self.arm_watchdog(&mut state);
        }

        match self.spawn_worker() {
            Ok(handle) => {
                *self.worker.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                error!(extension = %self.name(), error = %e, "cannot start worker thread");
                let mut state = self.state.lock();
                state.thread_running = false;
                state.listed = false;
                state.exiting = true;
                state.phase = WorkerPhase::Terminated;
                let dropped = state.queue.drain();
                state.discarded += dropped as u64;
                state.watchdog.disarm(&self.runtime.timers);
                Err(ExtensionError::Resource(format!(
                    "cannot start worker for '{}': {}",
                    self.name(),
                    e
                )))
            }
        }
    }

    fn spawn_worker(self: &Arc<Self>) -> io::Result<JoinHandle<()>> {
        #[cfg(test)]
        if self.runtime.fail_spawn.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "thread limit reached"));
        }

        let worker = Arc::clone(self);
        thread::Builder::new()
            .name(format!("ext-{}", self.name()))
            .spawn(move || worker.run())
    }

    // Worker loop

    fn run(self: Arc<Self>) {
        let cancel = {
            let mut state = self.state.lock();
            state.phase = WorkerPhase::Running;
            Arc::clone(&state.cancel)
        };
        debug!(extension = %self.name(), "worker started");

        while let Some(command) = self.next_command() {
            self.check_in();
            let executed = self.execute(command, &cancel);
            self.check_out(executed);
        }

        self.script.lock().destroy();

        let mut state = self.state.lock();
        state.phase = WorkerPhase::Terminated;
        state.thread_running = false;
        state.watchdog.disarm(&self.runtime.timers);
        if let Some(id) = state.pending_kill_dialog.take() {
            self.runtime.dialogs.release(id);
        }
        self.exited.notify_all();
        debug!(extension = %self.name(), "worker terminated");
    }

    /// The worker's only blocking point.
    fn next_command(&self) -> Option<Command> {
        let mut state = self.state.lock();
        loop {
            if let Some(command) = state.queue.pop() {
                if state.exiting {
                    state.phase = WorkerPhase::Draining;
                }
                state.running = Some(command.clone());
                return Some(command);
            }
            if state.exiting {
                state.phase = WorkerPhase::Draining;
                return None;
            }
            self.work.wait(&mut state);
        }
    }

    fn check_in(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if !state.killed {
            self.arm_watchdog(&mut state);
        }
    }

    fn check_out(self: &Arc<Self>, executed: bool) {
        let mut state = self.state.lock();
        state.running = None;
        if executed {
            state.executed += 1;
        } else {
            state.discarded += 1;
        }
        // The script returned, so any kill question is moot.
        if let Some(id) = state.pending_kill_dialog.take() {
            self.runtime.dialogs.release(id);
        }
        if state.killed {
            return;
        }
        if state.queue.is_empty() {
            state.watchdog.disarm(&self.runtime.timers);
        } else {
            self.arm_watchdog(&mut state);
        }
    }

    /// Returns false when the command was discarded instead of run.
    fn execute(self: &Arc<Self>, command: Command, cancel: &Arc<AtomicBool>) -> bool {
        match command {
            Command::Activate => self.run_activate(cancel),
            Command::Deactivate => self.run_deactivate(cancel),
            other => self.dispatch(other, cancel),
        }
    }

    fn run_activate(self: &Arc<Self>, cancel: &Arc<AtomicBool>) -> bool {
        let mut slot = self.script.lock();

        match self.runtime.engine.create_interpreter(&self.manifest) {
            Ok(interpreter) => {
                slot.widgets.clear();
                slot.interpreter = Some(interpreter);
            }
            Err(e) => {
                drop(slot);
                self.activation_failed(e);
                return true;
            }
        }

        match self.call_entry(&mut slot, &EntryPoint::Activate, cancel) {
            Ok(_) => {
                drop(slot);
                let mut state = self.state.lock();
                if !state.exiting {
                    state.activated = true;
                    info!(extension = %self.name(), "extension activated");
                }
            }
            Err(e) => {
                slot.destroy();
                drop(slot);
                self.activation_failed(e);
            }
        }
        true
    }

    fn activation_failed(self: &Arc<Self>, err: ScriptError) {
        let listed = {
            let mut state = self.state.lock();
            if state.killed {
                debug!(extension = %self.name(), error = %err, "activation interrupted by kill");
                return;
            }
            error!(extension = %self.name(), error = %err, "activation failed, deactivating");
            state.last_error = Some(err.to_string());
            self.retire(&mut state)
        };
        self.unlist(listed);
    }

    fn run_deactivate(self: &Arc<Self>, cancel: &Arc<AtomicBool>) -> bool {
        let was_activated = {
            let mut state = self.state.lock();
            state.current_input = None;
            state.activated
        };

        {
            let mut slot = self.script.lock();
            if was_activated && slot.interpreter.is_some() {
                if let Err(e) = self.call_entry(&mut slot, &EntryPoint::Deactivate, cancel) {
                    warn!(extension = %self.name(), error = %e, "deactivate() failed");
                }
            }
            slot.destroy();
        }

        let listed = {
            let mut state = self.state.lock();
            self.retire(&mut state)
        };
        self.unlist(listed);
        info!(extension = %self.name(), "extension deactivated");
        true
    }

    fn dispatch(self: &Arc<Self>, command: Command, cancel: &Arc<AtomicBool>) -> bool {
        let mut slot = self.script.lock();
        if slot.interpreter.is_none() {
            debug!(extension = %self.name(), command = %command, "no interpreter state, discarding");
            return false;
        }

        let entry = match command {
            Command::Activate => EntryPoint::Activate,
            Command::Deactivate => EntryPoint::Deactivate,
            Command::Close => EntryPoint::Close,
            Command::Click(widget) => match slot.widgets.resolve(widget) {
                Some(callback) => EntryPoint::Click {
                    widget,
                    callback: callback.to_string(),
                },
                None => {
                    warn!(extension = %self.name(), widget = %widget, "click on a widget without callback");
                    return true;
                }
            },
            Command::TriggerMenu(id) => EntryPoint::TriggerMenu(id),
            Command::SetInput => EntryPoint::InputChanged,
            Command::MetaChanged => EntryPoint::MetaChanged,
            Command::PlayingChanged(status) => EntryPoint::PlayingChanged(status),
        };

        if let Err(e) = self.call_entry(&mut slot, &entry, cancel) {
            drop(slot);
            warn!(extension = %self.name(), entry = entry.name(), error = %e, "script error");
            self.state.lock().last_error = Some(e.to_string());
        }
        true
    }

    fn call_entry(
        self: &Arc<Self>,
        slot: &mut ScriptSlot,
        entry: &EntryPoint,
        cancel: &Arc<AtomicBool>,
    ) -> Result<Value, ScriptError> {
        let ScriptSlot {
            interpreter,
            widgets,
        } = slot;
        let interpreter = interpreter.as_mut().ok_or_else(|| {
            ScriptError::InterpreterUnavailable("interpreter state was destroyed".to_string())
        })?;
        let mut ctx = ScriptContext::new(self, widgets, Arc::clone(cancel));
        invoke(interpreter.as_mut(), entry, &mut ctx)
    }

    /// Mark the instance as done. Returns whether the caller must remove it
    /// from the activated list.
    fn retire(&self, state: &mut InstanceState) -> bool {
        state.activated = false;
        state.exiting = true;
        state.current_input = None;
        self.work.notify_all();
        mem::replace(&mut state.listed, false)
    }

    fn unlist(self: &Arc<Self>, listed: bool) {
        if listed {
            self.runtime.remove_activated(self);
        }
    }

    // Producers

    fn push_locked(
        &self,
        state: &mut InstanceState,
        command: Command,
        unique: bool,
    ) -> ExtensionResult<PushOutcome> {
        if state.exiting || state.shutting_down() {
            return Err(ExtensionError::AlreadyExiting(self.name().to_string()));
        }
        if !state.listed {
            return Err(ExtensionError::NotActivated(self.name().to_string()));
        }

        let outcome = if unique {
            state.queue.push_unique(command)?
        } else {
            state.queue.push(command)?;
            PushOutcome::Queued
        };
        if outcome == PushOutcome::Queued {
            self.work.notify_one();
        }
        Ok(outcome)
    }

    pub(crate) fn enqueue(&self, command: Command, unique: bool) -> ExtensionResult<PushOutcome> {
        let mut state = self.state.lock();
        self.push_locked(&mut state, command, unique)
    }

    /// Like `enqueue`, but an inactive or exiting extension silently ignores it.
    pub(crate) fn notify(&self, command: Command, unique: bool) -> ExtensionResult<PushOutcome> {
        match self.enqueue(command, unique) {
            Err(e) if e.is_protocol_violation() => Ok(PushOutcome::Suppressed),
            other => other,
        }
    }

    pub(crate) fn set_input(&self, item: Option<InputItem>) -> ExtensionResult<PushOutcome> {
        let mut state = self.state.lock();
        if state.exiting {
            return Ok(PushOutcome::Suppressed);
        }

        debug!(extension = %self.name(), input = %DisplayItem(&item), "input changed");
        // Replacing releases the previous item.
        state.current_input = item;

        if !self.capabilities().input_listener || !state.listed {
            return Ok(PushOutcome::Suppressed);
        }
        match self.push_locked(&mut state, Command::SetInput, true) {
            Err(e) if e.is_protocol_violation() => Ok(PushOutcome::Suppressed),
            other => other,
        }
    }

    pub(crate) fn current_input(&self) -> Option<InputItem> {
        self.state.lock().current_input.clone()
    }

    /// Deactivate politely, or kill right away if the user is already being
    /// asked whether to kill.
    pub(crate) fn request_deactivation(
        self: &Arc<Self>,
        allow_kill: bool,
    ) -> ExtensionResult<DeactivateOutcome> {
        let mut state = self.state.lock();
        if state.exiting {
            return Err(ExtensionError::AlreadyExiting(self.name().to_string()));
        }
        if !state.listed {
            return Err(ExtensionError::NotActivated(self.name().to_string()));
        }

        if allow_kill && state.pending_kill_dialog.is_some() {
            let outcome = self.kill_locked(&mut state, "deactivation requested while unresponsive");
            drop(state);
            self.finish_kill(outcome);
            return Ok(DeactivateOutcome::Killed);
        }

        if state.shutting_down() {
            return Ok(DeactivateOutcome::AlreadyQueued);
        }

        // Unstarted work is superseded; the running command finishes.
        let superseded = state.queue.drain();
        state.discarded += superseded as u64;
        state.queue.push(Command::Deactivate)?;
        self.work.notify_one();
        debug!(extension = %self.name(), superseded, "deactivation queued");
        Ok(DeactivateOutcome::Queued)
    }

    // Watchdog

    fn arm_watchdog(self: &Arc<Self>, state: &mut InstanceState) {
        let ext = Arc::downgrade(self);
        state.watchdog.arm(
            &self.runtime.timers,
            self.runtime.config.watchdog_period,
            move |generation| {
                if let Some(ext) = ext.upgrade() {
                    ext.watchdog_fired(generation);
                }
            },
        );
    }

    fn poll_watchdog(self: &Arc<Self>, state: &mut InstanceState) {
        let ext = Arc::downgrade(self);
        state.watchdog.poll(
            &self.runtime.timers,
            self.runtime.config.watchdog_poll,
            move |generation| {
                if let Some(ext) = ext.upgrade() {
                    ext.watchdog_fired(generation);
                }
            },
        );
    }

    /// Script-side check-in.
    pub(crate) fn keep_alive(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if let Some(id) = state.pending_kill_dialog.take() {
            self.runtime.dialogs.release(id);
        }
        // The deadline only covers a command in flight; a check-in from the
        // menu fast path must not arm an idle worker.
        if state.killed || !state.thread_running || state.running.is_none() {
            return;
        }
        self.arm_watchdog(&mut state);
    }

    /// Runs on the timer thread.
    fn watchdog_fired(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.lock();
        if !state.watchdog.is_current(generation) {
            return;
        }
        state.watchdog.fired();

        let kill_reason = if state.shutting_down() {
            Some("unresponsive while deactivating")
        } else {
            let pending = state.pending_kill_dialog;
            match pending {
                None => {
                    let message = kill_dialog_message(self.manifest.title());
                    match self.runtime.dialogs.show_progress(
                        KILL_DIALOG_TITLE,
                        &message,
                        KILL_DIALOG_CONFIRM,
                    ) {
                        Some(id) => {
                            warn!(extension = %self.name(), "extension does not respond, asking the user");
                            state.pending_kill_dialog = Some(id);
                            self.poll_watchdog(&mut state);
                            None
                        }
                        None => Some("unresponsive and no dialog could be shown"),
                    }
                }
                Some(id) => {
                    if self.runtime.dialogs.is_cancelled(id) {
                        Some("user confirmed kill")
                    } else {
                        self.poll_watchdog(&mut state);
                        None
                    }
                }
            }
        };

        if let Some(reason) = kill_reason {
            let outcome = self.kill_locked(&mut state, reason);
            drop(state);
            self.finish_kill(outcome);
        }
    }

    // Kill

    pub(crate) fn kill(self: &Arc<Self>, reason: &str) {
        let outcome = {
            let mut state = self.state.lock();
            self.kill_locked(&mut state, reason)
        };
        self.finish_kill(outcome);
    }

    fn kill_locked(&self, state: &mut InstanceState, reason: &str) -> Option<KillOutcome> {
        if state.killed || (state.exiting && !state.listed) {
            return None;
        }
        warn!(extension = %self.name(), reason, "forcibly terminating extension");

        let was_activated = state.activated;
        state.killed = true;
        state.activated = false;
        state.exiting = true;
        state.cancel.store(true, Ordering::SeqCst);
        state.discarded += state.queue.drain() as u64;
        if let Some(id) = state.pending_kill_dialog.take() {
            self.runtime.dialogs.release(id);
        }
        state.watchdog.disarm(&self.runtime.timers);
        state.current_input = None;

        self.work.notify_all();
        self.exited.notify_all();

        Some(KillOutcome {
            was_activated,
            listed: mem::replace(&mut state.listed, false),
        })
    }

    /// Second half of a kill, with no instance lock held.
    fn finish_kill(self: &Arc<Self>, outcome: Option<KillOutcome>) {
        let Some(outcome) = outcome else {
            return;
        };

        // The interpreter is only reachable if the script is not running.
        match self.script.try_lock() {
            Some(mut slot) => {
                if outcome.was_activated && slot.interpreter.is_some() {
                    let cancel = Arc::new(AtomicBool::new(false));
                    if let Err(e) = self.call_entry(&mut slot, &EntryPoint::Deactivate, &cancel) {
                        debug!(extension = %self.name(), error = %e, "deactivate() failed during kill");
                    }
                }
                slot.destroy();
            }
            None => {
                debug!(extension = %self.name(), "script still running, skipping deactivate()");
            }
        }

        self.unlist(outcome.listed);
    }

    // Synchronous paths

    /// UI-thread fast path; gives up after the configured menu timeout.
    pub(crate) fn menu_entries(self: &Arc<Self>) -> ExtensionResult<Vec<MenuEntry>> {
        if !self.capabilities().menu {
            return Err(ExtensionError::Unsupported {
                extension: self.name().to_string(),
                what: "menu",
            });
        }

        let cancel = {
            let state = self.state.lock();
            if !state.activated || state.exiting {
                debug!(extension = %self.name(), "menu requested from an inactive or dying extension");
                return Err(ExtensionError::NotActivated(self.name().to_string()));
            }
            Arc::clone(&state.cancel)
        };

        let mut slot = self
            .script
            .try_lock_for(self.runtime.config.menu_timeout)
            .ok_or_else(|| ExtensionError::Busy(self.name().to_string()))?;

        let value = self
            .call_entry(&mut slot, &EntryPoint::Menu, &cancel)
            .map_err(|source| self.script_error(source))?;
        parse_menu(&value).map_err(|source| self.script_error(source))
    }

    /// Run `trigger()` on a throwaway interpreter, on the calling thread.
    pub(crate) fn trigger(self: &Arc<Self>) -> ExtensionResult<Value> {
        {
            let state = self.state.lock();
            if state.listed || state.thread_running {
                return Err(ExtensionError::AlreadyActive(self.name().to_string()));
            }
        }

        let mut interpreter = self
            .runtime
            .engine
            .create_interpreter(&self.manifest)
            .map_err(|source| self.script_error(source))?;
        let mut widgets = WidgetRegistry::default();
        let cancel = Arc::new(AtomicBool::new(false));

        let result = {
            let mut ctx = ScriptContext::new(self, &mut widgets, cancel);
            invoke(interpreter.as_mut(), &EntryPoint::Trigger, &mut ctx)
        };
        drop(interpreter);

        result.map_err(|source| self.script_error(source))
    }

    fn script_error(&self, source: ScriptError) -> ExtensionError {
        ExtensionError::Script {
            extension: self.name().to_string(),
            source,
        }
    }

    // Teardown

    /// Wait for the worker thread to finish.
    ///
    /// A killed worker that is still inside the script after `grace` is
    /// reported, and again each `grace` after that. With `detach` it is left
    /// running instead; returns false in that case.
    pub(crate) fn join_worker(&self, grace: Duration, detach: bool) -> bool {
        let interval = grace.max(MIN_KILL_WARN_INTERVAL);
        let mut kill_deadline: Option<Instant> = None;
        let mut waited = grace;
        {
            let mut state = self.state.lock();
            while state.thread_running {
                if !state.killed {
                    self.exited.wait(&mut state);
                    continue;
                }

                let deadline = *kill_deadline.get_or_insert_with(|| Instant::now() + grace);
                let timed_out = self.exited.wait_until(&mut state, deadline).timed_out();
                if !timed_out || !state.thread_running {
                    continue;
                }
                if detach {
                    warn!(extension = %self.name(), "killed worker did not exit, detaching it");
                    drop(state);
                    self.worker.lock().take();
                    return false;
                }
                warn!(
                    extension = %self.name(),
                    ?waited,
                    "killed worker is still inside the script, waiting"
                );
                kill_deadline = Some(deadline + interval);
                waited += interval;
            }
        }

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!(extension = %self.name(), "worker thread panicked");
            }
        }
        true
    }

    pub(crate) fn is_terminated(&self) -> bool {
        let state = self.state.lock();
        !state.thread_running && !state.listed
    }

    pub(crate) fn status(&self) -> ExtensionStatus {
        let state = self.state.lock();
        ExtensionStatus {
            activated: state.activated,
            exiting: state.exiting,
            killed: state.killed,
            phase: state.phase,
            watchdog: state.watchdog.state(),
            kill_dialog_shown: state.pending_kill_dialog.is_some(),
            running: state.running.clone(),
            queued: state.queue.len(),
            executed: state.executed,
            discarded: state.discarded,
            thread_running: state.thread_running,
            last_error: state.last_error.clone(),
        }
    }
}

/// Call into script code. Panics in the engine are turned into script errors
/// so they never unwind through the worker loop.
fn invoke(
    interpreter: &mut dyn Interpreter,
    entry: &EntryPoint,
    ctx: &mut ScriptContext<'_>,
) -> Result<Value, ScriptError> {
    match panic::catch_unwind(AssertUnwindSafe(|| interpreter.call(entry, ctx))) {
        Ok(result) => result,
        Err(payload) => Err(ScriptError::Raised {
            entry: entry.name().to_string(),
            message: format!("engine panicked: {}", panic_message(payload.as_ref())),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Handle to a registered extension.
///
/// Cheap to clone; equality is instance identity.
#[derive(Clone)]
pub struct Extension {
    inner: Arc<ExtensionInner>,
}

impl Extension {
    pub(crate) fn new(inner: Arc<ExtensionInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<ExtensionInner> {
        &self.inner
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn title(&self) -> &str {
        self.inner.manifest.title()
    }

    pub fn manifest(&self) -> &ExtensionManifest {
        &self.inner.manifest
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    pub fn status(&self) -> ExtensionStatus {
        self.inner.status()
    }
}

impl PartialEq for Extension {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Extension {}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name())
            .field("title", &self.title())
            .finish()
    }
}
