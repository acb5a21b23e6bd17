//! Extension runtime for Nova.
//!
//! Every activated extension gets its own worker thread that executes a FIFO
//! of commands against the extension's script. A shared timer thread watches
//! each worker; a script that stops checking in is reported to the user, who
//! can have it killed.
//!
//! # Architecture
//!
//! ```text
//! ExtensionManager
//! ├── extensions: Vec<Extension>
//! └── runtime: Arc<Runtime>
//!     ├── engine: Arc<dyn ScriptEngine>
//!     ├── dialogs: Arc<dyn DialogHost>
//!     ├── timers: TimerService (one thread, all watchdogs)
//!     └── activated: Mutex<Vec<Extension>>
//!
//! Extension (Arc<ExtensionInner>)
//! ├── state: Mutex<InstanceState>  queue, flags, watchdog, current input
//! ├── script: Mutex<ScriptSlot>    interpreter + widget registry
//! └── worker: JoinHandle           pops commands, calls the script
//! ```
//!
//! Shutdown paths (explicit deactivation, watchdog kill, manager shutdown)
//! all end with the extension marked as exiting and removed from the
//! activated list exactly once. Exiting is a one-way latch; use
//! [`ExtensionManager::reload`] to run an extension again.

mod command;
mod dialog;
mod error;
mod input;
mod instance;
mod manager;
mod manifest;
mod queue;
mod script;
mod timer;
mod watchdog;

#[cfg(test)]
mod testing;

pub use command::{Command, WidgetId};
pub use dialog::{DialogHost, DialogId, NoDialogs};
pub use error::{ExtensionError, ExtensionResult, ScriptError};
pub use input::{InputItem, PlayableItem};
pub use instance::{DeactivateOutcome, Extension, ExtensionStatus, WorkerPhase};
pub use manager::{ExtensionManager, ManagerConfig};
pub use manifest::{Capabilities, ExtensionManifest, ExtensionMeta, MANIFEST_FILE};
pub use queue::{CommandQueue, PushOutcome};
pub use script::{
    parse_menu, EntryPoint, Interpreter, MenuEntry, ScriptContext, ScriptEngine, WidgetRegistry,
};
pub use timer::{TimerId, TimerService};
pub use watchdog::WatchdogState;
