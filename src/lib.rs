//! Nova extension runtime.
//!
//! Runs extension scripts asynchronously, one worker thread per activated
//! extension, with a watchdog that lets the user kill scripts that stop
//! responding. The script language itself is supplied by the embedder
//! through [`extensions::ScriptEngine`].
//!
//! # Architecture
//!
//! - [`config`] - Runtime configuration loading
//! - [`extensions`] - Command queues, workers, watchdog and the manager
//! - [`logging`] - `tracing` subscriber setup
//! - [`cli`] - The `nova-ext` operator tool
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nova_ext::extensions::{ExtensionManager, ManagerConfig, NoDialogs};
//!
//! let config = nova_ext::RuntimeConfig::load();
//! let mut manager = ExtensionManager::new(
//!     ManagerConfig::from(&config),
//!     Arc::new(MyLuaEngine::new()),
//!     Arc::new(NoDialogs),
//! )?;
//!
//! let ext = manager.get("lyrics").expect("not installed");
//! manager.activate(&ext)?;
//! ```

pub mod cli;
pub mod config;
pub mod extensions;
pub mod logging;

pub use config::RuntimeConfig;
pub use extensions::{ExtensionError, ExtensionManager, ExtensionResult};
