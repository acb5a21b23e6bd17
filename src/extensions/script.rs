//! The script engine seam.
//!
//! The runtime never interprets scripts itself. An embedder supplies a
//! [`ScriptEngine`] that creates one [`Interpreter`] per activation; the
//! runtime calls named entry points on it from the extension's worker
//! thread only, and drops it to destroy the interpreter state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use super::command::WidgetId;
use super::error::ScriptError;
use super::input::InputItem;
use super::instance::ExtensionInner;
use super::manifest::ExtensionManifest;

/// Creates interpreter states for extensions.
pub trait ScriptEngine: Send + Sync {
    fn create_interpreter(
        &self,
        manifest: &ExtensionManifest,
    ) -> Result<Box<dyn Interpreter>, ScriptError>;
}

/// One live interpreter state. Dropping it destroys the state.
pub trait Interpreter: Send {
    fn call(
        &mut self,
        entry: &EntryPoint,
        ctx: &mut ScriptContext<'_>,
    ) -> Result<Value, ScriptError>;
}

/// A named function of the extension script together with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    Activate,
    Deactivate,
    Close,
    InputChanged,
    MetaChanged,
    PlayingChanged(i32),
    TriggerMenu(u16),
    /// Widget click, dispatched to the callback the script bound to it.
    Click { widget: WidgetId, callback: String },
    /// Synchronous menu enumeration.
    Menu,
    /// One-shot run of a trigger-only extension.
    Trigger,
}

impl EntryPoint {
    /// Name of the script function this entry point invokes.
    pub fn name(&self) -> &str {
        match self {
            EntryPoint::Activate => "activate",
            EntryPoint::Deactivate => "deactivate",
            EntryPoint::Close => "close",
            EntryPoint::InputChanged => "input_changed",
            EntryPoint::MetaChanged => "meta_changed",
            EntryPoint::PlayingChanged(_) => "playing_changed",
            EntryPoint::TriggerMenu(_) => "trigger_menu",
            EntryPoint::Click { callback, .. } => callback,
            EntryPoint::Menu => "menu",
            EntryPoint::Trigger => "trigger",
        }
    }
}

/// Per-instance map from widget identity to the script callback bound to it.
///
/// Cleared whenever the interpreter state is created or destroyed.
#[derive(Debug, Default)]
pub struct WidgetRegistry {
    callbacks: HashMap<WidgetId, String>,
}

impl WidgetRegistry {
    pub fn bind(&mut self, widget: WidgetId, callback: impl Into<String>) {
        self.callbacks.insert(widget, callback.into());
    }

    pub fn unbind(&mut self, widget: WidgetId) -> bool {
        self.callbacks.remove(&widget).is_some()
    }

    pub fn resolve(&self, widget: WidgetId) -> Option<&str> {
        self.callbacks.get(&widget).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

/// Host services available to script code for the duration of one call.
pub struct ScriptContext<'a> {
    ext: &'a Arc<ExtensionInner>,
    widgets: &'a mut WidgetRegistry,
    cancel: Arc<AtomicBool>,
}

impl<'a> ScriptContext<'a> {
    pub(crate) fn new(
        ext: &'a Arc<ExtensionInner>,
        widgets: &'a mut WidgetRegistry,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            ext,
            widgets,
            cancel,
        }
    }

    pub fn extension_name(&self) -> &str {
        self.ext.manifest().name()
    }

    /// Tell the watchdog the script is still alive.
    ///
    /// Hides a pending kill confirmation and restarts the full period.
    pub fn keep_alive(&self) {
        self.ext.keep_alive();
    }

    /// Ask for this extension to be deactivated once the current call returns.
    ///
    /// Returns false if the extension is already on its way out.
    pub fn request_deactivate(&self) -> bool {
        self.ext.request_deactivation(false).is_ok()
    }

    /// Set when the extension was forcibly terminated.
    ///
    /// Long-running script code should poll this and bail out.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn bind_widget(&mut self, widget: WidgetId, callback: impl Into<String>) {
        self.widgets.bind(widget, callback);
    }

    pub fn unbind_widget(&mut self, widget: WidgetId) -> bool {
        self.widgets.unbind(widget)
    }

    pub fn current_input(&self) -> Option<InputItem> {
        self.ext.current_input()
    }
}

/// One entry of an extension's menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub id: u16,
    pub title: String,
}

/// Parse the value returned by the script's `menu()` function.
///
/// Accepts an object keyed by numeric id (`{"1": "Search"}`) or an array of
/// `[id, title]` pairs. Ids are truncated to 16 bits.
pub fn parse_menu(value: &Value) -> Result<Vec<MenuEntry>, ScriptError> {
    let invalid = || ScriptError::BadReturn {
        entry: "menu".to_string(),
        expected: "a table of id -> title".to_string(),
    };

    let mut entries = Vec::new();
    match value {
        Value::Object(map) => {
            for (key, title) in map {
                let id = key.trim().parse::<i64>().map_err(|_| invalid())?;
                let title = title.as_str().ok_or_else(invalid)?;
                entries.push(MenuEntry {
                    id: (id & 0xFFFF) as u16,
                    title: title.to_string(),
                });
            }
            entries.sort_by_key(|entry| entry.id);
        }
        Value::Array(items) => {
            for item in items {
                let pair = item.as_array().filter(|p| p.len() == 2).ok_or_else(invalid)?;
                let id = pair[0].as_i64().ok_or_else(invalid)?;
                let title = pair[1].as_str().ok_or_else(invalid)?;
                entries.push(MenuEntry {
                    id: (id & 0xFFFF) as u16,
                    title: title.to_string(),
                });
            }
        }
        _ => return Err(invalid()),
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_point_names() {
        assert_eq!(EntryPoint::PlayingChanged(3).name(), "playing_changed");
        assert_eq!(EntryPoint::InputChanged.name(), "input_changed");
        let click = EntryPoint::Click {
            widget: WidgetId(1),
            callback: "on_search".to_string(),
        };
        assert_eq!(click.name(), "on_search");
    }

    #[test]
    fn test_widget_registry() {
        let mut registry = WidgetRegistry::default();
        registry.bind(WidgetId(7), "on_ok");
        registry.bind(WidgetId(8), "on_cancel");
        assert_eq!(registry.resolve(WidgetId(7)), Some("on_ok"));
        assert!(registry.unbind(WidgetId(8)));
        assert!(!registry.unbind(WidgetId(8)));
        assert_eq!(registry.len(), 1);
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_parse_menu_object() {
        let menu =
            parse_menu(&json!({"2": "Settings", "1": "Search", "65537": "Wrapped"})).unwrap();
        assert_eq!(
            menu,
            vec![
                MenuEntry { id: 1, title: "Search".into() },
                MenuEntry { id: 1, title: "Wrapped".into() },
                MenuEntry { id: 2, title: "Settings".into() },
            ]
        );
    }

    #[test]
    fn test_parse_menu_pairs_keep_order() {
        let menu = parse_menu(&json!([[5, "Five"], [3, "Three"]])).unwrap();
        assert_eq!(menu[0], MenuEntry { id: 5, title: "Five".into() });
        assert_eq!(menu[1].id, 3);
    }

    #[test]
    fn test_parse_menu_rejects_bad_entries() {
        assert!(parse_menu(&json!("not a table")).is_err());
        assert!(parse_menu(&json!({"one": "Search"})).is_err());
        assert!(parse_menu(&json!({"1": 42})).is_err());
        assert!(parse_menu(&json!([[1]])).is_err());
        assert!(parse_menu(&json!([])).unwrap().is_empty());
    }
}
