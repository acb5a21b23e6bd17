//! Units of work executed against an extension's script.

use std::fmt;

/// Opaque identity of a dialog widget created by a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId(pub u32);

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "widget#{}", self.0)
    }
}

/// One unit of work for an extension's worker thread.
///
/// Commands are moved into the queue on push and out of it on pop, so each
/// one is either executed or discarded exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Activate,
    Deactivate,
    /// The script's dialog was closed by the user.
    Close,
    Click(WidgetId),
    TriggerMenu(u16),
    /// The current input item was replaced.
    SetInput,
    MetaChanged,
    PlayingChanged(i32),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Activate => "activate",
            Command::Deactivate => "deactivate",
            Command::Close => "close",
            Command::Click(_) => "click",
            Command::TriggerMenu(_) => "trigger_menu",
            Command::SetInput => "set_input",
            Command::MetaChanged => "meta_changed",
            Command::PlayingChanged(_) => "playing_changed",
        }
    }

    /// Same kind and same explicit payload.
    ///
    /// Clicks compare the widget identity only.
    pub fn duplicates(&self, other: &Command) -> bool {
        self == other
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Click(widget) => write!(f, "click({})", widget),
            Command::TriggerMenu(id) => write!(f, "trigger_menu({})", id),
            Command::PlayingChanged(status) => write!(f, "playing_changed({})", status),
            other => f.write_str(other.name()),
        }
    }
}
