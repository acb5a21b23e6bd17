//! Host-side dialog collaborator used by the watchdog.

/// Handle to a dialog shown by the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DialogId(pub u64);

/// The UI dialog subsystem, as seen by the extension runtime.
///
/// Methods may be called from the watchdog's timer thread while an
/// extension's state lock is held, so implementations must not call back
/// into the extension manager.
pub trait DialogHost: Send + Sync {
    /// Show a progress-style dialog with a single confirm button.
    ///
    /// Returns `None` when no dialog could be displayed.
    fn show_progress(&self, title: &str, message: &str, confirm_label: &str) -> Option<DialogId>;

    /// True once the user pressed the confirm button.
    fn is_cancelled(&self, id: DialogId) -> bool;

    /// Hide and forget the dialog.
    fn release(&self, id: DialogId);
}

/// Dialog host for headless embedders: nothing is ever displayed.
///
/// With this host an unresponsive extension is terminated as soon as the
/// watchdog fires.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDialogs;

impl DialogHost for NoDialogs {
    fn show_progress(
        &self,
        _title: &str,
        _message: &str,
        _confirm_label: &str,
    ) -> Option<DialogId> {
        None
    }

    fn is_cancelled(&self, _id: DialogId) -> bool {
        false
    }

    fn release(&self, _id: DialogId) {}
}

pub(crate) const KILL_DIALOG_TITLE: &str = "Extension not responding!";
pub(crate) const KILL_DIALOG_CONFIRM: &str = "Yes";

pub(crate) fn kill_dialog_message(extension_title: &str) -> String {
    format!(
        "Extension '{}' does not respond.\nDo you want to kill it now?",
        extension_title
    )
}
