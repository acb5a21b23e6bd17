//! The "current playable item" an extension may observe.

use std::fmt;
use std::sync::Arc;

/// A playable item owned by the host's playlist model.
pub trait PlayableItem: Send + Sync {
    fn uri(&self) -> &str;

    fn title(&self) -> Option<&str> {
        None
    }
}

/// Shared reference to a playable item.
///
/// Cloning holds the item, dropping releases it; an extension keeps at most
/// one of these at a time.
pub type InputItem = Arc<dyn PlayableItem>;

pub(crate) struct DisplayItem<'a>(pub &'a Option<InputItem>);

impl fmt::Display for DisplayItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(item) => f.write_str(item.uri()),
            None => f.write_str("<none>"),
        }
    }
}
