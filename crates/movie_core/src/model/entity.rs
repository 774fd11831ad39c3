//! Identity contract shared by every persisted record.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A persistable record keyed by `Self::Id`.
///
/// `id()` returns `None` for a record that has not been saved yet; stores
/// assign an identifier on first insert.
pub trait Entity {
    type Id: Copy + Eq + Hash + Debug + Display;

    fn id(&self) -> Option<Self::Id>;

    /// Returns whether this record has not been assigned an identifier yet.
    fn is_new(&self) -> bool {
        self.id().is_none()
    }
}
