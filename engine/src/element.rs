//! The element contract.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A record that can be kept in sync with a remote resource collection.
///
/// The identity is `None` until the remote assigns one and is the only key
/// used to correlate a local element with its server counterpart.
pub trait Element: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Server-assigned identity.
    type Id: Clone + Eq + Hash + Display + Debug + Send + Sync + 'static;

    /// The identity, if the remote has assigned one.
    fn id(&self) -> Option<Self::Id>;

    /// Type name used when deriving cache storage keys.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Whether both elements carry the same present identity.
    fn same_identity(&self, other: &Self) -> bool {
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
