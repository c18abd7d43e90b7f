//! Per-request outcomes published by a binding.

use crate::error::Error;
use crate::request::RequestKind;

/// Outcome of one network request, in completion order.
///
/// [`Binding::write`](crate::Binding::write) never returns an error; these
/// events are how callers observe partial failure.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent<E> {
    /// A GET replaced the collection.
    Loaded { count: usize },
    /// A POST was stored; carries the element returned by the remote.
    Created(E),
    /// A PUT was stored; carries the element returned by the remote.
    Updated(E),
    /// A DELETE succeeded.
    Deleted(E),
    /// A request failed and the collection was left as it was.
    Failed {
        kind: RequestKind,
        element: Option<E>,
        error: Error,
    },
}

impl<E> SyncEvent<E> {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncEvent::Failed { .. })
    }
}
