//! Network requests planned by a binding.
//!
//! Writes are not sent as they happen: each one is first turned into a list
//! of requests (see [`plan_write`]) which the binding then dispatches and
//! folds back into its collection as they complete.

use crate::diff::{Change, Diff};
use crate::error::Result;
use crate::{Address, Element, Endpoint, NetworkHandler};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The four request kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestKind {
    Get,
    Post,
    Put,
    Delete,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Get => "GET",
            RequestKind::Post => "POST",
            RequestKind::Put => "PUT",
            RequestKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request together with what it carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Request<E> {
    /// Fetch the collection.
    Get { address: Address },
    /// Create an element that has no identity on the remote yet.
    Post { element: E, address: Address },
    /// Replace the element with the same identity.
    Put { element: E, address: Address },
    /// Delete the element.
    Delete { element: E, address: Address },
}

/// What a successful request returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Response<E> {
    Collection(Vec<E>),
    Element(E),
    Deleted,
}

impl<E: Element> Request<E> {
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Get { .. } => RequestKind::Get,
            Request::Post { .. } => RequestKind::Post,
            Request::Put { .. } => RequestKind::Put,
            Request::Delete { .. } => RequestKind::Delete,
        }
    }

    pub fn address(&self) -> &str {
        match self {
            Request::Get { address }
            | Request::Post { address, .. }
            | Request::Put { address, .. }
            | Request::Delete { address, .. } => address,
        }
    }

    /// The element sent or targeted, if any.
    pub fn element(&self) -> Option<&E> {
        match self {
            Request::Get { .. } => None,
            Request::Post { element, .. }
            | Request::Put { element, .. }
            | Request::Delete { element, .. } => Some(element),
        }
    }

    /// The identity this request targets, if any.
    pub fn identity(&self) -> Option<E::Id> {
        self.element().and_then(|e| e.id())
    }

    /// Send through `handler`.
    pub async fn send<N: NetworkHandler<E>>(&self, handler: &N) -> Result<Response<E>> {
        match self {
            Request::Get { address } => handler.get(address).await.map(Response::Collection),
            Request::Post { element, address } => {
                handler.post(element, address).await.map(Response::Element)
            }
            Request::Put { element, address } => {
                handler.put(element, address).await.map(Response::Element)
            }
            Request::Delete { address, .. } => {
                handler.delete(address).await.map(|()| Response::Deleted)
            }
        }
    }
}

/// Requests and local-only effects produced by one write.
#[derive(Debug, Clone, PartialEq)]
pub struct WritePlan<E> {
    pub requests: Vec<Request<E>>,
    /// Old positions of removed elements that never reached the remote.
    pub local_removals: Vec<usize>,
}

/// Turn a diff of the current collection into requests.
///
/// - an edit becomes one PUT to the identity's address;
/// - a removal with an identity becomes a DELETE, without one it is
///   removed locally only;
/// - an insertion whose identity is already present in `current` becomes a
///   PUT, any other insertion a POST to the collection base.
///
/// Moves produce nothing.
pub fn plan_write<E: Element, N>(
    diff: &Diff<E>,
    current: &[E],
    endpoint: &Endpoint<N>,
) -> WritePlan<E> {
    let mut requests = Vec::new();
    let mut local_removals = Vec::new();
    let known: HashSet<E::Id> = current.iter().filter_map(|e| e.id()).collect();

    for change in diff.changes() {
        match change {
            Change::Edit { old, new, .. } => {
                if let Some(id) = old.id() {
                    requests.push(Request::Put {
                        element: new.clone(),
                        address: endpoint.append_path(&id.to_string()),
                    });
                }
            }
            Change::Removal { position, element } => match element.id() {
                Some(id) => requests.push(Request::Delete {
                    element: element.clone(),
                    address: endpoint.append_path(&id.to_string()),
                }),
                None => local_removals.push(*position),
            },
            Change::Insertion { element, .. } => {
                let existing = element.id().filter(|id| known.contains(id));
                match existing {
                    Some(id) => requests.push(Request::Put {
                        element: element.clone(),
                        address: endpoint.append_path(&id.to_string()),
                    }),
                    None => requests.push(Request::Post {
                        element: element.clone(),
                        address: endpoint.base().to_string(),
                    }),
                }
            }
            Change::Move { .. } => {}
        }
    }

    WritePlan {
        requests,
        local_removals,
    }
}
