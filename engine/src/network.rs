//! The network capability consumed by a binding.

use crate::error::Result;
use crate::Element;
use async_trait::async_trait;

/// Talks to the remote resource collection.
///
/// Every call receives its full address; the binding composes addresses
/// from its [`Endpoint`](crate::Endpoint) and the handler keeps no base URL
/// of its own.
#[async_trait]
pub trait NetworkHandler<E: Element>: Send + Sync + 'static {
    /// Fetch the collection at `address`.
    async fn get(&self, address: &str) -> Result<Vec<E>>;

    /// Create an element; returns the stored element carrying its identity.
    async fn post(&self, element: &E, address: &str) -> Result<E>;

    /// Replace the element at `address`.
    async fn put(&self, element: &E, address: &str) -> Result<E>;

    /// Delete the element at `address`.
    async fn delete(&self, address: &str) -> Result<()>;
}

