//! Resource handlers - list, create, replace and remove elements.

use serde_json::Value;

use crate::error::Result;
use crate::handlers::ListQuery;
use crate::store::{id_of, ResourceStore};

/// List a resource, filtered and sorted by the query.
pub fn handle_list(store: &ResourceStore, resource: &str, query: &ListQuery) -> Result<Vec<Value>> {
    let elements = query.apply(store.list(resource)?);
    tracing::debug!(
        resource,
        conditions = query.conditions.len(),
        count = elements.len(),
        "Listed elements"
    );
    Ok(elements)
}

/// Store a new element and return it with its assigned id.
pub fn handle_create(store: &ResourceStore, resource: &str, element: Value) -> Result<Value> {
    let stored = store.create(resource, element)?;
    let id = id_of(&stored).unwrap_or_default();
    tracing::info!(resource, id = %id, "Created element");
    Ok(stored)
}

/// Replace the element stored under `id`.
pub fn handle_replace(
    store: &ResourceStore,
    resource: &str,
    id: &str,
    element: Value,
) -> Result<Value> {
    let stored = store.replace(resource, id, element)?;
    tracing::info!(resource, id, "Replaced element");
    Ok(stored)
}

/// Remove the element stored under `id`.
pub fn handle_remove(store: &ResourceStore, resource: &str, id: &str) -> Result<()> {
    store.remove(resource, id)?;
    tracing::info!(resource, id, "Removed element");
    Ok(())
}
