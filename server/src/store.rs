//! In-memory resource collections.
//!
//! Each resource is an ordered list of JSON objects keyed by their `id`
//! member. Numeric ids are assigned per resource on create.

use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// Member holding an element's identity.
pub const ID_FIELD: &str = "id";

#[derive(Debug, Default)]
struct Collection {
    elements: Vec<Value>,
    last_id: u64,
}

impl Collection {
    fn position(&self, id: &str) -> Option<usize> {
        self.elements
            .iter()
            .position(|element| id_of(element).as_deref() == Some(id))
    }
}

/// The set of served resource collections.
#[derive(Debug, Default)]
pub struct ResourceStore {
    collections: DashMap<String, Collection>,
}

impl ResourceStore {
    /// Create a store serving the given resources, all empty.
    pub fn new<I, S>(resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let collections = DashMap::new();
        for resource in resources {
            collections.insert(resource.into(), Collection::default());
        }
        Self { collections }
    }

    /// Names of the served resources, sorted.
    pub fn resources(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// All elements of a resource, in insertion order.
    pub fn list(&self, resource: &str) -> Result<Vec<Value>> {
        let collection = self
            .collections
            .get(resource)
            .ok_or_else(|| unknown(resource))?;
        Ok(collection.elements.clone())
    }

    /// Store a new element. An absent or null `id` is assigned.
    pub fn create(&self, resource: &str, element: Value) -> Result<Value> {
        let mut element = into_object(element)?;
        let mut collection = self
            .collections
            .get_mut(resource)
            .ok_or_else(|| unknown(resource))?;

        let given = element.get(ID_FIELD).filter(|id| !id.is_null()).cloned();
        match given {
            None => {
                collection.last_id += 1;
                element.insert(ID_FIELD.to_string(), Value::from(collection.last_id));
            }
            Some(id) => {
                let id = render_id(&id)
                    .ok_or_else(|| AppError::BadRequest(format!("unsupported id: {id}")))?;
                if collection.position(&id).is_some() {
                    return Err(AppError::Conflict(format!("{resource}/{id} already exists")));
                }
                if let Ok(numeric) = id.parse::<u64>() {
                    collection.last_id = collection.last_id.max(numeric);
                }
            }
        }

        let element = Value::Object(element);
        collection.elements.push(element.clone());
        Ok(element)
    }

    /// Replace the element with the given id. The stored `id` is the path id.
    pub fn replace(&self, resource: &str, id: &str, element: Value) -> Result<Value> {
        let mut element = into_object(element)?;
        let mut collection = self
            .collections
            .get_mut(resource)
            .ok_or_else(|| unknown(resource))?;
        let position = collection
            .position(id)
            .ok_or_else(|| missing(resource, id))?;

        let stored_id = collection.elements[position]
            .get(ID_FIELD)
            .cloned()
            .unwrap_or_else(|| Value::from(id));
        element.insert(ID_FIELD.to_string(), stored_id);

        let element = Value::Object(element);
        collection.elements[position] = element.clone();
        Ok(element)
    }

    /// Remove the element with the given id.
    pub fn remove(&self, resource: &str, id: &str) -> Result<Value> {
        let mut collection = self
            .collections
            .get_mut(resource)
            .ok_or_else(|| unknown(resource))?;
        let position = collection
            .position(id)
            .ok_or_else(|| missing(resource, id))?;
        Ok(collection.elements.remove(position))
    }
}

/// An element's id as it appears in a path segment.
pub fn id_of(element: &Value) -> Option<String> {
    element.get(ID_FIELD).and_then(render_id)
}

fn render_id(id: &Value) -> Option<String> {
    match id {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn into_object(element: Value) -> Result<Map<String, Value>> {
    match element {
        Value::Object(map) => Ok(map),
        other => Err(AppError::BadRequest(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

fn unknown(resource: &str) -> AppError {
    AppError::NotFound(format!("unknown resource: {resource}"))
}

fn missing(resource: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{resource}/{id} not found"))
}
