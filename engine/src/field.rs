//! Field descriptors.
//!
//! A field descriptor pairs the wire name of an element field with a typed
//! accessor. Filter and sort strategies use the accessor for client-side
//! evaluation and the name when translating themselves into query parameters.

use std::fmt;
use std::sync::Arc;

type Accessor<E, V> = Arc<dyn Fn(&E) -> V + Send + Sync>;

/// A named, typed view onto one field of an element.
pub struct Field<E, V> {
    name: Option<String>,
    accessor: Accessor<E, V>,
}

impl<E, V> Field<E, V> {
    /// Create a field descriptor with its wire name.
    pub fn new(name: impl Into<String>, accessor: impl Fn(&E) -> V + Send + Sync + 'static) -> Self {
        Self {
            name: Some(name.into()),
            accessor: Arc::new(accessor),
        }
    }

    /// Create a descriptor without a wire name, for client-side use only.
    pub fn unnamed(accessor: impl Fn(&E) -> V + Send + Sync + 'static) -> Self {
        Self {
            name: None,
            accessor: Arc::new(accessor),
        }
    }

    /// Read the field from an element.
    pub fn get(&self, element: &E) -> V {
        (self.accessor)(element)
    }

    /// The wire name, if one was given.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The name to put on the wire.
    ///
    /// An unnamed field translates to the empty string; the query parameter
    /// is still emitted so the remaining parameters keep their positions.
    pub fn wire_name(&self) -> &str {
        wire_name(self.name.as_deref())
    }

    pub(crate) fn accessor(&self) -> Accessor<E, V> {
        Arc::clone(&self.accessor)
    }
}

pub(crate) fn wire_name(name: Option<&str>) -> &str {
    match name {
        Some(name) => name,
        None => {
            tracing::warn!("field has no wire name, translating it as an empty name");
            ""
        }
    }
}

impl<E, V> Clone for Field<E, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            accessor: Arc::clone(&self.accessor),
        }
    }
}

impl<E, V> fmt::Debug for Field<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish()
    }
}
