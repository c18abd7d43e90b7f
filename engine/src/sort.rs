//! Sort strategies.
//!
//! Same locus rules as filtering: a server sort appends one `sort_by`-style
//! parameter to the endpoint (once per binding) and is also applied locally.

use crate::field::wire_name;
use crate::query::{default_sort_translator, QueryParam, SortDirection, SortTranslator};
use crate::{Endpoint, Field};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

type Comparator<E> = Arc<dyn Fn(&E, &E) -> Ordering + Send + Sync>;

/// Orders elements by one field.
pub struct Sorter<E> {
    direction: SortDirection,
    field: Option<String>,
    compare: Comparator<E>,
    applied: bool,
}

impl<E: 'static> Sorter<E> {
    pub fn new<V: Ord + 'static>(direction: SortDirection, field: Field<E, V>) -> Self {
        let accessor = field.accessor();
        let compare: Comparator<E> = Arc::new(move |a, b| accessor(a).cmp(&accessor(b)));
        Self {
            direction,
            field: field.name().map(str::to_owned),
            compare,
            applied: false,
        }
    }

    pub fn ascending<V: Ord + 'static>(field: Field<E, V>) -> Self {
        Self::new(SortDirection::Ascending, field)
    }

    pub fn descending<V: Ord + 'static>(field: Field<E, V>) -> Self {
        Self::new(SortDirection::Descending, field)
    }
}

impl<E> Sorter<E> {
    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Stable sort: elements comparing equal keep their relative order in
    /// either direction.
    pub fn apply(&self, elements: &mut [E]) {
        match self.direction {
            SortDirection::Ascending => elements.sort_by(|a, b| (self.compare)(a, b)),
            SortDirection::Descending => elements.sort_by(|a, b| (self.compare)(b, a)),
        }
    }

    pub fn to_query(&self, translator: &dyn Fn(SortDirection, &str) -> QueryParam) -> QueryParam {
        translator(self.direction, wire_name(self.field.as_deref()))
    }
}

impl<E> fmt::Debug for Sorter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sorter")
            .field("direction", &self.direction)
            .field("field", &self.field)
            .field("applied", &self.applied)
            .finish()
    }
}

/// Where and whether sorting happens.
pub enum SortStrategy<E> {
    /// Append a sort parameter, then also sort locally.
    Server(Sorter<E>, Option<SortTranslator>),
    /// Sort locally only.
    Client(Sorter<E>),
    None,
}

impl<E> Default for SortStrategy<E> {
    fn default() -> Self {
        SortStrategy::None
    }
}

impl<E> SortStrategy<E> {
    pub fn client(sorter: Sorter<E>) -> Self {
        SortStrategy::Client(sorter)
    }

    pub fn server(sorter: Sorter<E>) -> Self {
        SortStrategy::Server(sorter, None)
    }

    /// Server sort with its own translator, which takes priority over the
    /// endpoint default and the library default.
    pub fn server_with(
        sorter: Sorter<E>,
        translator: impl Fn(SortDirection, &str) -> QueryParam + Send + Sync + 'static,
    ) -> Self {
        SortStrategy::Server(sorter, Some(Arc::new(translator)))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, SortStrategy::None)
    }

    /// Append the server sort parameter to the endpoint if not done yet.
    ///
    /// Returns `true` when the parameter was appended.
    pub fn activate<N>(&mut self, endpoint: &mut Endpoint<N>) -> bool {
        let SortStrategy::Server(sorter, own) = self else {
            return false;
        };
        if sorter.applied {
            return false;
        }

        let param = match (own.as_ref(), endpoint.sort_translator()) {
            (Some(translator), _) => sorter.to_query(translator.as_ref()),
            (None, Some(translator)) => sorter.to_query(translator.as_ref()),
            (None, None) => sorter.to_query(&default_sort_translator),
        };
        tracing::debug!(param = %param, "appending server sort parameter");
        endpoint.append_query([param]);
        sorter.applied = true;
        true
    }

    /// Client-side pass. Runs for both client and server strategies.
    pub fn apply(&self, elements: &mut [E]) {
        match self {
            SortStrategy::Server(sorter, _) | SortStrategy::Client(sorter) => sorter.apply(elements),
            SortStrategy::None => {}
        }
    }
}

impl<E> fmt::Debug for SortStrategy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortStrategy::Server(sorter, own) => f
                .debug_tuple("Server")
                .field(sorter)
                .field(&own.is_some())
                .finish(),
            SortStrategy::Client(sorter) => f.debug_tuple("Client").field(sorter).finish(),
            SortStrategy::None => f.write_str("None"),
        }
    }
}
