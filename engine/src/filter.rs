//! Filter strategies.
//!
//! A filter is a set of predicates combined with logical AND. Where it runs
//! is decided by the strategy locus:
//!
//! - [`FilterStrategy::Client`] evaluates the predicates locally after every
//!   write and every merged response.
//! - [`FilterStrategy::Server`] appends the predicates to the endpoint as query
//!   parameters (once per binding) and then *also* evaluates them locally.
//!   The local pass is intentional: the client cannot verify that the server
//!   honored the query.
//! - [`FilterStrategy::None`] does nothing.

use crate::query::{default_filter_translator, FilterTranslator, Operator, QueryParam};
use crate::field::wire_name;
use crate::{Endpoint, Field};
use std::fmt::{self, Display};
use std::sync::Arc;

type Test<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// One comparison of an element field against a fixed value.
pub struct Predicate<E> {
    field: Option<String>,
    operator: Operator,
    value: String,
    test: Test<E>,
}

impl<E: 'static> Predicate<E> {
    /// Keep elements whose field is `>= value`.
    pub fn gte<V>(field: Field<E, V>, value: V) -> Self
    where
        V: PartialOrd + Display + Send + Sync + 'static,
    {
        Self::build(field, Operator::Gte, value, |actual, expected| actual >= expected)
    }

    /// Keep elements whose field is `<= value`.
    pub fn lte<V>(field: Field<E, V>, value: V) -> Self
    where
        V: PartialOrd + Display + Send + Sync + 'static,
    {
        Self::build(field, Operator::Lte, value, |actual, expected| actual <= expected)
    }

    /// Keep elements whose field equals `value`.
    pub fn exists<V>(field: Field<E, V>, value: V) -> Self
    where
        V: PartialOrd + Display + Send + Sync + 'static,
    {
        Self::build(field, Operator::Exists, value, |actual, expected| {
            actual == expected
        })
    }

    fn build<V>(field: Field<E, V>, operator: Operator, value: V, cmp: fn(&V, &V) -> bool) -> Self
    where
        V: PartialOrd + Display + Send + Sync + 'static,
    {
        let accessor = field.accessor();
        let rendered = value.to_string();
        let test: Test<E> = Arc::new(move |element| cmp(&accessor(element), &value));
        Self {
            field: field.name().map(str::to_owned),
            operator,
            value: rendered,
            test,
        }
    }
}

impl<E> Predicate<E> {
    /// Evaluate against one element.
    pub fn matches(&self, element: &E) -> bool {
        (self.test)(element)
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The value as it is sent to the server.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Translate into a query parameter.
    pub fn to_query(&self, translator: &dyn Fn(&str, Operator, &str) -> QueryParam) -> QueryParam {
        translator(wire_name(self.field.as_deref()), self.operator, &self.value)
    }
}

impl<E> Clone for Predicate<E> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            operator: self.operator,
            value: self.value.clone(),
            test: Arc::clone(&self.test),
        }
    }
}

impl<E> fmt::Debug for Predicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("field", &self.field)
            .field("operator", &self.operator)
            .field("value", &self.value)
            .finish()
    }
}

/// A conjunction of predicates.
///
/// `applied` records whether the predicates have already been appended to an
/// endpoint; a server filter is appended at most once.
pub struct Filter<E> {
    predicates: Vec<Predicate<E>>,
    applied: bool,
}

impl<E> Filter<E> {
    pub fn new(predicates: Vec<Predicate<E>>) -> Self {
        Self {
            predicates,
            applied: false,
        }
    }

    pub fn predicates(&self) -> &[Predicate<E>] {
        &self.predicates
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Whether an element satisfies every predicate.
    pub fn matches(&self, element: &E) -> bool {
        self.predicates.iter().all(|p| p.matches(element))
    }

    /// Drop elements that fail any predicate, keeping order.
    pub fn apply(&self, elements: &mut Vec<E>) {
        elements.retain(|e| self.matches(e));
    }

    /// Translate every predicate, in order.
    pub fn query_params(
        &self,
        translator: &dyn Fn(&str, Operator, &str) -> QueryParam,
    ) -> Vec<QueryParam> {
        self.predicates.iter().map(|p| p.to_query(translator)).collect()
    }
}

impl<E> fmt::Debug for Filter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("predicates", &self.predicates)
            .field("applied", &self.applied)
            .finish()
    }
}

/// Where and whether filtering happens.
pub enum FilterStrategy<E> {
    /// Append query parameters, then also filter locally.
    Server(Filter<E>, Option<FilterTranslator>),
    /// Filter locally only.
    Client(Filter<E>),
    None,
}

impl<E> Default for FilterStrategy<E> {
    fn default() -> Self {
        FilterStrategy::None
    }
}

impl<E> FilterStrategy<E> {
    pub fn client(predicates: Vec<Predicate<E>>) -> Self {
        FilterStrategy::Client(Filter::new(predicates))
    }

    pub fn server(predicates: Vec<Predicate<E>>) -> Self {
        FilterStrategy::Server(Filter::new(predicates), None)
    }

    /// Server filter with its own translator, which takes priority over the
    /// endpoint default and the library default.
    pub fn server_with(
        predicates: Vec<Predicate<E>>,
        translator: impl Fn(&str, Operator, &str) -> QueryParam + Send + Sync + 'static,
    ) -> Self {
        FilterStrategy::Server(Filter::new(predicates), Some(Arc::new(translator)))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, FilterStrategy::None)
    }

    /// Append server query parameters to the endpoint if not done yet.
    ///
    /// Returns `true` when parameters were appended, in which case the
    /// caller must re-fetch the collection.
    pub fn activate<N>(&mut self, endpoint: &mut Endpoint<N>) -> bool {
        let FilterStrategy::Server(filter, own) = self else {
            return false;
        };
        if filter.applied {
            return false;
        }

        let params = match (own.as_ref(), endpoint.filter_translator()) {
            (Some(translator), _) => filter.query_params(translator.as_ref()),
            (None, Some(translator)) => filter.query_params(translator.as_ref()),
            (None, None) => filter.query_params(&default_filter_translator),
        };
        tracing::debug!(count = params.len(), "appending server filter parameters");
        endpoint.append_query(params);
        filter.applied = true;
        true
    }

    /// Client-side pass. Runs for both client and server strategies.
    pub fn apply(&self, elements: &mut Vec<E>) {
        match self {
            FilterStrategy::Server(filter, _) | FilterStrategy::Client(filter) => {
                filter.apply(elements)
            }
            FilterStrategy::None => {}
        }
    }
}

impl<E> fmt::Debug for FilterStrategy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterStrategy::Server(filter, own) => f
                .debug_tuple("Server")
                .field(filter)
                .field(&own.is_some())
                .finish(),
            FilterStrategy::Client(filter) => f.debug_tuple("Client").field(filter).finish(),
            FilterStrategy::None => f.write_str("None"),
        }
    }
}
