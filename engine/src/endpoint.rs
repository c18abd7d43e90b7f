//! Endpoint and address composition.

use crate::query::{encode_query, FilterTranslator, Operator, QueryParam, SortDirection, SortTranslator};
use crate::Address;
use std::fmt;
use std::sync::Arc;

/// A remote resource collection: base address, query parameters appended
/// by server-side strategies, the network handler and optional default
/// translators.
///
/// Query parameters are only ever appended, so several strategies can
/// compose onto one endpoint.
pub struct Endpoint<N> {
    base: Address,
    query: Vec<QueryParam>,
    handler: Arc<N>,
    filter_translator: Option<FilterTranslator>,
    sort_translator: Option<SortTranslator>,
}

impl<N> Endpoint<N> {
    /// Create an endpoint. Trailing slashes on `base` are dropped.
    pub fn new(base: impl Into<Address>, handler: N) -> Self {
        Self::with_shared_handler(base, Arc::new(handler))
    }

    /// Create an endpoint around a handler shared with other endpoints.
    pub fn with_shared_handler(base: impl Into<Address>, handler: Arc<N>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self {
            base,
            query: Vec::new(),
            handler,
            filter_translator: None,
            sort_translator: None,
        }
    }

    /// Default filter translator for server strategies that bring none.
    pub fn with_filter_translator(
        mut self,
        translator: impl Fn(&str, Operator, &str) -> QueryParam + Send + Sync + 'static,
    ) -> Self {
        self.filter_translator = Some(Arc::new(translator));
        self
    }

    /// Default sort translator for server strategies that bring none.
    pub fn with_sort_translator(
        mut self,
        translator: impl Fn(SortDirection, &str) -> QueryParam + Send + Sync + 'static,
    ) -> Self {
        self.sort_translator = Some(Arc::new(translator));
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn handler(&self) -> &Arc<N> {
        &self.handler
    }

    pub fn query(&self) -> &[QueryParam] {
        &self.query
    }

    pub fn filter_translator(&self) -> Option<&FilterTranslator> {
        self.filter_translator.as_ref()
    }

    pub fn sort_translator(&self) -> Option<&SortTranslator> {
        self.sort_translator.as_ref()
    }

    /// Address of one element below the base, e.g. `base/7`.
    ///
    /// The segment is percent-encoded. Collection query parameters are not
    /// carried over to element addresses.
    pub fn append_path(&self, segment: &str) -> Address {
        format!("{}/{}", self.base, urlencoding::encode(segment))
    }

    /// Append query parameters after any already present.
    pub fn append_query(&mut self, params: impl IntoIterator<Item = QueryParam>) {
        self.query.extend(params);
    }

    /// The composed collection address: base plus encoded query parameters.
    pub fn address(&self) -> Address {
        if self.query.is_empty() {
            self.base.clone()
        } else {
            format!("{}?{}", self.base, encode_query(&self.query))
        }
    }
}

#[cfg(feature = "http")]
impl Endpoint<crate::http::HttpNetworkHandler> {
    /// Endpoint talking JSON over HTTP with no authorization.
    pub fn json(base: impl Into<Address>) -> Self {
        Self::new(base, crate::http::HttpNetworkHandler::new())
    }
}

impl<N> Clone for Endpoint<N> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            query: self.query.clone(),
            handler: Arc::clone(&self.handler),
            filter_translator: self.filter_translator.clone(),
            sort_translator: self.sort_translator.clone(),
        }
    }
}

impl<N> fmt::Debug for Endpoint<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("base", &self.base)
            .field("query", &self.query)
            .field("filter_translator", &self.filter_translator.is_some())
            .field("sort_translator", &self.sort_translator.is_some())
            .finish()
    }
}
