//! # Tether Engine
//!
//! Keeps a local, ordered collection of typed elements in sync with a remote
//! REST resource collection.
//!
//! The caller only ever replaces the whole collection. The engine diffs the
//! new collection against the current one, classifies every difference and
//! turns it into at most one network request:
//!
//! | change                              | request            |
//! |-------------------------------------|--------------------|
//! | new element without an identity     | `POST base`        |
//! | same identity, different content    | `PUT base/{id}`    |
//! | removed element with an identity    | `DELETE base/{id}` |
//! | removed element without an identity | none (local)       |
//! | reordered element                   | none (local)       |
//!
//! Responses are merged back as they arrive. Failed requests leave the
//! collection untouched and are reported as [`SyncEvent::Failed`].
//!
//! ## Core Concepts
//!
//! ### Elements
//!
//! An [`Element`] is any serde-serializable record with an optional,
//! server-assigned identity.
//!
//! ### Diff
//!
//! [`diff`] produces a [`Diff`] of insertions, removals, moves and edits.
//! Moves keep pure reorders off the network; edits make a content change one
//! PUT instead of a DELETE plus a POST.
//!
//! ### Strategies
//!
//! [`FilterStrategy`] and [`SortStrategy`] run client-side, or server-side by
//! appending query parameters to the [`Endpoint`] once and then also running
//! client-side. Server encodings come from [`query`] and can be overridden
//! per endpoint or per strategy.
//!
//! ### Binding
//!
//! A [`Binding`] owns the collection on a Tokio task, publishes every
//! converged state through a `watch` channel and optionally persists it via a
//! [`LocalCache`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde::{Deserialize, Serialize};
//! use tether_engine::{
//!     Binding, BindingOptions, Element, Endpoint, Field, Predicate, FilterStrategy, SortStrategy,
//!     Sorter,
//! };
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Account {
//!     id: Option<u64>,
//!     name: String,
//! }
//!
//! impl Element for Account {
//!     type Id = u64;
//!
//!     fn id(&self) -> Option<u64> {
//!         self.id
//!     }
//! }
//!
//! # async fn run() {
//! let name = Field::new("name", |a: &Account| a.name.clone());
//! let options = BindingOptions::new()
//!     .filter(FilterStrategy::server(vec![Predicate::exists(name.clone(), "Paul".to_string())]))
//!     .sort(SortStrategy::server(Sorter::ascending(name)));
//!
//! let accounts = Binding::new(Endpoint::json("https://example.com/api/accounts"), options);
//! assert_eq!(
//!     accounts.address(),
//!     "https://example.com/api/accounts?name%5Bexists%5D=Paul&sort_by=%2Bname"
//! );
//!
//! let mut next = accounts.read();
//! next.push(Account { id: None, name: "Paul".into() });
//! accounts.write(next);
//! accounts.settled().await;
//! # }
//! ```

pub mod binding;
pub mod cache;
pub mod diff;
pub mod element;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod field;
pub mod filter;
#[cfg(feature = "http")]
pub mod http;
pub mod network;
pub mod query;
pub mod request;
pub mod sort;

// Re-export main types at crate root
pub use binding::{Binding, BindingOptions};
pub use cache::{storage_key, CacheSnapshot, FileCache, LocalCache, SNAPSHOT_FORMAT_VERSION};
pub use diff::{diff, Change, Diff};
pub use element::Element;
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use event::SyncEvent;
pub use field::Field;
pub use filter::{Filter, FilterStrategy, Predicate};
#[cfg(feature = "http")]
pub use http::{Authorization, HttpNetworkHandler};
pub use network::NetworkHandler;
pub use query::{
    default_filter_translator, default_sort_translator, FilterTranslator, Operator, QueryParam,
    SortDirection, SortTranslator,
};
pub use request::{Request, RequestKind};
pub use sort::{SortStrategy, Sorter};

/// A fully composed resource address.
pub type Address = String;
