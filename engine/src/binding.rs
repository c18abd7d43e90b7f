//! The binding: a local collection kept in sync with a remote collection.
//!
//! # Model
//!
//! A [`Binding`] is a handle onto a task that owns the collection. Every
//! mutation happens on that task:
//!
//! 1. [`Binding::write`] sends the desired collection to the task and
//!    returns at once.
//! 2. The task diffs it against the current collection, applies what needs
//!    no network (moves, removal of never-saved elements) and dispatches one
//!    request per remaining change.
//! 3. Each response is folded back into the collection when it arrives;
//!    failures leave the collection as it was.
//! 4. After every change the filter and sort strategies run, the result is
//!    published to subscribers and a cache snapshot is handed to the blocking
//!    pool. At most one snapshot per binding is being written at a time; a
//!    newer one waits and replaces any older one still waiting.
//!
//! Requests from one write, and from successive writes, complete in any
//! order. A newer GET cancels an unfinished GET, and a newer PUT for an
//! identity cancels an unfinished PUT for the same identity.

use crate::cache::{storage_key, LocalCache};
use crate::diff::diff;
use crate::error::{Error, Result};
use crate::event::SyncEvent;
use crate::filter::FilterStrategy;
use crate::request::{plan_write, Request, RequestKind, Response};
use crate::sort::SortStrategy;
use crate::{Address, Element, Endpoint, NetworkHandler};
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::{AbortHandle, JoinError, JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Capacity of the event channel; slow receivers see `Lagged`.
const EVENT_CAPACITY: usize = 256;

type Ticket = u64;
type Joined<E> = (Ticket, Request<E>, Result<Response<E>>);

/// Strategies and cache for a new binding.
pub struct BindingOptions<E: Element> {
    filter: FilterStrategy<E>,
    sort: SortStrategy<E>,
    cache: Option<Arc<dyn LocalCache<E>>>,
}

impl<E: Element> BindingOptions<E> {
    /// No filter, no sort, no cache.
    pub fn new() -> Self {
        Self {
            filter: FilterStrategy::None,
            sort: SortStrategy::None,
            cache: None,
        }
    }

    pub fn filter(mut self, filter: FilterStrategy<E>) -> Self {
        self.filter = filter;
        self
    }

    pub fn sort(mut self, sort: SortStrategy<E>) -> Self {
        self.sort = sort;
        self
    }

    pub fn cache(self, cache: impl LocalCache<E>) -> Self {
        self.shared_cache(Arc::new(cache))
    }

    pub fn shared_cache(mut self, cache: Arc<dyn LocalCache<E>>) -> Self {
        self.cache = Some(cache);
        self
    }
}

impl<E: Element> Default for BindingOptions<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Element> fmt::Debug for BindingOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingOptions")
            .field("filter", &self.filter)
            .field("sort", &self.sort)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

enum Command<E> {
    Write(Vec<E>),
    Refresh,
    Settle(oneshot::Sender<()>),
}

/// A local collection bound to a remote resource collection.
///
/// There is no way to construct a binding with initial elements: it is
/// hydrated only from its cache and from the remote.
pub struct Binding<E: Element> {
    commands: mpsc::UnboundedSender<Command<E>>,
    state: watch::Receiver<Vec<E>>,
    events: broadcast::Sender<SyncEvent<E>>,
    address: Address,
    storage_key: Option<String>,
    task: JoinHandle<()>,
}

impl<E: Element> Binding<E> {
    /// Bind to `endpoint` and start loading.
    ///
    /// Server-side strategies append their query parameters to the endpoint
    /// first. If a cache is configured its snapshot is read before anything
    /// goes over the network, then one GET is issued against the composed
    /// address.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new<N: NetworkHandler<E>>(mut endpoint: Endpoint<N>, options: BindingOptions<E>) -> Self {
        let BindingOptions {
            mut filter,
            mut sort,
            cache,
        } = options;

        let appended = filter.activate(&mut endpoint) | sort.activate(&mut endpoint);
        let address = endpoint.address();
        if appended {
            debug!(%address, "server strategies appended query parameters");
        }

        let cache = cache.map(|cache| (cache, storage_key(E::type_name(), &address)));
        let elements = match &cache {
            Some((cache, key)) => cache.load(key),
            None => Vec::new(),
        };
        let storage_key = cache.as_ref().map(|(_, key)| key.clone());

        let (state_tx, state) = watch::channel(elements.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (commands, receiver) = mpsc::unbounded_channel();

        let reconciler = Reconciler {
            elements,
            endpoint,
            filter,
            sort,
            cache: CacheWriter::new(cache),
            state: state_tx,
            events: events.clone(),
            tasks: JoinSet::new(),
            in_flight: HashMap::new(),
            next_ticket: 0,
            waiters: Vec::new(),
        };
        let task = tokio::spawn(reconciler.run(receiver));
        info!(%address, cached = storage_key.is_some(), "binding started");

        Self {
            commands,
            state,
            events,
            address,
            storage_key,
            task,
        }
    }

    /// The last published collection.
    pub fn read(&self) -> Vec<E> {
        self.state.borrow().clone()
    }

    /// Replace the collection.
    ///
    /// Returns immediately; the collection converges as requests complete.
    /// Failures are reported through [`events`](Self::events) only.
    pub fn write(&self, elements: Vec<E>) {
        self.send(Command::Write(elements));
    }

    /// Fetch the collection again, cancelling any unfinished fetch.
    pub fn refresh(&self) {
        self.send(Command::Refresh);
    }

    /// Wait until every command sent so far has been handled and no request
    /// is in flight.
    pub async fn settled(&self) {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Settle(tx));
        // An error means the task is gone; nothing is in flight then either.
        let _ = rx.await;
    }

    /// Receive every published collection.
    pub fn subscribe(&self) -> watch::Receiver<Vec<E>> {
        self.state.clone()
    }

    /// Receive per-request outcomes from now on.
    pub fn events(&self) -> broadcast::Receiver<SyncEvent<E>> {
        self.events.subscribe()
    }

    /// The composed collection address, query parameters included.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The cache storage key, when caching.
    pub fn storage_key(&self) -> Option<&str> {
        self.storage_key.as_deref()
    }

    fn send(&self, command: Command<E>) {
        if self.commands.send(command).is_err() {
            warn!(address = %self.address, "binding task has stopped, command dropped");
        }
    }
}

impl<E: Element> Drop for Binding<E> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl<E: Element> fmt::Debug for Binding<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("address", &self.address)
            .field("storage_key", &self.storage_key)
            .field("len", &self.state.borrow().len())
            .finish()
    }
}

struct InFlight<Id> {
    kind: RequestKind,
    identity: Option<Id>,
    abort: AbortHandle,
}

/// State owned by the binding task.
struct Reconciler<E: Element, N> {
    elements: Vec<E>,
    endpoint: Endpoint<N>,
    filter: FilterStrategy<E>,
    sort: SortStrategy<E>,
    cache: CacheWriter<E>,
    state: watch::Sender<Vec<E>>,
    events: broadcast::Sender<SyncEvent<E>>,
    tasks: JoinSet<Joined<E>>,
    in_flight: HashMap<Ticket, InFlight<E::Id>>,
    next_ticket: Ticket,
    waiters: Vec<oneshot::Sender<()>>,
}

impl<E: Element, N: NetworkHandler<E>> Reconciler<E, N> {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command<E>>) {
        self.fetch();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.complete(joined);
                }
                () = self.cache.finished(), if self.cache.is_running() => {}
            }
            self.release_waiters();
        }

        self.cache.flush().await;
        debug!(address = %self.endpoint.address(), "binding stopped");
    }

    fn handle(&mut self, command: Command<E>) {
        match command {
            Command::Write(elements) => self.write(elements),
            Command::Refresh => self.fetch(),
            Command::Settle(waiter) => self.waiters.push(waiter),
        }
    }

    fn fetch(&mut self) {
        let address = self.endpoint.address();
        self.dispatch(Request::Get { address });
    }

    fn write(&mut self, written: Vec<E>) {
        let diff = diff(&self.elements, &written);
        if diff.is_empty() {
            debug!("write changed nothing");
            return;
        }

        let plan = plan_write(&diff, &self.elements, &self.endpoint);
        debug!(
            changes = diff.len(),
            requests = plan.requests.len(),
            local_removals = plan.local_removals.len(),
            "write planned"
        );

        let mut next = diff.apply_moves(&self.elements, &written);
        let mut local_removals = plan.local_removals;
        local_removals.sort_unstable_by(|a, b| b.cmp(a));
        for position in local_removals {
            next.remove(position);
        }
        self.elements = next;

        for request in plan.requests {
            self.dispatch(request);
        }
        self.converge();
    }

    fn dispatch(&mut self, request: Request<E>) {
        let kind = request.kind();
        let identity = request.identity();
        self.supersede(kind, identity.as_ref());

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        debug!(ticket, %kind, address = request.address(), "dispatching request");

        let handler = Arc::clone(self.endpoint.handler());
        let abort = self.tasks.spawn(async move {
            let result = AssertUnwindSafe(request.send(handler.as_ref()))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(Error::Transport("network handler panicked".into())));
            (ticket, request, result)
        });

        self.in_flight.insert(
            ticket,
            InFlight {
                kind,
                identity,
                abort,
            },
        );
    }

    /// Cancel the unfinished request a new one of `kind` replaces.
    fn supersede(&mut self, kind: RequestKind, identity: Option<&E::Id>) {
        self.in_flight.retain(|ticket, entry| {
            let replaced = entry.kind == kind
                && match kind {
                    RequestKind::Get => true,
                    RequestKind::Put => identity.is_some() && entry.identity.as_ref() == identity,
                    RequestKind::Post | RequestKind::Delete => false,
                };
            if replaced {
                debug!(ticket = *ticket, %kind, "superseding unfinished request");
                entry.abort.abort();
            }
            !replaced
        });
    }

    fn complete(&mut self, joined: std::result::Result<Joined<E>, JoinError>) {
        let (ticket, request, result) = match joined {
            Ok(joined) => joined,
            Err(e) => {
                if !e.is_cancelled() {
                    warn!(error = %e, "request task failed");
                }
                return;
            }
        };

        // Superseded requests may still finish before the abort lands.
        if self.in_flight.remove(&ticket).is_none() {
            debug!(ticket, "discarding superseded response");
            return;
        }

        match (request, result) {
            (Request::Get { .. }, Ok(Response::Collection(elements))) => {
                let count = elements.len();
                debug!(ticket, count, "collection loaded");
                self.elements = elements;
                self.converge();
                self.emit(SyncEvent::Loaded { count });
            }
            (Request::Post { element, .. }, Ok(Response::Element(stored))) => {
                debug!(ticket, id = ?stored.id(), "element created");
                self.place(&element, stored.clone());
                self.converge();
                self.emit(SyncEvent::Created(stored));
            }
            (Request::Put { element, .. }, Ok(Response::Element(stored))) => {
                debug!(ticket, id = ?stored.id(), "element updated");
                self.place(&element, stored.clone());
                self.converge();
                self.emit(SyncEvent::Updated(stored));
            }
            (Request::Delete { element, .. }, Ok(Response::Deleted)) => {
                debug!(ticket, id = ?element.id(), "element deleted");
                self.elements.retain(|e| !e.same_identity(&element));
                self.converge();
                self.emit(SyncEvent::Deleted(element));
            }
            (request, Ok(_)) => {
                warn!(ticket, kind = %request.kind(), "response does not match request, ignoring");
            }
            (request, Err(error)) => {
                let kind = request.kind();
                warn!(
                    ticket,
                    %kind,
                    address = request.address(),
                    error = %error,
                    "request failed, collection left unchanged"
                );
                self.emit(SyncEvent::Failed {
                    kind,
                    element: request.element().cloned(),
                    error,
                });
            }
        }
    }

    /// Put a stored element where the element it was stored from (or one
    /// with the stored identity) sits, or append it.
    fn place(&mut self, sent: &E, stored: E) {
        let position = self
            .elements
            .iter()
            .position(|e| e.same_identity(sent) || e.same_identity(&stored));
        match position {
            Some(position) => self.elements[position] = stored,
            None => self.elements.push(stored),
        }
    }

    /// Filter, sort, persist and publish.
    fn converge(&mut self) {
        self.filter.apply(&mut self.elements);
        self.sort.apply(&mut self.elements);

        self.cache.save(&self.elements);

        let elements = &self.elements;
        self.state.send_if_modified(|published| {
            if published == elements {
                false
            } else {
                published.clone_from(elements);
                true
            }
        });
    }

    fn emit(&self, event: SyncEvent<E>) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn release_waiters(&mut self) {
        if self.in_flight.is_empty() && self.cache.is_idle() {
            for waiter in self.waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }
}

/// Writes cache snapshots on the blocking pool, one at a time.
struct CacheWriter<E: Element> {
    target: Option<(Arc<dyn LocalCache<E>>, String)>,
    running: Option<JoinHandle<()>>,
    pending: Option<Vec<E>>,
}

impl<E: Element> CacheWriter<E> {
    fn new(target: Option<(Arc<dyn LocalCache<E>>, String)>) -> Self {
        Self {
            target,
            running: None,
            pending: None,
        }
    }

    fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn is_idle(&self) -> bool {
        self.running.is_none() && self.pending.is_none()
    }

    /// Queue a snapshot. A snapshot still waiting is replaced.
    fn save(&mut self, elements: &[E]) {
        if self.target.is_none() {
            return;
        }
        if self.running.is_some() {
            self.pending = Some(elements.to_vec());
        } else {
            self.start(elements.to_vec());
        }
    }

    fn start(&mut self, elements: Vec<E>) {
        let Some((cache, key)) = &self.target else {
            return;
        };
        let (cache, key) = (Arc::clone(cache), key.clone());
        self.running = Some(tokio::task::spawn_blocking(move || {
            cache.save(&key, &elements);
        }));
    }

    /// Wait for the running write, then start the waiting snapshot.
    async fn finished(&mut self) {
        if let Some(running) = self.running.as_mut() {
            if let Err(e) = running.await {
                warn!(error = %e, "cache write task failed");
            }
        }
        self.running = None;
        if let Some(next) = self.pending.take() {
            self.start(next);
        }
    }

    async fn flush(&mut self) {
        while !self.is_idle() {
            self.finished().await;
        }
    }
}
