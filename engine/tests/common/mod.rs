//! Shared test helpers for binding tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tether_engine::{
    Binding, BindingOptions, Element, Endpoint, Error, Field, NetworkHandler, RequestKind, Result,
    SyncEvent,
};

pub const BASE: &str = "https://example.com/api/accounts";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<u64>,
    pub name: String,
}

impl Element for Account {
    type Id = u64;

    fn id(&self) -> Option<u64> {
        self.id
    }
}

pub fn account(id: u64, name: &str) -> Account {
    Account {
        id: Some(id),
        name: name.to_string(),
    }
}

pub fn unsaved(name: &str) -> Account {
    Account {
        id: None,
        name: name.to_string(),
    }
}

pub fn id_field() -> Field<Account, u64> {
    Field::new("id", |a: &Account| a.id.unwrap_or_default())
}

pub fn name_field() -> Field<Account, String> {
    Field::new("name", |a: &Account| a.name.clone())
}

/// A request as the remote saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub kind: RequestKind,
    pub address: String,
    pub body: Option<Account>,
}

#[derive(Default)]
struct Remote {
    accounts: Vec<Account>,
    next_id: u64,
    log: Vec<Recorded>,
    failing: HashMap<RequestKind, usize>,
    delays: HashMap<RequestKind, Vec<Duration>>,
}

/// In-memory remote collection with a request log.
///
/// Answers like a REST server would: POST assigns the next id, PUT replaces
/// by the id in the address, DELETE removes it. Failures and delays can be
/// scripted per request kind.
#[derive(Default)]
pub struct MockRemote {
    remote: Mutex<Remote>,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_accounts(accounts: Vec<Account>) -> Arc<Self> {
        let mock = Self::default();
        {
            let mut remote = mock.remote.lock().unwrap();
            remote.next_id = accounts.iter().filter_map(|a| a.id).max().unwrap_or(0);
            remote.accounts = accounts;
        }
        Arc::new(mock)
    }

    /// Fail the next `times` requests of `kind`.
    pub fn fail(&self, kind: RequestKind, times: usize) {
        *self.remote.lock().unwrap().failing.entry(kind).or_default() += times;
    }

    /// Delay the next requests of `kind`, one duration per request.
    pub fn delay(&self, kind: RequestKind, delays: Vec<Duration>) {
        self.remote
            .lock()
            .unwrap()
            .delays
            .entry(kind)
            .or_default()
            .extend(delays);
    }

    pub fn set_accounts(&self, accounts: Vec<Account>) {
        self.remote.lock().unwrap().accounts = accounts;
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.remote.lock().unwrap().accounts.clone()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.remote.lock().unwrap().log.clone()
    }

    pub fn count(&self, kind: RequestKind) -> usize {
        self.requests().iter().filter(|r| r.kind == kind).count()
    }

    pub fn clear_log(&self) {
        self.remote.lock().unwrap().log.clear();
    }

    /// Record the request, then wait out any scripted delay. Returns whether
    /// the request should fail.
    async fn enter(&self, kind: RequestKind, address: &str, body: Option<&Account>) -> bool {
        let (delay, fail) = {
            let mut remote = self.remote.lock().unwrap();
            remote.log.push(Recorded {
                kind,
                address: address.to_string(),
                body: body.cloned(),
            });
            let delay = remote.delays.get_mut(&kind).and_then(|d| {
                if d.is_empty() {
                    None
                } else {
                    Some(d.remove(0))
                }
            });
            let fail = match remote.failing.get_mut(&kind) {
                Some(n) if *n > 0 => {
                    *n -= 1;
                    true
                }
                _ => false,
            };
            (delay, fail)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        fail
    }

    fn id_from(address: &str) -> Option<u64> {
        address.rsplit('/').next()?.parse().ok()
    }
}

#[async_trait]
impl NetworkHandler<Account> for MockRemote {
    async fn get(&self, address: &str) -> Result<Vec<Account>> {
        if self.enter(RequestKind::Get, address, None).await {
            return Err(Error::Transport("scripted GET failure".into()));
        }
        Ok(self.accounts())
    }

    async fn post(&self, element: &Account, address: &str) -> Result<Account> {
        if self.enter(RequestKind::Post, address, Some(element)).await {
            return Err(Error::Transport("scripted POST failure".into()));
        }
        let mut remote = self.remote.lock().unwrap();
        remote.next_id += 1;
        let stored = Account {
            id: Some(remote.next_id),
            name: element.name.clone(),
        };
        remote.accounts.push(stored.clone());
        Ok(stored)
    }

    async fn put(&self, element: &Account, address: &str) -> Result<Account> {
        if self.enter(RequestKind::Put, address, Some(element)).await {
            return Err(Error::Transport("scripted PUT failure".into()));
        }
        let id = Self::id_from(address);
        let mut remote = self.remote.lock().unwrap();
        let slot = remote.accounts.iter_mut().find(|a| a.id.is_some() && a.id == id);
        match slot {
            Some(slot) => {
                *slot = Account {
                    id,
                    name: element.name.clone(),
                };
                Ok(slot.clone())
            }
            None => Err(Error::Status {
                status: 404,
                address: address.to_string(),
            }),
        }
    }

    async fn delete(&self, address: &str) -> Result<()> {
        if self.enter(RequestKind::Delete, address, None).await {
            return Err(Error::Transport("scripted DELETE failure".into()));
        }
        let id = Self::id_from(address);
        let mut remote = self.remote.lock().unwrap();
        let before = remote.accounts.len();
        remote.accounts.retain(|a| a.id.is_none() || a.id != id);
        if remote.accounts.len() == before {
            return Err(Error::Status {
                status: 404,
                address: address.to_string(),
            });
        }
        Ok(())
    }
}

pub fn endpoint(remote: &Arc<MockRemote>) -> Endpoint<MockRemote> {
    Endpoint::with_shared_handler(BASE, Arc::clone(remote))
}

/// A binding with no strategies that has finished its initial load.
pub async fn bound(remote: &Arc<MockRemote>) -> Binding<Account> {
    let binding = Binding::new(endpoint(remote), BindingOptions::new());
    binding.settled().await;
    binding
}

/// Everything received so far.
pub fn drain(events: &mut tokio::sync::broadcast::Receiver<SyncEvent<Account>>) -> Vec<SyncEvent<Account>> {
    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    received
}
