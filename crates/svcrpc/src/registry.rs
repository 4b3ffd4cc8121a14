//! # Service Tables
//!
//! - [`Registry`]: services this node owns, by name and by id.
//! - [`ForeignTables`]: proxies for services other peers own, one table per
//!   peer, keyed by the remote id.
//!
//! All maps hand out clones of the `Arc`s they hold. Callers never run user
//! code while holding a map guard.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU16;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::Error;
use crate::error::Result;
use crate::service::Service;
use crate::types::PeerId;
use crate::types::ServiceId;

pub(crate) struct Registry {
    names: DashMap<String, Arc<dyn Service>>,
    /// The one name each published service is bound under.
    named: DashMap<ServiceId, String>,
    locals: DashMap<ServiceId, Arc<dyn Service>>,
    next_id: AtomicU16,
    first_id: ServiceId,
}

impl Registry {
    pub fn new(first_id: ServiceId) -> Self {
        Self {
            names: DashMap::new(),
            named: DashMap::new(),
            locals: DashMap::new(),
            next_id: AtomicU16::new(first_id),
            first_id,
        }
    }

    /// Picks the next free id, skipping the reserved range and ids still in use.
    ///
    /// Only ids at or above the first id count towards the attempt budget, so
    /// the counter wrapping through the reserved range never cuts the search
    /// short.
    pub fn allocate(&self) -> Result<ServiceId> {
        let span = usize::from(u16::MAX - self.first_id) + 1;
        let mut tried = 0;
        while tried < span {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if id < self.first_id {
                continue;
            }
            tried += 1;
            if !self.locals.contains_key(&id) {
                return Ok(id);
            }
        }
        Err(Error::ServiceIdsExhausted)
    }

    pub fn insert_local(&self, id: ServiceId, service: Arc<dyn Service>) {
        self.locals.insert(id, service);
    }

    pub fn remove_local(&self, id: ServiceId) {
        self.locals.remove(&id);
    }

    pub fn local(&self, id: ServiceId) -> Option<Arc<dyn Service>> {
        self.locals.get(&id).map(|e| e.value().clone())
    }

    /// Binds `name` to the service with id `id`.
    ///
    /// Returns `None` once bound. Returns the service already published
    /// instead if the name is taken, or if this service already has a name:
    /// a service is bound under at most one name.
    pub fn bind_name(&self, name: &str, id: ServiceId, service: Arc<dyn Service>) -> Option<Arc<dyn Service>> {
        let outcome = match self.named.entry(id) {
            Entry::Occupied(e) => Err(e.get().clone()),
            Entry::Vacant(named) => match self.names.entry(name.to_owned()) {
                Entry::Occupied(e) => Ok(Some(e.get().clone())),
                Entry::Vacant(slot) => {
                    slot.insert(service);
                    named.insert(name.to_owned());
                    Ok(None)
                }
            },
        };
        match outcome {
            Ok(holder) => holder,
            Err(current) => self.lookup(&current),
        }
    }

    /// The name the service with id `id` is bound under.
    pub fn name_of(&self, id: ServiceId) -> Option<String> {
        self.named.get(&id).map(|e| e.value().clone())
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Service>> {
        self.names.get(name).map(|e| e.value().clone())
    }

    /// Unbinds the name. The id stays valid so held references keep working.
    pub fn remove_name(&self, name: &str) -> Option<Arc<dyn Service>> {
        let (_, service) = self.names.remove(name)?;
        if let Some(id) = service.binding().id() {
            self.named.remove(&id);
        }
        Some(service)
    }

    pub fn names(&self) -> Vec<String> {
        self.names.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.locals.len()
    }
}

pub(crate) struct ForeignEntry {
    pub service: Arc<dyn Service>,
    /// The typed handle, an `Arc<I>` for the interface the proxy was built for.
    pub handle: Box<dyn Any + Send + Sync>,
}

pub(crate) struct ForeignTables {
    peers: DashMap<PeerId, HashMap<ServiceId, ForeignEntry>>,
}

impl ForeignTables {
    pub fn new() -> Self {
        Self { peers: DashMap::new() }
    }

    pub fn get(&self, peer: PeerId, id: ServiceId) -> Option<Arc<dyn Service>> {
        let table = self.peers.get(&peer)?;
        table.get(&id).map(|e| e.service.clone())
    }

    /// Inserts unless an entry exists. Returns the handle that ends up stored.
    pub fn insert_if_absent<R>(
        &self,
        peer: PeerId,
        id: ServiceId,
        make: impl FnOnce() -> ForeignEntry,
        f: impl FnOnce(&(dyn Any + Send + Sync)) -> R,
    ) -> R {
        let mut table = self.peers.entry(peer).or_default();
        let entry = table.entry(id).or_insert_with(make);
        f(entry.handle.as_ref())
    }

    pub fn len(&self, peer: PeerId) -> usize {
        self.peers.get(&peer).map_or(0, |t| t.len())
    }

    pub fn remove_peer(&self, peer: PeerId) -> Option<HashMap<ServiceId, ForeignEntry>> {
        self.peers.remove(&peer).map(|(_, t)| t)
    }
}
