//! # Return Slots
//!
//! Pending continuations, keyed by slot id. A slot is created when a callback
//! or a connect request is sent, and consumed by the first `RETURN` that names
//! it. Later `RETURN`s for the same slot find nothing and are dropped, which
//! gives at-most-once delivery.

use std::sync::Mutex;
use std::sync::atomic::AtomicU16;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::Error;
use crate::error::Result;
use crate::marshal::ArgReader;
use crate::types::PeerId;
use crate::types::SlotId;

/// Work to run when the reply for a slot arrives. Reads the reply payload.
pub type Continuation = Box<dyn FnOnce(&mut ArgReader<'_>) -> Result<()> + Send>;

struct Slot {
    /// The peer expected to answer.
    peer: PeerId,
    // DashMap values must be Sync; the lock is only taken once, on removal.
    continuation: Mutex<Continuation>,
}

pub(crate) struct ReturnSlots {
    slots: DashMap<SlotId, Slot>,
    next_id: AtomicU16,
}

impl ReturnSlots {
    pub fn new(first_id: SlotId) -> Self {
        Self {
            slots: DashMap::new(),
            next_id: AtomicU16::new(first_id),
        }
    }

    /// Stores `continuation` under the next slot id.
    ///
    /// The counter wraps. If the id it lands on is still pending the call
    /// fails with [`Error::SlotInUse`] and the pending slot is left alone.
    pub fn register(&self, peer: PeerId, continuation: Continuation) -> Result<SlotId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        match self.slots.entry(id) {
            Entry::Occupied(_) => Err(Error::SlotInUse(id)),
            Entry::Vacant(v) => {
                v.insert(Slot { peer, continuation: Mutex::new(continuation) });
                Ok(id)
            }
        }
    }

    /// Removes the slot and hands back its continuation.
    pub fn take(&self, id: SlotId) -> Option<(PeerId, Continuation)> {
        let (_, slot) = self.slots.remove(&id)?;
        let continuation = match slot.continuation.into_inner() {
            Ok(c) => c,
            Err(poisoned) => poisoned.into_inner(),
        };
        Some((slot.peer, continuation))
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Removes every slot waiting on `peer` and returns their continuations.
    ///
    /// Keys are collected first so no shard lock is held while removing, and
    /// the continuations are dropped by the caller outside the map.
    pub fn drain_peer(&self, peer: PeerId) -> Vec<Continuation> {
        let ids: Vec<SlotId> = self
            .slots
            .iter()
            .filter(|e| e.value().peer == peer)
            .map(|e| *e.key())
            .collect();

        ids.into_iter()
            .filter_map(|id| self.take(id))
            .map(|(_, c)| c)
            .collect()
    }
}
