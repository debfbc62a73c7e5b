//! Listener registry with queued snapshot dispatch.
//!
//! A publish enqueues a snapshot and, when no dispatch is already running,
//! drains the queue in order. A publish requested while a dispatch is active
//! (a listener mutated state and triggered another notification) only
//! extends the queue; the active dispatcher delivers it strictly after the
//! current round finishes. Nothing recurses and no event is dropped.
//!
//! The controller invokes listeners with its lock released, so entries are
//! checked out for the duration of a round and merged back afterward;
//! subscribe/unsubscribe calls made by a listener mid-round are honored from
//! the next round on.

use std::collections::VecDeque;
use std::fmt;

/// Handle returned by subscribe operations; pass it back to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

pub(crate) type Callback<S> = Box<dyn FnMut(&S) + Send>;

pub(crate) struct Entry<S> {
    id: SubscriptionId,
    callback: Callback<S>,
}

impl<S> Entry<S> {
    pub(crate) fn invoke(&mut self, snapshot: &S) {
        (self.callback)(snapshot);
    }
}

pub(crate) struct ListenerSet<S> {
    next_id: u64,
    entries: Vec<Entry<S>>,
    dispatching: bool,
    pending: VecDeque<S>,
    /// Ids unsubscribed while their entries were checked out of the set.
    dropped: Vec<SubscriptionId>,
}

impl<S> Default for ListenerSet<S> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
            dispatching: false,
            pending: VecDeque::new(),
            dropped: Vec::new(),
        }
    }
}

impl<S> ListenerSet<S> {
    pub(crate) fn subscribe(&mut self, callback: Callback<S>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, callback });
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) {
        self.entries.retain(|entry| entry.id != id);
        if self.dispatching {
            self.dropped.push(id);
        }
    }

    pub(crate) fn enqueue(&mut self, snapshot: S) {
        self.pending.push_back(snapshot);
    }

    /// Claims the dispatcher role. Returns false when a dispatch is already
    /// running further up the stack; that dispatcher owns the queue.
    pub(crate) fn try_begin_dispatch(&mut self) -> bool {
        if self.dispatching {
            return false;
        }
        self.dispatching = true;
        true
    }

    pub(crate) fn finish_dispatch(&mut self) {
        self.dispatching = false;
        self.dropped.clear();
    }

    pub(crate) fn next_pending(&mut self) -> Option<S> {
        self.pending.pop_front()
    }

    pub(crate) fn take_entries(&mut self) -> Vec<Entry<S>> {
        std::mem::take(&mut self.entries)
    }

    /// Merges checked-out entries back, honoring any mid-round unsubscribes
    /// and keeping listeners subscribed mid-round at the tail.
    pub(crate) fn restore_entries(&mut self, mut checked_out: Vec<Entry<S>>) {
        checked_out.retain(|entry| !self.dropped.contains(&entry.id));
        checked_out.append(&mut self.entries);
        self.entries = checked_out;
        self.dropped.clear();
    }
}
