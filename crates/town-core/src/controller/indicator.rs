//! Deferred auto-expiry for speech and thinking indicators.
//!
//! Every show request carries a generation token; the matching expiry entry
//! stores that token plus a deadline on the controller clock. The tick sweep
//! collects due entries and the controller applies only those whose token
//! still matches the entity's current one — a stale deadline left over from
//! an earlier request can never clobber a newer indicator.

use crate::state::NpcId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum IndicatorKind {
    Speech,
    Thinking,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PendingExpiry {
    pub id: NpcId,
    pub kind: IndicatorKind,
    pub token: u64,
    pub deadline_ms: u64,
}

#[derive(Debug, Default)]
pub(crate) struct ExpiryQueue {
    entries: Vec<PendingExpiry>,
}

impl ExpiryQueue {
    pub(crate) fn schedule(&mut self, id: NpcId, kind: IndicatorKind, token: u64, deadline_ms: u64) {
        self.entries.push(PendingExpiry {
            id,
            kind,
            token,
            deadline_ms,
        });
    }

    /// Removes and returns every entry whose deadline has passed, preserving
    /// scheduling order.
    pub(crate) fn take_due(&mut self, now_ms: u64) -> Vec<PendingExpiry> {
        let (due, remaining) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| entry.deadline_ms <= now_ms);
        self.entries = remaining;
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_due_splits_on_the_deadline() {
        let mut queue = ExpiryQueue::default();
        queue.schedule(NpcId::from("a"), IndicatorKind::Speech, 1, 100);
        queue.schedule(NpcId::from("b"), IndicatorKind::Thinking, 1, 300);

        let due = queue.take_due(200);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, NpcId::from("a"));

        let rest = queue.take_due(400);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].kind, IndicatorKind::Thinking);
        assert!(queue.take_due(u64::MAX).is_empty());
    }
}
