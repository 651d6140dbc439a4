use std::collections::HashMap;
use std::hash::Hash;

/// Logical request classes that get independent sequence counters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestClass {
    Search,
    File(String),
}

/// Label attached to an outgoing fetch and handed back with its completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket<K = RequestClass> {
    pub class: K,
    pub id: u64,
    pub epoch: u64,
}

impl Ticket<RequestClass> {
    /// The pinned path a file-fetch ticket belongs to.
    pub fn path(&self) -> Option<&str> {
        match &self.class {
            RequestClass::File(path) => Some(path),
            RequestClass::Search => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Slot {
    issued: u64,
    accepted: u64,
    resolved: u64,
}

/// Last-issued-wins admission of asynchronous completions.
///
/// Every class has its own counter. A completion is admitted only if no newer
/// request of its class has been issued since, and only once. `reset` starts
/// a new epoch: counters go back to zero and nothing issued before the reset
/// is ever admitted, even if its id collides with a fresh one.
#[derive(Debug)]
pub struct Sequencer<K = RequestClass> {
    slots: HashMap<K, Slot>,
    epoch: u64,
}

impl<K> Default for Sequencer<K> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            epoch: 0,
        }
    }
}

impl<K: Eq + Hash + Clone> Sequencer<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn issue(&mut self, class: K) -> Ticket<K> {
        let slot = self.slots.entry(class.clone()).or_default();
        slot.issued += 1;
        Ticket {
            class,
            id: slot.issued,
            epoch: self.epoch,
        }
    }

    pub fn is_current(&self, ticket: &Ticket<K>) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }
        self.slots
            .get(&ticket.class)
            .is_some_and(|slot| ticket.id == slot.issued && ticket.id > slot.accepted)
    }

    pub fn admit(&mut self, ticket: &Ticket<K>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        if let Some(slot) = self.slots.get_mut(&ticket.class) {
            slot.accepted = ticket.id;
            slot.resolved = ticket.id;
        }
        true
    }

    /// Mark a failed completion as settled. Only the latest request of its
    /// class counts; the accepted marker does not move.
    pub fn abandon(&mut self, ticket: &Ticket<K>) {
        if ticket.epoch != self.epoch {
            return;
        }
        if let Some(slot) = self.slots.get_mut(&ticket.class)
            && ticket.id == slot.issued
        {
            slot.resolved = ticket.id;
        }
    }

    pub fn is_pending(&self, class: &K) -> bool {
        self.slots
            .get(class)
            .is_some_and(|slot| slot.issued > slot.resolved)
    }

    pub fn latest(&self, class: &K) -> u64 {
        self.slots.get(class).map_or(0, |slot| slot.issued)
    }

    pub fn last_accepted(&self, class: &K) -> u64 {
        self.slots.get(class).map_or(0, |slot| slot.accepted)
    }

    /// Drop the counters of a class with nothing in flight. Returns `false`
    /// (and keeps the slot) while its latest request is still pending.
    pub fn forget(&mut self, class: &K) -> bool {
        if self.is_pending(class) {
            return false;
        }
        self.slots.remove(class);
        true
    }

    pub fn reset(&mut self) {
        self.slots.clear();
        self.epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_above_zero_and_increase_per_class() {
        let mut seq = Sequencer::new();
        assert_eq!(seq.issue(RequestClass::Search).id, 1);
        assert_eq!(seq.issue(RequestClass::Search).id, 2);
        assert_eq!(seq.issue(RequestClass::File("a.rs".into())).id, 1);
        assert_eq!(seq.issue(RequestClass::File("b.rs".into())).id, 1);
        assert_eq!(seq.issue(RequestClass::Search).id, 3);
        assert_eq!(seq.latest(&RequestClass::Search), 3);
    }

    #[test]
    fn newest_wins_when_completions_arrive_3_1_2() {
        let mut seq = Sequencer::new();
        let t1 = seq.issue(RequestClass::Search);
        let t2 = seq.issue(RequestClass::Search);
        let t3 = seq.issue(RequestClass::Search);

        assert!(seq.admit(&t3));
        assert!(!seq.admit(&t1));
        assert!(!seq.admit(&t2));
        assert_eq!(seq.last_accepted(&RequestClass::Search), 3);
    }

    #[test]
    fn older_completion_discarded_once_newer_issued() {
        let mut seq = Sequencer::new();
        let t1 = seq.issue(RequestClass::Search);
        assert!(seq.is_pending(&RequestClass::Search));
        let t2 = seq.issue(RequestClass::Search);

        assert!(!seq.admit(&t1));
        assert!(seq.is_pending(&RequestClass::Search));
        assert!(seq.admit(&t2));
        assert!(!seq.is_pending(&RequestClass::Search));
    }

    #[test]
    fn a_completion_is_admitted_only_once() {
        let mut seq = Sequencer::new();
        let t1 = seq.issue(RequestClass::Search);
        assert!(seq.admit(&t1));
        assert!(!seq.admit(&t1));
    }

    #[test]
    fn classes_do_not_interfere() {
        let mut seq = Sequencer::new();
        let search = seq.issue(RequestClass::Search);
        let a = seq.issue(RequestClass::File("a.rs".into()));
        let _newer_b = seq.issue(RequestClass::File("b.rs".into()));

        assert!(seq.admit(&a));
        assert!(seq.admit(&search));
    }

    #[test]
    fn reset_discards_tickets_from_previous_epoch() {
        let mut seq = Sequencer::new();
        let old = seq.issue(RequestClass::Search);
        seq.reset();
        let fresh = seq.issue(RequestClass::Search);

        assert_eq!(old.id, fresh.id);
        assert!(!seq.admit(&old));
        assert!(seq.admit(&fresh));
    }

    #[test]
    fn forget_keeps_slots_with_requests_in_flight() {
        let mut seq = Sequencer::new();
        let class = RequestClass::File("a.rs".into());
        let t1 = seq.issue(class.clone());

        assert!(!seq.forget(&class));
        assert_eq!(seq.latest(&class), 1);

        assert!(seq.admit(&t1));
        assert!(seq.forget(&class));
        assert_eq!(seq.latest(&class), 0);
        assert!(!seq.is_pending(&class));
    }

    #[test]
    fn abandon_clears_pending_without_accepting() {
        let mut seq = Sequencer::new();
        let t1 = seq.issue(RequestClass::Search);
        seq.abandon(&t1);
        assert!(!seq.is_pending(&RequestClass::Search));
        assert_eq!(seq.last_accepted(&RequestClass::Search), 0);

        let t2 = seq.issue(RequestClass::Search);
        seq.abandon(&t1);
        assert!(seq.is_pending(&RequestClass::Search));
        assert!(seq.admit(&t2));
    }
}
