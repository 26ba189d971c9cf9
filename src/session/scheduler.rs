//! Delayed messages owned by the coordinator

use std::time::{Duration, Instant};

/// Kinds of delayed work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delayed {
    /// Next pass of the autofocus cycle
    Autofocus,
    /// User-requested focus pass
    UserAutofocus,
}

/// Pending timers, fired from the coordinator loop
#[derive(Debug, Default)]
pub struct Scheduler {
    entries: Vec<(Instant, Delayed)>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, delay: Duration, kind: Delayed) {
        self.schedule_at(Instant::now() + delay, kind);
    }

    pub fn schedule_at(&mut self, due: Instant, kind: Delayed) {
        self.entries.push((due, kind));
    }

    /// Drop every pending entry of this kind
    pub fn cancel(&mut self, kind: Delayed) {
        self.entries.retain(|(_, k)| *k != kind);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_scheduled(&self, kind: Delayed) -> bool {
        self.entries.iter().any(|(_, k)| *k == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|(due, _)| *due).min()
    }

    /// Remove and return entries due at `now`, earliest first
    pub fn pop_due(&mut self, now: Instant) -> Vec<Delayed> {
        let mut due: Vec<(Instant, Delayed)> = Vec::new();
        self.entries.retain(|entry| {
            if entry.0 <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(_, kind)| kind).collect()
    }
}
