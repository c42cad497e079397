//! Schedule queue and in-flight set.
//!
//! The queue answers two questions at once: "is this notification already
//! scheduled" (by identity) and "what fires next" (by time). It is a
//! `HashMap` by id plus a `BTreeSet` keyed `(time, id)`; every mutation
//! touches both under the caller's lock so the views never diverge.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use vigil_model::Notification;

/// A pending renotification: value snapshot of a notification's due time.
///
/// Recomputed via [`capture`](ScheduleEntry::capture) whenever reinserted;
/// never a live view of the notification.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub notification: Arc<Notification>,
    pub next_message: DateTime<Utc>,
}

impl ScheduleEntry {
    /// Snapshot the notification's current next-fire time.
    pub fn capture(notification: &Arc<Notification>) -> Self {
        Self {
            next_message: notification.next_notification(),
            notification: notification.clone(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.notification.id()
    }
}

/// Due-time-ordered set of pending renotifications, unique per identity.
#[derive(Debug, Default)]
pub struct ScheduleQueue {
    by_id: HashMap<Uuid, ScheduleEntry>,
    by_time: BTreeSet<(DateTime<Utc>, Uuid)>,
}

impl ScheduleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any stale entry for the same identity.
    pub fn insert(&mut self, entry: ScheduleEntry) {
        let id = entry.id();
        if let Some(stale) = self.by_id.remove(&id) {
            self.by_time.remove(&(stale.next_message, id));
        }
        self.by_time.insert((entry.next_message, id));
        self.by_id.insert(id, entry);
    }

    /// Remove the entry for an identity, if present.
    pub fn remove(&mut self, id: Uuid) -> Option<ScheduleEntry> {
        let entry = self.by_id.remove(&id)?;
        self.by_time.remove(&(entry.next_message, id));
        Some(entry)
    }

    /// The entry with the earliest due time. Never mutates.
    pub fn peek_earliest(&self) -> Option<&ScheduleEntry> {
        let (_, id) = self.by_time.iter().next()?;
        self.by_id.get(id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }
}

/// Identities currently handed to asynchronous execution.
///
/// An identity in here is absent from the schedule queue for the duration
/// of the send.
#[derive(Debug, Default)]
pub struct InFlightSet {
    ids: HashSet<Uuid>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an identity as in flight. Returns false if it already was.
    pub fn mark(&mut self, id: Uuid) -> bool {
        self.ids.insert(id)
    }

    /// Clear an identity. Returns false if it was not present, which the
    /// caller treats as a duplicate-completion anomaly.
    pub fn clear(&mut self, id: Uuid) -> bool {
        self.ids.remove(&id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
