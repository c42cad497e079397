//! Notification objects attached to checkables.

use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::checkable::Checkable;
use crate::events::EventHub;

struct NotificationInner {
    next_notification: DateTime<Utc>,
    active: bool,
    checkable: Weak<Checkable>,
}

/// A configured notification: who gets told about a checkable's problems.
///
/// Owned by the configuration layer; the scheduler only holds `Arc`s and
/// observes [`next_notification`](Notification::next_notification) and
/// [`is_active`](Notification::is_active). The next-fire time is advanced
/// by the delivery/business layer after each send; any external change
/// fires the hub's next-time-changed signal so the scheduler can reindex.
pub struct Notification {
    id: Uuid,
    name: String,
    hub: Arc<EventHub>,
    inner: Mutex<NotificationInner>,
}

impl Notification {
    /// Create a notification whose next-fire time is "now".
    pub fn new(name: impl Into<String>, hub: Arc<EventHub>) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            hub,
            inner: Mutex::new(NotificationInner {
                next_notification: Utc::now(),
                active: true,
                checkable: Weak::new(),
            }),
        })
    }

    /// Stable identity used by the schedule queue and in-flight set.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The checkable this notification belongs to, if it still exists.
    pub fn checkable(&self) -> Option<Arc<Checkable>> {
        self.inner.lock().unwrap().checkable.upgrade()
    }

    pub(crate) fn attach(&self, checkable: &Arc<Checkable>) {
        self.inner.lock().unwrap().checkable = Arc::downgrade(checkable);
    }

    /// When the next renotification is owed.
    pub fn next_notification(&self) -> DateTime<Utc> {
        self.inner.lock().unwrap().next_notification
    }

    /// Update the next-fire time and fire the next-time-changed signal.
    ///
    /// The signal fires synchronously after the new value is visible, so a
    /// subscriber reading [`next_notification`](Self::next_notification)
    /// from its handler always observes the updated time.
    pub fn set_next_notification(self: &Arc<Self>, when: DateTime<Utc>) {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.next_notification == when {
                return;
            }
            inner.next_notification = when;
        }
        self.hub.fire_next_time_changed(self);
    }

    /// False once the notification is disabled or removed from config.
    pub fn is_active(&self) -> bool {
        self.inner.lock().unwrap().active
    }

    pub fn set_active(&self, active: bool) {
        self.inner.lock().unwrap().active = active;
    }
}

impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notification")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
