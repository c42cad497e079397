//! Synchronous in-process event signals.
//!
//! The check pipeline fires these on whatever thread produced the result;
//! handlers run synchronously on the caller's thread. Handlers must
//! therefore be `Send + Sync` and must not assume anything about the
//! calling thread beyond that. Registered handlers live for the lifetime
//! of the hub; there is no unregistration.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::checkable::Checkable;
use crate::notification::Notification;
use crate::state::{CheckResult, StateType};

/// Handler for a hard/soft state transition on a checkable.
pub type StateChangeHandler = Arc<dyn Fn(&Arc<Checkable>, &CheckResult, StateType) + Send + Sync>;

/// Handler for a flapping flag flip on a checkable.
pub type FlappingChangeHandler = Arc<dyn Fn(&Arc<Checkable>) + Send + Sync>;

/// Handler for an external change to a notification's next-fire time.
pub type NextTimeChangedHandler = Arc<dyn Fn(&Arc<Notification>) + Send + Sync>;

/// Registry for the three object-model events the scheduler subscribes to.
///
/// Firing clones the handler list out of the lock first, so a handler may
/// register further handlers (or fire other events) without deadlocking.
#[derive(Default)]
pub struct EventHub {
    state_change: Mutex<Vec<StateChangeHandler>>,
    flapping_change: Mutex<Vec<FlappingChangeHandler>>,
    next_time_changed: Mutex<Vec<NextTimeChangedHandler>>,
}

impl EventHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a state-change handler.
    pub fn on_state_change<F>(&self, handler: F)
    where
        F: Fn(&Arc<Checkable>, &CheckResult, StateType) + Send + Sync + 'static,
    {
        self.state_change.lock().unwrap().push(Arc::new(handler));
    }

    /// Register a flapping-change handler.
    pub fn on_flapping_change<F>(&self, handler: F)
    where
        F: Fn(&Arc<Checkable>) + Send + Sync + 'static,
    {
        self.flapping_change.lock().unwrap().push(Arc::new(handler));
    }

    /// Register a next-notification-time-changed handler.
    pub fn on_next_time_changed<F>(&self, handler: F)
    where
        F: Fn(&Arc<Notification>) + Send + Sync + 'static,
    {
        self.next_time_changed.lock().unwrap().push(Arc::new(handler));
    }

    pub fn fire_state_change(
        &self,
        checkable: &Arc<Checkable>,
        result: &CheckResult,
        state_type: StateType,
    ) {
        let handlers: Vec<_> = self.state_change.lock().unwrap().clone();
        debug!(
            checkable = %checkable.name(),
            state = %result.state,
            handlers = handlers.len(),
            "firing state change"
        );
        for handler in handlers {
            handler(checkable, result, state_type);
        }
    }

    pub fn fire_flapping_change(&self, checkable: &Arc<Checkable>) {
        let handlers: Vec<_> = self.flapping_change.lock().unwrap().clone();
        for handler in handlers {
            handler(checkable);
        }
    }

    pub fn fire_next_time_changed(&self, notification: &Arc<Notification>) {
        let handlers: Vec<_> = self.next_time_changed.lock().unwrap().clone();
        for handler in handlers {
            handler(notification);
        }
    }
}
