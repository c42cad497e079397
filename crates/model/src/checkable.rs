//! Monitored entities: hosts and services with confirmed/unconfirmed state.

use std::sync::{Arc, Mutex};

use crate::events::EventHub;
use crate::notification::Notification;
use crate::state::{CheckResult, DependencyKind, ServiceState, StateType};

/// Consistent snapshot of everything the eligibility decision needs.
///
/// Taken under the checkable's lock in one go, so a decision never mixes
/// fields from two different check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckableFacts {
    pub reachable: bool,
    pub in_downtime: bool,
    pub acknowledged: bool,
    pub flapping: bool,
    pub volatile: bool,
    pub last_state: ServiceState,
    pub last_state_type: StateType,
    pub state: ServiceState,
    pub state_type: StateType,
}

struct CheckableInner {
    state: ServiceState,
    state_type: StateType,
    last_state: ServiceState,
    last_state_type: StateType,
    volatile: bool,
    flapping: bool,
    in_downtime: bool,
    acknowledged: bool,
    reachable: bool,
    last_check_result: Option<CheckResult>,
    notifications: Vec<Arc<Notification>>,
}

/// A monitored host or service.
///
/// Mutated by the check pipeline from arbitrary threads; the scheduler
/// only reads. All mutable facts sit behind one mutex so that
/// [`facts`](Checkable::facts) is a consistent snapshot.
pub struct Checkable {
    name: String,
    hub: Arc<EventHub>,
    inner: Mutex<CheckableInner>,
}

impl Checkable {
    /// Create a checkable starting in a hard OK state.
    pub fn new(name: impl Into<String>, hub: Arc<EventHub>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            hub,
            inner: Mutex::new(CheckableInner {
                state: ServiceState::Ok,
                state_type: StateType::Hard,
                last_state: ServiceState::Ok,
                last_state_type: StateType::Hard,
                volatile: false,
                flapping: false,
                in_downtime: false,
                acknowledged: false,
                reachable: true,
                last_check_result: None,
                notifications: Vec::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ServiceState {
        self.inner.lock().unwrap().state
    }

    pub fn state_type(&self) -> StateType {
        self.inner.lock().unwrap().state_type
    }

    pub fn last_check_result(&self) -> Option<CheckResult> {
        self.inner.lock().unwrap().last_check_result.clone()
    }

    pub fn is_volatile(&self) -> bool {
        self.inner.lock().unwrap().volatile
    }

    pub fn set_volatile(&self, volatile: bool) {
        self.inner.lock().unwrap().volatile = volatile;
    }

    pub fn is_flapping(&self) -> bool {
        self.inner.lock().unwrap().flapping
    }

    pub fn is_in_downtime(&self) -> bool {
        self.inner.lock().unwrap().in_downtime
    }

    pub fn set_in_downtime(&self, in_downtime: bool) {
        self.inner.lock().unwrap().in_downtime = in_downtime;
    }

    pub fn is_acknowledged(&self) -> bool {
        self.inner.lock().unwrap().acknowledged
    }

    pub fn set_acknowledged(&self, acknowledged: bool) {
        self.inner.lock().unwrap().acknowledged = acknowledged;
    }

    /// Reachability per the notification-dependency rules.
    pub fn is_reachable(&self, _kind: DependencyKind) -> bool {
        self.inner.lock().unwrap().reachable
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.inner.lock().unwrap().reachable = reachable;
    }

    /// Notifications attached to this checkable.
    pub fn notifications(&self) -> Vec<Arc<Notification>> {
        self.inner.lock().unwrap().notifications.clone()
    }

    /// Attach a notification, wiring its back-reference.
    pub fn add_notification(self: &Arc<Self>, notification: Arc<Notification>) {
        notification.attach(self);
        self.inner.lock().unwrap().notifications.push(notification);
    }

    /// Snapshot the facts the eligibility engine evaluates.
    pub fn facts(&self) -> CheckableFacts {
        let inner = self.inner.lock().unwrap();
        CheckableFacts {
            reachable: inner.reachable,
            in_downtime: inner.in_downtime,
            acknowledged: inner.acknowledged,
            flapping: inner.flapping,
            volatile: inner.volatile,
            last_state: inner.last_state,
            last_state_type: inner.last_state_type,
            state: inner.state,
            state_type: inner.state_type,
        }
    }

    /// Apply a check result and fire the state-change signal.
    ///
    /// The previous state/state-type become `last_state`/`last_state_type`
    /// before the new values are applied; the signal fires after the lock
    /// is released.
    pub fn process_check_result(self: &Arc<Self>, result: CheckResult, state_type: StateType) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.last_state = inner.state;
            inner.last_state_type = inner.state_type;
            inner.state = result.state;
            inner.state_type = state_type;
            inner.last_check_result = Some(result.clone());
        }
        self.hub.fire_state_change(self, &result, state_type);
    }

    /// Flip the flapping flag and fire the flapping-change signal.
    pub fn set_flapping(self: &Arc<Self>, flapping: bool) {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.flapping == flapping {
                return;
            }
            inner.flapping = flapping;
        }
        self.hub.fire_flapping_change(self);
    }
}

impl std::fmt::Debug for Checkable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkable").field("name", &self.name).finish()
    }
}
