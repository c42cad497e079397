//! The scheduler facade: lifecycle, event handling, and send completion.
//!
//! [`NotificationScheduler`] subscribes to the object model's state-change
//! and flapping-change signals, decides eligibility, fires immediate sends,
//! and keeps the renotification queue serviced by the dispatch loop.
//! Event handlers run synchronously on whatever thread fired the signal
//! and only ever touch scheduler state under the single mutex; the actual
//! delivery always happens on a spawned task.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vigil_model::{
    CheckResult, Checkable, EventHub, Notification, NotificationKind, StateType,
};

use crate::config::SchedulerConfig;
use crate::dispatch::{self, SchedulerShared};
use crate::eligibility;
use crate::error::SchedulerError;
use crate::metrics::{Counters, SchedulerMetrics};
use crate::queue::ScheduleEntry;
use crate::traits::NotificationTransport;

/// Decides whether notifications fire and schedules their repeats.
///
/// One dispatch-loop worker per instance. `start()` must be called from
/// within a tokio runtime and subscribes to the hub exactly once; a
/// stopped scheduler can be started again, but only on a fresh hub (the
/// hub has no handler unregistration, matching the object model's
/// fire-and-forget signals).
pub struct NotificationScheduler {
    config: SchedulerConfig,
    transport: Arc<dyn NotificationTransport>,
    shared: Arc<SchedulerShared>,
    counters: Counters,
    /// Handle of the runtime that called `start()`; sends spawn here.
    /// Rebound on every start, so a restart follows the caller's runtime.
    runtime: Mutex<Option<tokio::runtime::Handle>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationScheduler {
    pub fn new(config: SchedulerConfig, transport: Arc<dyn NotificationTransport>) -> Arc<Self> {
        Arc::new(Self {
            config,
            transport,
            shared: SchedulerShared::new(),
            counters: Counters::default(),
            runtime: Mutex::new(None),
            worker: Mutex::new(None),
        })
    }

    /// Subscribe to the hub's signals and start the dispatch loop.
    pub fn start(self: &Arc<Self>, hub: &EventHub) -> Result<(), SchedulerError> {
        let mut worker = self.worker.lock().unwrap();
        if worker.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let handle =
            tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        *self.runtime.lock().unwrap() = Some(handle.clone());

        self.shared.state.lock().unwrap().stopping = false;

        let me = self.clone();
        hub.on_state_change(move |checkable, result, state_type| {
            me.handle_state_change(checkable, result, state_type);
        });
        let me = self.clone();
        hub.on_flapping_change(move |checkable| {
            me.handle_flapping_change(checkable);
        });
        let me = self.clone();
        hub.on_next_time_changed(move |notification| {
            me.handle_next_time_changed(notification);
        });

        let shared = self.shared.clone();
        let me = self.clone();
        *worker = Some(handle.spawn(dispatch::run(shared, move |entry| {
            me.dispatch_scheduled(entry);
        })));

        info!("notification scheduler started");
        Ok(())
    }

    /// Stop the dispatch loop and, if configured, drain outstanding sends.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let worker = self
            .worker
            .lock()
            .unwrap()
            .take()
            .ok_or(SchedulerError::NotRunning)?;

        self.shared.state.lock().unwrap().stopping = true;
        // The stop must always signal, even with an empty queue, or the
        // loop would block forever.
        self.shared.wake.notify_one();

        if worker.await.is_err() {
            warn!("dispatch loop task panicked");
        }

        if self.config.drain_in_flight {
            self.drain_outstanding().await;
        }

        info!("notification scheduler stopped");
        Ok(())
    }

    /// Notifications waiting in the schedule queue.
    pub fn idle_count(&self) -> usize {
        self.shared.state.lock().unwrap().queue.len()
    }

    /// Notifications currently handed to asynchronous execution.
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().unwrap().in_flight.len()
    }

    /// Snapshot of gauges and counters for metrics export.
    pub fn metrics(&self) -> SchedulerMetrics {
        let state = self.shared.state.lock().unwrap();
        SchedulerMetrics {
            idle: state.queue.len(),
            in_flight: state.in_flight.len(),
            dispatched_total: self.counters.dispatched.load(Ordering::Relaxed),
            suppressed_total: self.counters.suppressed.load(Ordering::Relaxed),
        }
    }

    // ── Event handlers ──────────────────────────────────────────────

    fn handle_state_change(
        self: &Arc<Self>,
        checkable: &Arc<Checkable>,
        result: &CheckResult,
        state_type: StateType,
    ) {
        if self.is_stopping() {
            return;
        }
        if state_type == StateType::Soft {
            debug!(checkable = %checkable.name(), "ignoring soft state change");
            return;
        }

        let facts = checkable.facts();
        let kind = eligibility::kind_for_transition(result.state);

        if !eligibility::should_notify(&facts) {
            self.counters.suppressed.fetch_add(1, Ordering::Relaxed);
            debug!(checkable = %checkable.name(), %kind, "state change suppressed");
            return;
        }

        for notification in checkable.notifications() {
            if !notification.is_active() {
                continue;
            }
            info!(
                checkable = %checkable.name(),
                notification = %notification.name(),
                %kind,
                "sending state change notification"
            );
            self.spawn_send(notification.clone(), kind, false);
            if !kind.is_terminal() {
                self.schedule_renotification(&notification);
            }
        }
    }

    fn handle_flapping_change(self: &Arc<Self>, checkable: &Arc<Checkable>) {
        if self.is_stopping() {
            return;
        }

        let facts = checkable.facts();
        let kind = eligibility::kind_for_flapping(facts.flapping);

        if !eligibility::should_notify_flapping(&facts) {
            self.counters.suppressed.fetch_add(1, Ordering::Relaxed);
            debug!(checkable = %checkable.name(), %kind, "flapping change suppressed");
            return;
        }

        for notification in checkable.notifications() {
            if !notification.is_active() {
                continue;
            }
            info!(
                checkable = %checkable.name(),
                notification = %notification.name(),
                %kind,
                "sending flapping notification"
            );
            self.spawn_send(notification.clone(), kind, false);
            if !kind.is_terminal() {
                self.schedule_renotification(&notification);
            }
        }
    }

    /// External change to a notification's next-fire time: remove and
    /// reinsert its queue entry so the time index stays correct.
    fn handle_next_time_changed(self: &Arc<Self>, notification: &Arc<Notification>) {
        let requeued = {
            let mut state = self.shared.state.lock().unwrap();
            if state.queue.contains(notification.id()) {
                state.queue.insert(ScheduleEntry::capture(notification));
                true
            } else {
                false
            }
        };
        if requeued {
            debug!(
                notification = %notification.name(),
                next = %notification.next_notification(),
                "requeued after next-time change"
            );
            self.shared.wake.notify_one();
        }
    }

    // ── Dispatch and completion ─────────────────────────────────────

    /// Called by the dispatch loop for a due entry. The entry is already
    /// out of the queue and marked in flight.
    fn dispatch_scheduled(self: &Arc<Self>, entry: ScheduleEntry) {
        self.spawn_send(entry.notification, NotificationKind::Problem, true);
    }

    fn schedule_renotification(&self, notification: &Arc<Notification>) {
        let queued = {
            let mut state = self.shared.state.lock().unwrap();
            state.schedule(notification)
        };
        if queued {
            self.shared.wake.notify_one();
        }
    }

    /// Hand one send to the async executor. Never called with the lock held.
    fn spawn_send(
        self: &Arc<Self>,
        notification: Arc<Notification>,
        kind: NotificationKind,
        renotification: bool,
    ) {
        let Some(handle) = self.runtime.lock().unwrap().clone() else {
            return;
        };
        self.shared.state.lock().unwrap().sends_outstanding += 1;
        self.counters.dispatched.fetch_add(1, Ordering::Relaxed);

        let me = self.clone();
        let transport = self.transport.clone();
        handle.spawn(async move {
            if let Err(e) = transport.send(&notification, kind, renotification).await {
                warn!(
                    notification = %notification.name(),
                    transport = transport.transport_name(),
                    error = %e,
                    "notification delivery failed"
                );
            }
            me.on_send_complete(&notification, notification.is_active(), renotification);
        });
    }

    /// Runs after every send returns, success or failure.
    ///
    /// Only a scheduled send holds the in-flight slot; an immediate send
    /// completing must not clear it, or it would release the slot of a
    /// scheduled send for the same identity that is still running.
    fn on_send_complete(
        &self,
        notification: &Arc<Notification>,
        still_active: bool,
        was_scheduled: bool,
    ) {
        let drained = {
            let mut state = self.shared.state.lock().unwrap();
            if was_scheduled {
                let cleared = state.in_flight.clear(notification.id());
                if !cleared {
                    // Duplicate completion signal, or a concurrent
                    // deactivation already cleared it. Non-fatal either way.
                    warn!(
                        notification = %notification.name(),
                        "send completion for notification not in flight"
                    );
                }
                // The re-insert that keeps renotifications going; immediate
                // sends are re-armed by the event handler's insert.
                if cleared && still_active && !state.stopping {
                    state.schedule(notification);
                }
            }
            state.sends_outstanding = state.sends_outstanding.saturating_sub(1);
            state.sends_outstanding == 0
        };

        // An empty-to-nonempty transition or a stop must always be
        // observable by the loop.
        self.shared.wake.notify_one();
        if drained {
            self.shared.drained.notify_waiters();
        }
    }

    fn is_stopping(&self) -> bool {
        self.shared.state.lock().unwrap().stopping
    }

    /// Wait for outstanding sends, bounded by the shutdown timeout.
    async fn drain_outstanding(&self) {
        let timeout = self.config.shutdown_timeout();
        let wait = async {
            loop {
                let notified = self.shared.drained.notified();
                tokio::pin!(notified);
                // Register before checking, so a completion between the
                // check and the await still wakes us.
                notified.as_mut().enable();
                if self.shared.state.lock().unwrap().sends_outstanding == 0 {
                    return;
                }
                notified.await;
            }
        };
        if tokio::time::timeout(timeout, wait).await.is_err() {
            let outstanding = self.shared.state.lock().unwrap().sends_outstanding;
            warn!(
                outstanding,
                timeout_secs = self.config.shutdown_timeout_secs,
                "shutdown drain timed out; orphaned sends will finish in the background"
            );
        }
    }
}
