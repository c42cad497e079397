//! The dispatch loop: waits for the earliest due renotification and hands
//! it to asynchronous execution.
//!
//! Wakeups use `Notify::notify_one` permit semantics: a signal sent while
//! the loop is between releasing the lock and awaiting is stored and
//! consumed on the next `notified()`, so a mutation can never be missed.
//! After any wake, due times are recomputed from scratch rather than
//! trusting a previously calculated deadline.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tracing::debug;

use crate::queue::{InFlightSet, ScheduleEntry, ScheduleQueue};

/// Everything guarded by the scheduler's single mutex.
pub(crate) struct SchedulerState {
    pub queue: ScheduleQueue,
    pub in_flight: InFlightSet,
    pub stopping: bool,
    /// Sends handed to the executor whose completion handler has not run yet
    /// (immediate and scheduled alike). Drained during shutdown.
    pub sends_outstanding: usize,
}

impl SchedulerState {
    fn new() -> Self {
        Self {
            queue: ScheduleQueue::new(),
            in_flight: InFlightSet::new(),
            stopping: false,
            sends_outstanding: 0,
        }
    }

    /// Queue a renotification snapshot for this notification.
    ///
    /// Refused while the identity is in flight: the completion handler
    /// performs the re-insert, which keeps an identity from ever sitting
    /// in both structures at once.
    pub fn schedule(&mut self, notification: &Arc<vigil_model::Notification>) -> bool {
        if self.in_flight.contains(notification.id()) {
            debug!(
                notification = %notification.name(),
                "not queueing renotification, send in flight"
            );
            return false;
        }
        self.queue.insert(ScheduleEntry::capture(notification));
        true
    }
}

/// Shared handle between the facade, event handlers, and the loop.
pub(crate) struct SchedulerShared {
    pub state: Mutex<SchedulerState>,
    /// Signalled after any mutation that can change the earliest due time,
    /// the empty/non-empty state, or the stopping flag. The dispatch loop
    /// is the only waiter.
    pub wake: Notify,
    /// Signalled when `sends_outstanding` reaches zero; `stop()` waits here.
    pub drained: Notify,
}

impl SchedulerShared {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SchedulerState::new()),
            wake: Notify::new(),
            drained: Notify::new(),
        })
    }
}

/// One decision of the loop, computed under the lock and acted on after
/// releasing it.
#[derive(Debug)]
pub(crate) enum Step {
    /// Queue empty: block until signalled.
    WaitEmpty,
    /// Earliest entry is due at this time: block until then or a signal.
    WaitUntil(DateTime<Utc>),
    /// This entry is due; it has been removed from the queue and marked
    /// in flight.
    Dispatch(ScheduleEntry),
    /// Stop requested.
    Stop,
}

/// Compute the loop's next step. Due entries are moved from the queue
/// into the in-flight set before the lock is released.
pub(crate) fn next_step(state: &mut SchedulerState, now: DateTime<Utc>) -> Step {
    if state.stopping {
        return Step::Stop;
    }
    let due = match state.queue.peek_earliest() {
        None => return Step::WaitEmpty,
        Some(entry) if entry.next_message > now => return Step::WaitUntil(entry.next_message),
        Some(entry) => entry.id(),
    };
    let entry = state
        .queue
        .remove(due)
        .expect("peeked entry vanished under the lock");
    state.in_flight.mark(entry.id());
    Step::Dispatch(entry)
}

/// Run the dispatch loop until a stop is signalled.
///
/// `dispatch` is called without the lock held; it must hand the entry to
/// the async executor and return immediately.
pub(crate) async fn run<F>(shared: Arc<SchedulerShared>, dispatch: F)
where
    F: Fn(ScheduleEntry),
{
    debug!("dispatch loop running");
    loop {
        let step = {
            let mut state = shared.state.lock().unwrap();
            next_step(&mut state, Utc::now())
        };

        match step {
            Step::Stop => break,
            Step::WaitEmpty => shared.wake.notified().await,
            Step::WaitUntil(due) => {
                let wait = (due - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    // An earlier-due insert or a stop shortens the wait;
                    // either way we recompute on the next iteration.
                    _ = shared.wake.notified() => {}
                }
            }
            Step::Dispatch(entry) => {
                debug!(
                    notification = %entry.notification.name(),
                    due = %entry.next_message,
                    "renotification due"
                );
                dispatch(entry);
            }
        }
    }
    debug!("dispatch loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use vigil_model::{EventHub, Notification};

    fn notification(name: &str) -> Arc<Notification> {
        Notification::new(name, EventHub::new())
    }

    #[test]
    fn empty_queue_waits() {
        let mut state = SchedulerState::new();
        assert!(matches!(next_step(&mut state, Utc::now()), Step::WaitEmpty));
    }

    #[test]
    fn future_entry_waits_until_due() {
        let mut state = SchedulerState::new();
        let n = notification("later");
        let due = Utc::now() + ChronoDuration::minutes(5);
        n.set_next_notification(due);
        state.schedule(&n);

        match next_step(&mut state, Utc::now()) {
            Step::WaitUntil(t) => assert_eq!(t, due),
            other => panic!("expected WaitUntil, got {other:?}"),
        }
        // Waiting never consumes the entry.
        assert_eq!(state.queue.len(), 1);
    }

    #[test]
    fn due_entry_moves_to_in_flight() {
        let mut state = SchedulerState::new();
        let n = notification("due");
        n.set_next_notification(Utc::now() - ChronoDuration::seconds(1));
        state.schedule(&n);

        match next_step(&mut state, Utc::now()) {
            Step::Dispatch(entry) => assert_eq!(entry.id(), n.id()),
            other => panic!("expected Dispatch, got {other:?}"),
        }
        assert!(state.queue.is_empty());
        assert!(state.in_flight.contains(n.id()));

        // Nothing left to dispatch until completion re-inserts.
        assert!(matches!(next_step(&mut state, Utc::now()), Step::WaitEmpty));
    }

    #[test]
    fn stopping_wins_over_due_entries() {
        let mut state = SchedulerState::new();
        let n = notification("due");
        n.set_next_notification(Utc::now() - ChronoDuration::seconds(1));
        state.schedule(&n);
        state.stopping = true;

        assert!(matches!(next_step(&mut state, Utc::now()), Step::Stop));
        assert_eq!(state.queue.len(), 1);
    }

    #[test]
    fn schedule_refused_while_in_flight() {
        let mut state = SchedulerState::new();
        let n = notification("busy");
        state.in_flight.mark(n.id());

        assert!(!state.schedule(&n));
        assert!(state.queue.is_empty());

        state.in_flight.clear(n.id());
        assert!(state.schedule(&n));
        assert_eq!(state.queue.len(), 1);
    }
}
