//! Integration tests for the scheduler component's event handling:
//! which transitions notify, what gets scheduled, and what the gauges
//! report afterwards.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use vigil_model::{
    CheckResult, Checkable, EventHub, Notification, NotificationKind, ServiceState, StateType,
};
use vigil_scheduler::{
    NotificationScheduler, NotificationTransport, SchedulerConfig, TransportError,
};

const TIMEOUT: Duration = Duration::from_secs(3);
const SETTLE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
struct SendRecord {
    id: Uuid,
    kind: NotificationKind,
    renotification: bool,
}

/// Transport that records every send. Renotification sends advance the
/// notification's next-fire time by an hour, the way the real delivery
/// layer computes the next reminder.
struct RecordingTransport {
    delay: Duration,
    sends: Mutex<Vec<SendRecord>>,
}

impl RecordingTransport {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            sends: Mutex::new(Vec::new()),
        })
    }

    fn sends(&self) -> Vec<SendRecord> {
        self.sends.lock().unwrap().clone()
    }

    fn renotifications(&self) -> usize {
        self.sends().iter().filter(|s| s.renotification).count()
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn send(
        &self,
        notification: &Arc<Notification>,
        kind: NotificationKind,
        renotification: bool,
    ) -> Result<(), TransportError> {
        self.sends.lock().unwrap().push(SendRecord {
            id: notification.id(),
            kind,
            renotification,
        });
        if renotification {
            notification.set_next_notification(Utc::now() + chrono::Duration::hours(1));
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(())
    }

    fn transport_name(&self) -> &str {
        "recording"
    }
}

fn fixture(
    delay: Duration,
) -> (
    Arc<EventHub>,
    Arc<NotificationScheduler>,
    Arc<RecordingTransport>,
) {
    let hub = EventHub::new();
    let transport = RecordingTransport::new(delay);
    let scheduler = NotificationScheduler::new(SchedulerConfig::default(), transport.clone());
    scheduler.start(&hub).unwrap();
    (hub, scheduler, transport)
}

fn monitored(hub: &Arc<EventHub>, name: &str) -> (Arc<Checkable>, Arc<Notification>) {
    let checkable = Checkable::new(name, hub.clone());
    let notification = Notification::new(format!("{name}-mail"), hub.clone());
    checkable.add_notification(notification.clone());
    (checkable, notification)
}

/// Two checks: an unconfirmed problem, then its hard confirmation.
fn soft_then_hard_problem(checkable: &Arc<Checkable>) {
    checkable.process_check_result(
        CheckResult::new(ServiceState::Critical, "connect timeout"),
        StateType::Soft,
    );
    checkable.process_check_result(
        CheckResult::new(ServiceState::Critical, "connect timeout"),
        StateType::Hard,
    );
}

async fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test]
async fn hard_problem_fires_immediate_and_scheduled_sends() {
    let (hub, scheduler, transport) = fixture(Duration::from_millis(50));
    let (checkable, notification) = monitored(&hub, "web-01");
    // The next-fire time defaults to "now": the queued entry is due the
    // moment the dispatch loop sees it.
    soft_then_hard_problem(&checkable);

    tokio::time::sleep(SETTLE).await;

    let sends = transport.sends();
    assert_eq!(
        sends.iter().filter(|s| !s.renotification).count(),
        1,
        "one immediate send"
    );
    assert_eq!(transport.renotifications(), 1, "one scheduled send");
    assert!(sends.iter().all(|s| s.id == notification.id()));

    // After both completions: exactly one queued entry, nothing in flight.
    assert_eq!(scheduler.idle_count(), 1);
    assert_eq!(scheduler.pending_count(), 0);

    scheduler.stop().await.unwrap();
}

#[tokio::test]
async fn recovery_sends_once_and_schedules_nothing() {
    let (hub, scheduler, transport) = fixture(Duration::ZERO);
    let (checkable, _) = monitored(&hub, "db-01");

    // Hard -> hard problem without a soft phase is suppressed.
    checkable.process_check_result(
        CheckResult::new(ServiceState::Critical, "down"),
        StateType::Hard,
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(transport.sends().is_empty());

    checkable.process_check_result(CheckResult::new(ServiceState::Ok, "up"), StateType::Hard);
    wait_for("recovery send", || !transport.sends().is_empty()).await;

    let sends = transport.sends();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].kind, NotificationKind::Recovery);
    assert!(!sends[0].renotification);

    // Recovery is terminal: nothing scheduled, nothing in flight.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(scheduler.idle_count(), 0);
    assert_eq!(scheduler.pending_count(), 0);

    let metrics = scheduler.metrics();
    assert_eq!(metrics.dispatched_total, 1);
    assert_eq!(metrics.suppressed_total, 1);

    scheduler.stop().await.unwrap();
}

#[tokio::test]
async fn acknowledged_checkable_never_notifies() {
    let (hub, scheduler, transport) = fixture(Duration::ZERO);
    let (checkable, _) = monitored(&hub, "cache-01");
    checkable.set_volatile(true);
    checkable.set_acknowledged(true);

    soft_then_hard_problem(&checkable);
    tokio::time::sleep(SETTLE).await;

    assert!(transport.sends().is_empty());
    assert_eq!(scheduler.idle_count(), 0);
    assert!(scheduler.metrics().suppressed_total >= 1);

    scheduler.stop().await.unwrap();
}

#[tokio::test]
async fn soft_transitions_are_ignored() {
    let (hub, scheduler, transport) = fixture(Duration::ZERO);
    let (checkable, _) = monitored(&hub, "lb-01");

    checkable.process_check_result(
        CheckResult::new(ServiceState::Warning, "degraded"),
        StateType::Soft,
    );
    tokio::time::sleep(SETTLE).await;

    assert!(transport.sends().is_empty());
    assert_eq!(scheduler.idle_count(), 0);

    scheduler.stop().await.unwrap();
}

#[tokio::test]
async fn flapping_notifies_on_both_edges_and_suppresses_state_changes() {
    let (hub, scheduler, transport) = fixture(Duration::ZERO);
    let (checkable, notification) = monitored(&hub, "app-01");
    // Keep the renotification far out so only the edges send.
    notification.set_next_notification(Utc::now() + chrono::Duration::hours(1));

    checkable.set_flapping(true);
    wait_for("flapping start send", || !transport.sends().is_empty()).await;
    assert_eq!(transport.sends()[0].kind, NotificationKind::FlappingStart);
    assert_eq!(scheduler.idle_count(), 1, "flapping start schedules repeats");

    // Ordinary state changes stay quiet while flapping.
    soft_then_hard_problem(&checkable);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(transport.sends().len(), 1);

    checkable.set_flapping(false);
    wait_for("flapping end send", || transport.sends().len() == 2).await;
    let sends = transport.sends();
    assert_eq!(sends[1].kind, NotificationKind::FlappingEnd);
    assert!(!sends[1].renotification);

    scheduler.stop().await.unwrap();
}

#[tokio::test]
async fn inactive_notifications_are_skipped() {
    let (hub, scheduler, transport) = fixture(Duration::ZERO);
    let (checkable, notification) = monitored(&hub, "mail-01");
    notification.set_active(false);

    soft_then_hard_problem(&checkable);
    tokio::time::sleep(SETTLE).await;

    assert!(transport.sends().is_empty());
    assert_eq!(scheduler.idle_count(), 0);

    scheduler.stop().await.unwrap();
}
