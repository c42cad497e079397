//! Notification scheduler: decides whether a state transition notifies,
//! and schedules/dispatches renotifications at their due times.
//!
//! ## Architecture
//! ```text
//! check pipeline (any thread)
//!   └─ state/flapping signal ──► NotificationScheduler
//!        ├─ eligibility engine:  suppress or fire?
//!        ├─ immediate send ────► NotificationTransport (spawned task)
//!        └─ ScheduleQueue insert (non-terminal kinds)
//!              │
//!   dispatch loop (one worker task)
//!        ├─ waits for the earliest due entry (Notify + timed sleep)
//!        ├─ moves it to the InFlightSet
//!        └─ scheduled send ───► NotificationTransport (spawned task)
//!              │
//!   completion handler
//!        ├─ clears in-flight, recomputes the entry
//!        └─ reinserts while the notification stays active
//! ```
//!
//! The queue and in-flight set share one mutex; the dispatch loop is the
//! only waiter on the wake signal, and every mutation that can change the
//! earliest due time signals it.

pub mod component;
pub mod config;
mod dispatch;
pub mod eligibility;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod traits;

pub use component::NotificationScheduler;
pub use config::SchedulerConfig;
pub use eligibility::{kind_for_flapping, kind_for_transition, should_notify, should_notify_flapping};
pub use error::SchedulerError;
pub use metrics::SchedulerMetrics;
pub use queue::{InFlightSet, ScheduleEntry, ScheduleQueue};
pub use traits::{NotificationTransport, TransportError};
