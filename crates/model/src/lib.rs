//! Monitored-object model consumed by the notification scheduler.
//!
//! This crate owns the read surface the scheduler needs: [`Checkable`]
//! (a monitored host/service with current and prior state), [`Notification`]
//! (a configured notification attached to a checkable), and the synchronous
//! in-process event signals ([`EventHub`]) that the check pipeline fires on
//! its own threads when a state or flapping transition happens.
//!
//! The scheduler never creates or destroys these objects; it holds `Arc`s
//! handed to it through events and reads consistent snapshots
//! ([`CheckableFacts`]) under the objects' own locks.

pub mod checkable;
pub mod events;
pub mod notification;
pub mod state;

pub use checkable::{Checkable, CheckableFacts};
pub use events::EventHub;
pub use notification::Notification;
pub use state::{CheckResult, DependencyKind, NotificationKind, ServiceState, StateType};
