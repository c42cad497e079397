//! State enums and check results shared across the object model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Evaluated state of a monitored service or host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl ServiceState {
    /// Whether this state counts as "not a problem".
    pub fn is_ok(&self) -> bool {
        matches!(self, ServiceState::Ok)
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceState::Ok => write!(f, "ok"),
            ServiceState::Warning => write!(f, "warning"),
            ServiceState::Critical => write!(f, "critical"),
            ServiceState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Whether a state is still being confirmed (`Soft`) or is settled (`Hard`).
///
/// Only hard transitions drive notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateType {
    Soft,
    Hard,
}

/// The reason a notification is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Problem,
    Recovery,
    FlappingStart,
    FlappingEnd,
}

impl NotificationKind {
    /// Terminal kinds resolve the situation; no renotification is scheduled.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NotificationKind::Recovery | NotificationKind::FlappingEnd)
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Problem => write!(f, "problem"),
            NotificationKind::Recovery => write!(f, "recovery"),
            NotificationKind::FlappingStart => write!(f, "flapping_start"),
            NotificationKind::FlappingEnd => write!(f, "flapping_end"),
        }
    }
}

/// Dependency class used when asking whether a checkable is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Dependencies that suppress notifications when a parent is down.
    Notification,
}

/// Result of a single check execution, as far as notifications care.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// State produced by the check.
    pub state: ServiceState,
    /// Plugin/check output line.
    pub output: String,
    /// When the check finished.
    pub execution_end: DateTime<Utc>,
}

impl CheckResult {
    pub fn new(state: ServiceState, output: impl Into<String>) -> Self {
        Self {
            state,
            output: output.into(),
            execution_end: Utc::now(),
        }
    }
}
