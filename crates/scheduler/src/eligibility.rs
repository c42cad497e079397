//! Pure notification-eligibility decisions.
//!
//! Evaluated only for hard transitions; callers discard soft transitions
//! before consulting this module. The functions here take an owned facts
//! snapshot and have no side effects, so they are safe to call from any
//! thread and always return the same answer for the same input.

use vigil_model::{CheckableFacts, NotificationKind, ServiceState, StateType};

/// Decide whether a hard state transition should raise a notification.
///
/// Suppression conditions (unreachable, downtime, acknowledgement,
/// flapping) are final and beat every eligibility rule, including
/// `volatile`. A hard OK that was never a hard problem (soft-OK → hard-OK)
/// never notifies, and a volatile checkable repeating OK → OK stays quiet.
pub fn should_notify(facts: &CheckableFacts) -> bool {
    if !facts.reachable || facts.in_downtime || facts.acknowledged || facts.flapping {
        return false;
    }

    let mut send = false;

    // Soft → hard confirmation, or recovery from a non-OK state.
    if facts.last_state_type == StateType::Soft && facts.state_type == StateType::Hard {
        send = true;
    }
    if facts.state.is_ok() && !facts.last_state.is_ok() {
        send = true;
    }

    // Volatile checkables notify on every hard evaluation.
    if facts.volatile {
        send = true;
    }

    // A hard OK reached from a soft OK was never actually a problem.
    if facts.last_state_type == StateType::Soft
        && facts.last_state.is_ok()
        && facts.state.is_ok()
    {
        send = false;
    }

    // Volatile OK → OK is a repeated no-op.
    if facts.volatile && facts.last_state.is_ok() && facts.state.is_ok() {
        send = false;
    }

    send
}

/// Decide whether a flapping transition should raise a notification.
///
/// The flapping flag itself obviously does not suppress here; the usual
/// reachability/downtime/acknowledgement suppressions still apply.
pub fn should_notify_flapping(facts: &CheckableFacts) -> bool {
    facts.reachable && !facts.in_downtime && !facts.acknowledged
}

/// Notification kind for a hard state transition.
pub fn kind_for_transition(state: ServiceState) -> NotificationKind {
    if state.is_ok() {
        NotificationKind::Recovery
    } else {
        NotificationKind::Problem
    }
}

/// Notification kind for a flapping flag flip.
pub fn kind_for_flapping(is_flapping: bool) -> NotificationKind {
    if is_flapping {
        NotificationKind::FlappingStart
    } else {
        NotificationKind::FlappingEnd
    }
}
