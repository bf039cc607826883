use serde::Serialize;
use tracing::{debug, warn};

use shared_models::auth::Role;

use crate::models::{AppointmentError, AppointmentStatus};

/// Every operation that touches an existing appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Respond,
    RequestReschedule,
    RespondReschedule,
    Complete,
    AddSummary,
    SubmitReview,
    Cancel,
}

impl LifecycleAction {
    pub const ALL: [LifecycleAction; 7] = [
        LifecycleAction::Respond,
        LifecycleAction::RequestReschedule,
        LifecycleAction::RespondReschedule,
        LifecycleAction::Complete,
        LifecycleAction::AddSummary,
        LifecycleAction::SubmitReview,
        LifecycleAction::Cancel,
    ];

    /// The side of the appointment allowed to perform the action.
    pub fn actor(&self) -> Role {
        match self {
            LifecycleAction::Respond
            | LifecycleAction::RequestReschedule
            | LifecycleAction::Complete
            | LifecycleAction::AddSummary => Role::Doctor,
            LifecycleAction::RespondReschedule
            | LifecycleAction::SubmitReview
            | LifecycleAction::Cancel => Role::Patient,
        }
    }

    pub fn permits(&self, current: AppointmentStatus) -> bool {
        use AppointmentStatus::*;

        match self {
            LifecycleAction::Respond => current == Pending,
            // Re-requesting is allowed from every status, terminal ones included.
            LifecycleAction::RequestReschedule => true,
            LifecycleAction::RespondReschedule => current == RescheduleRequested,
            LifecycleAction::Complete => matches!(current, Accepted | RescheduledConfirmed),
            LifecycleAction::AddSummary | LifecycleAction::SubmitReview => current == Completed,
            LifecycleAction::Cancel => matches!(current, Pending | Accepted | RescheduledConfirmed),
        }
    }

    /// Statuses the action can leave the appointment in. Empty for actions that only
    /// write fields.
    pub fn outcomes(&self) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;

        match self {
            LifecycleAction::Respond => &[Accepted, Rejected],
            LifecycleAction::RequestReschedule => &[RescheduleRequested],
            LifecycleAction::RespondReschedule => &[RescheduledConfirmed, RescheduleRejected],
            LifecycleAction::Complete => &[Completed],
            LifecycleAction::AddSummary | LifecycleAction::SubmitReview => &[],
            LifecycleAction::Cancel => &[CancelledByPatient],
        }
    }

    fn refusal(&self) -> &'static str {
        match self {
            LifecycleAction::Respond => "Only pending appointments can be accepted or rejected",
            LifecycleAction::RequestReschedule => "Appointment cannot be rescheduled",
            LifecycleAction::RespondReschedule => "No reschedule request is awaiting a response",
            LifecycleAction::Complete => {
                "Only accepted/rescheduled appointments can be marked as completed"
            }
            LifecycleAction::AddSummary => "Summary can only be added to completed appointments",
            LifecycleAction::SubmitReview => "Only completed appointments can be reviewed",
            LifecycleAction::Cancel => "Only upcoming appointments can be cancelled",
        }
    }
}

/// Checks `action` against the current status before anything is written.
pub fn validate_action(
    action: LifecycleAction,
    current: AppointmentStatus,
) -> Result<(), AppointmentError> {
    if !action.permits(current) {
        warn!("Refused {:?} on appointment in status {}", action, current);
        return Err(AppointmentError::InvalidState(action.refusal().to_string()));
    }

    debug!("{:?} permitted from {}", action, current);
    Ok(())
}

/// All statuses reachable in one step from `current`.
pub fn valid_transitions(current: AppointmentStatus) -> Vec<AppointmentStatus> {
    let mut next = Vec::new();
    for action in LifecycleAction::ALL.iter().filter(|a| a.permits(current)) {
        for status in action.outcomes() {
            if !next.contains(status) {
                next.push(*status);
            }
        }
    }
    next
}

/// Actions the given role may take on an appointment in `current`.
pub fn available_actions(current: AppointmentStatus, role: Role) -> Vec<LifecycleAction> {
    LifecycleAction::ALL
        .iter()
        .copied()
        .filter(|a| a.actor() == role && a.permits(current))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn test_complete_only_from_accepted_or_confirmed() {
        for status in AppointmentStatus::ALL {
            let allowed = validate_action(LifecycleAction::Complete, status).is_ok();
            assert_eq!(allowed, matches!(status, Accepted | RescheduledConfirmed), "{}", status);
        }
    }

    #[test]
    fn test_cancel_only_from_upcoming_statuses() {
        for status in AppointmentStatus::ALL {
            let allowed = LifecycleAction::Cancel.permits(status);
            assert_eq!(
                allowed,
                matches!(status, Pending | Accepted | RescheduledConfirmed),
                "{}",
                status
            );
        }
    }

    #[test]
    fn test_reschedule_request_allowed_from_every_status() {
        for status in AppointmentStatus::ALL {
            assert!(LifecycleAction::RequestReschedule.permits(status));
            assert!(valid_transitions(status).contains(&RescheduleRequested));
        }
    }

    #[test]
    fn test_terminal_statuses_only_reach_reschedule_requested() {
        for status in [Rejected, Completed, CancelledByPatient, RescheduleRejected] {
            assert_eq!(valid_transitions(status), vec![RescheduleRequested]);
        }
    }

    #[test]
    fn test_pending_transitions() {
        let next = valid_transitions(Pending);
        assert!(next.contains(&Accepted));
        assert!(next.contains(&Rejected));
        assert!(next.contains(&CancelledByPatient));
        assert!(!next.contains(&Completed));
    }

    #[test]
    fn test_summary_refusal_is_invalid_state() {
        let err = validate_action(LifecycleAction::AddSummary, Accepted).unwrap_err();
        assert_eq!(
            err,
            AppointmentError::InvalidState(
                "Summary can only be added to completed appointments".to_string()
            )
        );
    }

    #[test]
    fn test_available_actions_are_split_by_role() {
        let doctor = available_actions(Completed, Role::Doctor);
        assert_eq!(doctor, vec![LifecycleAction::RequestReschedule, LifecycleAction::AddSummary]);

        let patient = available_actions(Completed, Role::Patient);
        assert_eq!(patient, vec![LifecycleAction::SubmitReview]);
    }
}
