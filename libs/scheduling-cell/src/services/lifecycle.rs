// libs/scheduling-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentStatus, SchedulingError};

/// Outcome of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The appointment is already in the requested state; retried client
    /// requests land here and must stay harmless.
    AlreadyApplied,
}

/// Enforces the appointment status graph:
///
/// ```text
/// scheduled -> confirmed -> completed
/// scheduled -> cancelled
/// confirmed -> cancelled
/// ```
///
/// `completed` and `cancelled` are terminal.
pub struct AppointmentStateMachine;

impl AppointmentStateMachine {
    pub fn new() -> Self {
        Self
    }

    pub fn transition(
        &self,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<Transition, SchedulingError> {
        if from == to
            && matches!(
                to,
                AppointmentStatus::Confirmed
                    | AppointmentStatus::Completed
                    | AppointmentStatus::Cancelled
            )
        {
            debug!("status already {}, treating transition as a no-op", to);
            return Ok(Transition::AlreadyApplied);
        }

        if self.valid_transitions(from).contains(&to) {
            debug!("status transition {} -> {}", from, to);
            Ok(Transition::Applied)
        } else {
            warn!("rejected status transition {} -> {}", from, to);
            Err(SchedulingError::InvalidTransition { from, to })
        }
    }

    /// All valid next statuses for a given current status.
    pub fn valid_transitions(&self, from: AppointmentStatus) -> Vec<AppointmentStatus> {
        match from {
            AppointmentStatus::Scheduled => {
                vec![AppointmentStatus::Confirmed, AppointmentStatus::Cancelled]
            }
            AppointmentStatus::Confirmed => {
                vec![AppointmentStatus::Completed, AppointmentStatus::Cancelled]
            }
            // Terminal states
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    pub fn is_terminal(&self, status: AppointmentStatus) -> bool {
        matches!(
            status,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }

    /// Whether entering `status` releases the appointment's slot.
    /// Completion keeps the slot consumed; only cancellation frees it.
    pub fn frees_slot(&self, status: AppointmentStatus) -> bool {
        matches!(status, AppointmentStatus::Cancelled)
    }
}

impl Default for AppointmentStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
