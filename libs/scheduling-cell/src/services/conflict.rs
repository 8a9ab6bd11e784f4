use chrono::Duration;
use tracing::{debug, warn};

use crate::models::{SchedulingError, TimeSlot};
use crate::services::availability::AvailabilityIndex;

/// Decides whether a proposed slot is bookable against a therapist's
/// availability index.
///
/// The therapist's break between sessions pads the proposed slot on both
/// sides before the overlap query, so a booking that squeezes out the
/// configured gap is a conflict even when the raw intervals do not touch.
/// Callers must not re-implement the padding; it lives here so every surface
/// applies it identically.
pub struct ConflictDetector;

impl ConflictDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn check(
        &self,
        proposed: &TimeSlot,
        availability: &AvailabilityIndex,
        break_between: Duration,
    ) -> Result<(), SchedulingError> {
        let padded = proposed.padded(break_between);
        if let Some(conflicting) = availability.first_conflict(&padded) {
            warn!("proposed slot {} conflicts with booked slot {}", proposed, conflicting);
            return Err(SchedulingError::Conflict { conflicting });
        }
        debug!("proposed slot {} is clear", proposed);
        Ok(())
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new()
    }
}
