// =====================================================================================
// ASSIGNMENT CELL - RECURRING CHALLENGES & SURVEYS
// =====================================================================================
//
// This cell owns client assignments and their progress:
// - Recurrence rules expanded into concrete, restartable occurrence sequences
// - Check-in admission (one per occurrence date, unscheduled dates rejected)
// - Streak and completion math derived on demand, never stored
//
// =====================================================================================

pub mod models;
pub mod services;

// Re-export commonly used types
pub use models::{
    Assignment, AssignmentError, AssignmentStatus, CheckInEvent, CreateAssignmentRequest,
    OccurrenceWindow, ProgressSnapshot, RecurrenceFrequency, RecurrenceRule,
};

pub use services::assignment::AssignmentService;
pub use services::progress::ProgressTracker;
pub use services::recurrence::{Occurrences, RecurrenceExpander};
