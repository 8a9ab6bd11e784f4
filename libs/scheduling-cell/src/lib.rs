// =====================================================================================
// SCHEDULING CELL - APPOINTMENT BOOKING & AVAILABILITY
// =====================================================================================
//
// This cell owns the therapist calendars:
// - Half-open time slot arithmetic and validation
// - Per-therapist availability index with neighbor-only overlap queries
// - Conflict detection with configurable break padding between sessions
// - Appointment lifecycle enforcement (scheduled / confirmed / completed / cancelled)
// - The booking service that serializes all writes to one therapist's schedule
//
// =====================================================================================

pub mod models;
pub mod services;

// Re-export commonly used types
pub use models::{
    Appointment, AppointmentStatus, AppointmentType, CancelAppointmentRequest, CancelledBy,
    CreateAppointmentRequest, FreeSlotQuery, Location, SchedulingError, SchedulingRules, TimeSlot,
    UpdateAppointmentRequest,
};

pub use services::availability::AvailabilityIndex;
pub use services::booking::SchedulingService;
pub use services::conflict::ConflictDetector;
pub use services::lifecycle::{AppointmentStateMachine, Transition};
