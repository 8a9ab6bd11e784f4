// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_config::AppConfig;

// ==============================================================================
// TIME SLOTS
// ==============================================================================

/// Half-open interval `[start, end)` on the shared UTC timeline.
///
/// Fields are private so every slot in the system went through the validating
/// constructor; deserialization takes the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeSlot", into = "RawTimeSlot")]
pub struct TimeSlot {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawTimeSlot {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawTimeSlot> for TimeSlot {
    type Error = SchedulingError;

    fn try_from(raw: RawTimeSlot) -> Result<Self, Self::Error> {
        TimeSlot::new(raw.start, raw.end)
    }
}

impl From<TimeSlot> for RawTimeSlot {
    fn from(slot: TimeSlot) -> Self {
        Self {
            start: slot.start,
            end: slot.end,
        }
    }
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, SchedulingError> {
        if start >= end {
            return Err(SchedulingError::InvalidSlot { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn from_start(start: DateTime<Utc>, duration: Duration) -> Result<Self, SchedulingError> {
        Self::new(start, start + duration)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Two slots conflict iff `a.start < b.end && b.start < a.end`.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Widen the slot by `gap` on both sides. Used to model the break a
    /// therapist requires between consecutive sessions.
    pub fn padded(&self, gap: Duration) -> TimeSlot {
        let gap = if gap < Duration::zero() {
            Duration::zero()
        } else {
            gap
        };
        TimeSlot {
            start: self.start - gap,
            end: self.end + gap,
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub therapist_id: Uuid,
    pub client_id: Uuid,
    pub slot: TimeSlot,
    pub appointment_type: AppointmentType,
    pub location: Location,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Intake,
    IndividualSession,
    GroupSession,
    Consultation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    InPerson,
    Video,
    Phone,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub therapist_id: Uuid,
    pub client_id: Uuid,
    pub start: DateTime<Utc>,
    /// When absent, the end is `start` plus the therapist's session duration.
    pub end: Option<DateTime<Utc>>,
    pub appointment_type: AppointmentType,
    pub location: Location,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
    pub reschedule_to: Option<DateTime<Utc>>,
    pub reschedule_duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Client,
    Therapist,
    System,
}

impl fmt::Display for CancelledBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelledBy::Client => write!(f, "client"),
            CancelledBy::Therapist => write!(f, "therapist"),
            CancelledBy::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
    pub cancelled_by: CancelledBy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeSlotQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Candidate slot length; defaults to the therapist's session duration.
    pub granularity_minutes: Option<u32>,
}

// ==============================================================================
// BOOKING RULES
// ==============================================================================

/// Business rules applied before a booking touches shared state.
#[derive(Debug, Clone)]
pub struct SchedulingRules {
    pub max_advance_days: u32,
    pub min_duration_minutes: u32,
    pub max_duration_minutes: u32,
    /// Minimum notice (hours) required to cancel a confirmed appointment.
    /// `None` disables the policy.
    pub cancellation_notice_hours: Option<u32>,
    pub lock_timeout: std::time::Duration,
}

impl Default for SchedulingRules {
    fn default() -> Self {
        Self {
            max_advance_days: 180,
            min_duration_minutes: 15,
            max_duration_minutes: 240,
            cancellation_notice_hours: None,
            lock_timeout: std::time::Duration::from_millis(5_000),
        }
    }
}

impl SchedulingRules {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_advance_days: config.max_advance_days,
            lock_timeout: std::time::Duration::from_millis(config.lock_timeout_ms),
            ..Self::default()
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum SchedulingError {
    #[error("invalid time slot: start {start} must come before end {end}")]
    InvalidSlot {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("slot conflicts with an existing appointment between {} and {}", .conflicting.start(), .conflicting.end())]
    Conflict { conflicting: TimeSlot },

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("slot is not present in the availability index")]
    SlotNotIndexed,

    #[error("appointment not found")]
    NotFound,

    #[error("timed out waiting for the therapist's schedule lock")]
    Timeout,
}
