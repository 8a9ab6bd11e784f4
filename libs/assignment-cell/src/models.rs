// libs/assignment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// RECURRENCE RULES
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

/// Declarative recurrence: the rule is the source of truth, occurrences are
/// always re-derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: RecurrenceFrequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub occurrence_count: Option<u32>,
    /// For weekly/biweekly rules: pin occurrences to this weekday instead of
    /// the weekday of `start_date`. Ignored for daily and monthly rules.
    pub day_of_week: Option<Weekday>,
}

impl RecurrenceRule {
    /// Structural validation; expansion assumes a valid rule.
    pub fn validate(&self) -> Result<(), AssignmentError> {
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(AssignmentError::InvalidRecurrence(format!(
                    "end date {} precedes start date {}",
                    end, self.start_date
                )));
            }
        }
        if self.occurrence_count == Some(0) {
            return Err(AssignmentError::InvalidRecurrence(
                "occurrence count must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the rule eventually stops on its own.
    pub fn is_bounded(&self) -> bool {
        self.end_date.is_some() || self.occurrence_count.is_some()
    }
}

/// Inclusive date window limiting an expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceWindow {
    pub from: NaiveDate,
    pub until: NaiveDate,
}

// ==============================================================================
// ASSIGNMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Active,
    Completed,
    Paused,
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentStatus::Active => write!(f, "active"),
            AssignmentStatus::Completed => write!(f, "completed"),
            AssignmentStatus::Paused => write!(f, "paused"),
        }
    }
}

/// A challenge or survey assigned to a client, optionally recurring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub template_id: Uuid,
    pub client_id: Uuid,
    pub assigned_by: Uuid,
    pub recurrence: Option<RecurrenceRule>,
    pub status: AssignmentStatus,
    pub check_ins: Vec<CheckInEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn check_in_for(&self, date: NaiveDate) -> Option<&CheckInEvent> {
        self.check_ins.iter().find(|c| c.occurrence_date == date)
    }
}

/// Client-recorded completion of one occurrence. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInEvent {
    pub occurrence_date: NaiveDate,
    pub completed_at: DateTime<Utc>,
    pub value: Option<serde_json::Value>,
}

/// Derived progress; recomputed on demand from check-ins and the expanded
/// occurrence list, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub completed_count: usize,
    pub total_occurrences: usize,
    pub current_streak: usize,
    pub last_completed_date: Option<NaiveDate>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAssignmentRequest {
    pub template_id: Uuid,
    pub client_id: Uuid,
    pub assigned_by: Uuid,
    pub recurrence: Option<RecurrenceRule>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum AssignmentError {
    #[error("assignment not found")]
    NotFound,

    #[error("invalid recurrence rule: {0}")]
    InvalidRecurrence(String),

    #[error("no scheduled occurrence on {date}")]
    UnscheduledCheckIn { date: NaiveDate },

    #[error("assignment is {status}, not active")]
    NotActive { status: AssignmentStatus },

    #[error("invalid assignment transition: {from} -> {to}")]
    InvalidTransition {
        from: AssignmentStatus,
        to: AssignmentStatus,
    },
}
