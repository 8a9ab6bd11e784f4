use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events emitted after a scheduling decision has been committed.
///
/// Payloads carry ids and times only; message formatting, templating, and
/// delivery channels all live behind the sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum SchedulingEvent {
    AppointmentScheduled {
        appointment_id: Uuid,
        therapist_id: Uuid,
        client_id: Uuid,
        start: DateTime<Utc>,
    },
    AppointmentConfirmed {
        appointment_id: Uuid,
    },
    AppointmentCompleted {
        appointment_id: Uuid,
    },
    AppointmentCancelled {
        appointment_id: Uuid,
        reason: Option<String>,
    },
    AppointmentRescheduled {
        appointment_id: Uuid,
        new_start: DateTime<Utc>,
    },
    AssignmentCreated {
        assignment_id: Uuid,
        client_id: Uuid,
    },
    AssignmentClosed {
        assignment_id: Uuid,
    },
    CheckInRecorded {
        assignment_id: Uuid,
        occurrence_date: NaiveDate,
    },
}

/// Fire-and-forget notification delivery.
///
/// Implementations must swallow their own failures: a dropped notification
/// never rolls back the scheduling decision that produced it.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: SchedulingEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn notify(&self, _event: SchedulingEvent) {}
}
