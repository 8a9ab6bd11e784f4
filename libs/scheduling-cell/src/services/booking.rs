// libs/scheduling-cell/src/services/booking.rs
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::clock::Clock;
use shared_models::notify::{NotificationSink, SchedulingEvent};
use shared_models::profile::{TherapistDirectory, TherapistProfile};

use crate::models::{
    Appointment, AppointmentStatus, CancelAppointmentRequest, CreateAppointmentRequest,
    FreeSlotQuery, SchedulingError, SchedulingRules, TimeSlot, UpdateAppointmentRequest,
};
use crate::services::availability::AvailabilityIndex;
use crate::services::conflict::ConflictDetector;
use crate::services::lifecycle::{AppointmentStateMachine, Transition};

/// Owns every therapist calendar and serializes writes to each of them.
///
/// Each therapist gets one availability index behind one mutex; the
/// check-then-insert of a booking happens entirely inside that mutex, which is
/// what makes concurrent requests for overlapping slots resolve to exactly one
/// winner. Free-slot reads take the same mutex so they never observe a slot
/// that a concurrent booking has just claimed.
pub struct SchedulingService {
    clock: Arc<dyn Clock>,
    directory: Arc<dyn TherapistDirectory>,
    sink: Arc<dyn NotificationSink>,
    conflict_detector: ConflictDetector,
    state_machine: AppointmentStateMachine,
    rules: SchedulingRules,
    default_profile: TherapistProfile,
    schedules: RwLock<HashMap<Uuid, Arc<Mutex<AvailabilityIndex>>>>,
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl SchedulingService {
    pub fn new(
        clock: Arc<dyn Clock>,
        directory: Arc<dyn TherapistDirectory>,
        sink: Arc<dyn NotificationSink>,
        config: &AppConfig,
    ) -> Self {
        let default_profile = TherapistProfile {
            session_duration_minutes: config.default_session_minutes,
            break_between_sessions_minutes: config.default_buffer_minutes,
        };
        Self::with_rules(
            clock,
            directory,
            sink,
            SchedulingRules::from_config(config),
            default_profile,
        )
    }

    pub fn with_rules(
        clock: Arc<dyn Clock>,
        directory: Arc<dyn TherapistDirectory>,
        sink: Arc<dyn NotificationSink>,
        rules: SchedulingRules,
        default_profile: TherapistProfile,
    ) -> Self {
        Self {
            clock,
            directory,
            sink,
            conflict_detector: ConflictDetector::new(),
            state_machine: AppointmentStateMachine::new(),
            rules,
            default_profile,
            schedules: RwLock::new(HashMap::new()),
            appointments: RwLock::new(HashMap::new()),
        }
    }

    /// Book a new appointment.
    ///
    /// Validation and the profile lookup happen before the therapist lock is
    /// taken; the conflict check and both inserts happen inside it, as a
    /// single atomic unit per therapist.
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        debug!(
            "booking request for therapist {} at {}",
            request.therapist_id, request.start
        );

        let now = self.clock.now();
        let profile = self.profile_for(request.therapist_id).await;

        let slot = match request.end {
            Some(end) => TimeSlot::new(request.start, end)?,
            None => TimeSlot::from_start(request.start, profile.session_duration())?,
        };
        self.validate_booking_window(&slot, now)?;

        let schedule = self.schedule_for(request.therapist_id).await;
        let appointment = {
            let mut index = self.lock_schedule(&schedule).await?;
            self.conflict_detector
                .check(&slot, &index, profile.break_between())?;
            index.insert(slot)?;

            let appointment = Appointment {
                id: Uuid::new_v4(),
                therapist_id: request.therapist_id,
                client_id: request.client_id,
                slot,
                appointment_type: request.appointment_type,
                location: request.location,
                status: AppointmentStatus::Scheduled,
                notes: request.notes,
                created_at: now,
                updated_at: now,
            };
            self.appointments
                .write()
                .await
                .insert(appointment.id, appointment.clone());
            appointment
        };

        info!(
            "appointment {} scheduled for therapist {} at {}",
            appointment.id, appointment.therapist_id, slot
        );
        self.sink
            .notify(SchedulingEvent::AppointmentScheduled {
                appointment_id: appointment.id,
                therapist_id: appointment.therapist_id,
                client_id: appointment.client_id,
                start: slot.start(),
            })
            .await;
        Ok(appointment)
    }

    /// Apply a status change and/or a reschedule to an existing appointment.
    ///
    /// Status changes go through the state machine; a reschedule is
    /// remove-old + check-new + insert-new under the therapist lock, rolled
    /// back entirely when the new slot conflicts.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        patch: UpdateAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        debug!("updating appointment {}", appointment_id);

        if patch.reschedule_to.is_some() && patch.status == Some(AppointmentStatus::Cancelled) {
            return Err(SchedulingError::Validation(
                "cannot cancel and reschedule in the same update".to_string(),
            ));
        }

        let current = self.get_appointment(appointment_id).await?;
        let profile = self.profile_for(current.therapist_id).await;
        let schedule = self.schedule_for(current.therapist_id).await;
        let mut index = self.lock_schedule(&schedule).await?;

        // Re-read inside the critical section; another writer may have moved
        // the appointment since the pre-lock lookup.
        let mut appointment = self
            .appointments
            .read()
            .await
            .get(&appointment_id)
            .cloned()
            .ok_or(SchedulingError::NotFound)?;

        let now = self.clock.now();
        let mut changed = false;
        let mut status_applied: Option<AppointmentStatus> = None;
        let mut rescheduled_to: Option<TimeSlot> = None;

        if let Some(new_status) = patch.status {
            match self.state_machine.transition(appointment.status, new_status)? {
                Transition::AlreadyApplied => {}
                Transition::Applied => {
                    if new_status == AppointmentStatus::Cancelled {
                        self.enforce_cancellation_notice(&appointment, now)?;
                    }
                    if self.state_machine.frees_slot(new_status) {
                        index.remove(&appointment.slot)?;
                    }
                    appointment.status = new_status;
                    status_applied = Some(new_status);
                    changed = true;
                }
            }
        }

        if let Some(new_start) = patch.reschedule_to {
            if self.state_machine.is_terminal(appointment.status) {
                return Err(SchedulingError::Validation(format!(
                    "cannot reschedule a {} appointment",
                    appointment.status
                )));
            }
            let duration = match patch.reschedule_duration_minutes {
                Some(minutes) => Duration::minutes(minutes as i64),
                None => appointment.slot.duration(),
            };
            let new_slot = TimeSlot::from_start(new_start, duration)?;
            self.validate_booking_window(&new_slot, now)?;

            let old_slot = appointment.slot;
            index.remove(&old_slot)?;
            let admitted = self
                .conflict_detector
                .check(&new_slot, &index, profile.break_between())
                .and_then(|_| index.insert(new_slot));
            if let Err(err) = admitted {
                // All-or-nothing: put the original interval back.
                index.insert(old_slot)?;
                return Err(err);
            }
            appointment.slot = new_slot;
            rescheduled_to = Some(new_slot);
            changed = true;
        }

        if let Some(notes) = patch.notes {
            appointment.notes = Some(notes);
            changed = true;
        }

        if !changed {
            return Ok(appointment);
        }

        appointment.updated_at = now;
        self.appointments
            .write()
            .await
            .insert(appointment_id, appointment.clone());
        drop(index);

        info!("appointment {} updated", appointment_id);
        if let Some(status) = status_applied {
            if let Some(event) = status_event(appointment_id, status) {
                self.sink.notify(event).await;
            }
        }
        if let Some(new_slot) = rescheduled_to {
            self.sink
                .notify(SchedulingEvent::AppointmentRescheduled {
                    appointment_id,
                    new_start: new_slot.start(),
                })
                .await;
        }
        Ok(appointment)
    }

    /// Cancel an appointment, freeing its slot.
    ///
    /// Idempotent: cancelling an already-cancelled appointment returns it
    /// unchanged.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        debug!("cancelling appointment {}", appointment_id);

        let current = self.get_appointment(appointment_id).await?;
        let schedule = self.schedule_for(current.therapist_id).await;
        let mut index = self.lock_schedule(&schedule).await?;

        let mut appointment = self
            .appointments
            .read()
            .await
            .get(&appointment_id)
            .cloned()
            .ok_or(SchedulingError::NotFound)?;

        match self
            .state_machine
            .transition(appointment.status, AppointmentStatus::Cancelled)?
        {
            Transition::AlreadyApplied => {
                debug!("appointment {} already cancelled", appointment_id);
                return Ok(appointment);
            }
            Transition::Applied => {}
        }

        let now = self.clock.now();
        self.enforce_cancellation_notice(&appointment, now)?;
        index.remove(&appointment.slot)?;

        let audit = format!("cancelled by {}: {}", request.cancelled_by, request.reason);
        appointment.notes = Some(match appointment.notes.take() {
            Some(notes) => format!("{notes}\n{audit}"),
            None => audit,
        });
        appointment.status = AppointmentStatus::Cancelled;
        appointment.updated_at = now;
        self.appointments
            .write()
            .await
            .insert(appointment_id, appointment.clone());
        drop(index);

        info!("appointment {} cancelled", appointment_id);
        self.sink
            .notify(SchedulingEvent::AppointmentCancelled {
                appointment_id,
                reason: Some(request.reason),
            })
            .await;
        Ok(appointment)
    }

    /// Bookable slots for a therapist inside `[query.from, query.to)`.
    ///
    /// Derived as the complement of the availability index, honoring the
    /// therapist's break padding, by stepping through the range at the
    /// requested granularity.
    pub async fn free_slots(
        &self,
        therapist_id: Uuid,
        query: FreeSlotQuery,
    ) -> Result<Vec<TimeSlot>, SchedulingError> {
        let range = TimeSlot::new(query.from, query.to)?;
        if range.duration() > Duration::days(self.rules.max_advance_days as i64) {
            return Err(SchedulingError::Validation(format!(
                "free-slot range exceeds {} days",
                self.rules.max_advance_days
            )));
        }

        let profile = self.profile_for(therapist_id).await;
        let step_minutes = query
            .granularity_minutes
            .unwrap_or(profile.session_duration_minutes);
        if step_minutes == 0 {
            return Err(SchedulingError::Validation(
                "granularity must be positive".to_string(),
            ));
        }
        let step = Duration::minutes(step_minutes as i64);

        let schedule = self.schedule_for(therapist_id).await;
        let index = self.lock_schedule(&schedule).await?;

        let mut free = Vec::new();
        let mut cursor = query.from;
        while cursor + step <= query.to {
            let candidate = TimeSlot::from_start(cursor, step)?;
            if self
                .conflict_detector
                .check(&candidate, &index, profile.break_between())
                .is_ok()
            {
                free.push(candidate);
            }
            cursor += step;
        }
        Ok(free)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Appointment, SchedulingError> {
        self.appointments
            .read()
            .await
            .get(&appointment_id)
            .cloned()
            .ok_or(SchedulingError::NotFound)
    }

    /// Appointments for one therapist whose slots intersect `range`.
    pub async fn appointments_for(&self, therapist_id: Uuid, range: &TimeSlot) -> Vec<Appointment> {
        let mut found: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| a.therapist_id == therapist_id && a.slot.overlaps(range))
            .cloned()
            .collect();
        found.sort_by_key(|a| a.slot.start());
        found
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn profile_for(&self, therapist_id: Uuid) -> TherapistProfile {
        match self.directory.get(therapist_id).await {
            Some(profile) => profile,
            None => self.default_profile.clone(),
        }
    }

    async fn schedule_for(&self, therapist_id: Uuid) -> Arc<Mutex<AvailabilityIndex>> {
        if let Some(schedule) = self.schedules.read().await.get(&therapist_id) {
            return Arc::clone(schedule);
        }
        let mut schedules = self.schedules.write().await;
        Arc::clone(schedules.entry(therapist_id).or_default())
    }

    async fn lock_schedule<'a>(
        &self,
        schedule: &'a Mutex<AvailabilityIndex>,
    ) -> Result<MutexGuard<'a, AvailabilityIndex>, SchedulingError> {
        timeout(self.rules.lock_timeout, schedule.lock())
            .await
            .map_err(|_| {
                warn!("schedule lock acquisition timed out");
                SchedulingError::Timeout
            })
    }

    fn validate_booking_window(
        &self,
        slot: &TimeSlot,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulingError> {
        let minutes = slot.duration().num_minutes();
        if minutes < self.rules.min_duration_minutes as i64
            || minutes > self.rules.max_duration_minutes as i64
        {
            return Err(SchedulingError::Validation(format!(
                "session length {} minutes is outside {}..{} minutes",
                minutes, self.rules.min_duration_minutes, self.rules.max_duration_minutes
            )));
        }
        if slot.start() < now {
            return Err(SchedulingError::Validation(
                "appointment starts in the past".to_string(),
            ));
        }
        if slot.start() > now + Duration::days(self.rules.max_advance_days as i64) {
            return Err(SchedulingError::Validation(format!(
                "appointment is more than {} days ahead",
                self.rules.max_advance_days
            )));
        }
        Ok(())
    }

    fn enforce_cancellation_notice(
        &self,
        appointment: &Appointment,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulingError> {
        if appointment.status != AppointmentStatus::Confirmed {
            return Ok(());
        }
        if let Some(hours) = self.rules.cancellation_notice_hours {
            if appointment.slot.start() - now < Duration::hours(hours as i64) {
                return Err(SchedulingError::Validation(format!(
                    "confirmed appointments require {} hours cancellation notice",
                    hours
                )));
            }
        }
        Ok(())
    }
}

fn status_event(appointment_id: Uuid, status: AppointmentStatus) -> Option<SchedulingEvent> {
    match status {
        AppointmentStatus::Confirmed => {
            Some(SchedulingEvent::AppointmentConfirmed { appointment_id })
        }
        AppointmentStatus::Completed => {
            Some(SchedulingEvent::AppointmentCompleted { appointment_id })
        }
        AppointmentStatus::Cancelled => Some(SchedulingEvent::AppointmentCancelled {
            appointment_id,
            reason: None,
        }),
        AppointmentStatus::Scheduled => None,
    }
}
