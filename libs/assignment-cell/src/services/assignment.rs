// libs/assignment-cell/src/services/assignment.rs
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::clock::Clock;
use shared_models::notify::{NotificationSink, SchedulingEvent};

use crate::models::{
    Assignment, AssignmentError, AssignmentStatus, CheckInEvent, CreateAssignmentRequest,
    OccurrenceWindow, ProgressSnapshot, RecurrenceRule,
};
use crate::services::progress::ProgressTracker;
use crate::services::recurrence::RecurrenceExpander;

/// Owns the assignment aggregates: creation by a therapist, append-only
/// check-ins from the client, and derived progress.
///
/// Check-in lists only ever grow, and every derived number is recomputed from
/// the rule plus the events, so there is no stored progress to drift.
pub struct AssignmentService {
    clock: Arc<dyn Clock>,
    sink: Arc<dyn NotificationSink>,
    expander: RecurrenceExpander,
    tracker: ProgressTracker,
    /// How far past today open-ended rules are expanded.
    horizon_days: u32,
    assignments: RwLock<HashMap<Uuid, Assignment>>,
}

impl AssignmentService {
    pub fn new(clock: Arc<dyn Clock>, sink: Arc<dyn NotificationSink>, config: &AppConfig) -> Self {
        Self {
            clock,
            sink,
            expander: RecurrenceExpander::new(),
            tracker: ProgressTracker::new(),
            horizon_days: config.assignment_horizon_days,
            assignments: RwLock::new(HashMap::new()),
        }
    }

    /// Create an assignment from a template, optionally recurring.
    pub async fn create(
        &self,
        request: CreateAssignmentRequest,
    ) -> Result<Assignment, AssignmentError> {
        if let Some(rule) = &request.recurrence {
            rule.validate()?;
        }

        let now = self.clock.now();
        let assignment = Assignment {
            id: Uuid::new_v4(),
            template_id: request.template_id,
            client_id: request.client_id,
            assigned_by: request.assigned_by,
            recurrence: request.recurrence,
            status: AssignmentStatus::Active,
            check_ins: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.assignments
            .write()
            .await
            .insert(assignment.id, assignment.clone());

        info!(
            "assignment {} created for client {}",
            assignment.id, assignment.client_id
        );
        self.sink
            .notify(SchedulingEvent::AssignmentCreated {
                assignment_id: assignment.id,
                client_id: assignment.client_id,
            })
            .await;
        Ok(assignment)
    }

    /// Record a completion for one occurrence date.
    ///
    /// At most one check-in exists per occurrence date: a retried submission
    /// returns the original event untouched. Dates outside the expanded
    /// occurrence set are rejected, never silently dropped.
    pub async fn check_in(
        &self,
        assignment_id: Uuid,
        occurrence_date: NaiveDate,
        value: Option<serde_json::Value>,
    ) -> Result<CheckInEvent, AssignmentError> {
        let now = self.clock.now();
        let today = now.date_naive();

        let mut assignments = self.assignments.write().await;
        let assignment = assignments
            .get_mut(&assignment_id)
            .ok_or(AssignmentError::NotFound)?;

        if let Some(existing) = assignment.check_in_for(occurrence_date) {
            debug!(
                "duplicate check-in for assignment {} on {}, returning existing event",
                assignment_id, occurrence_date
            );
            return Ok(existing.clone());
        }

        match assignment.status {
            AssignmentStatus::Active => {}
            status => return Err(AssignmentError::NotActive { status }),
        }

        let scheduled = match &assignment.recurrence {
            Some(rule) => {
                let window = self.admission_window(rule, today);
                self.expander
                    .expand(rule, &window)?
                    .contains(&occurrence_date)
            }
            // One-off assignments accept a single check-in on any date that
            // is not in the future.
            None => occurrence_date <= today,
        };
        if !scheduled {
            warn!(
                "rejected check-in for assignment {} on unscheduled date {}",
                assignment_id, occurrence_date
            );
            return Err(AssignmentError::UnscheduledCheckIn {
                date: occurrence_date,
            });
        }

        let event = CheckInEvent {
            occurrence_date,
            completed_at: now,
            value,
        };
        assignment.check_ins.push(event.clone());
        assignment.updated_at = now;

        let mut closed = false;
        if self.is_fully_completed(assignment) {
            assignment.status = AssignmentStatus::Completed;
            closed = true;
            info!("assignment {} completed", assignment_id);
        }
        drop(assignments);

        self.sink
            .notify(SchedulingEvent::CheckInRecorded {
                assignment_id,
                occurrence_date,
            })
            .await;
        if closed {
            self.sink
                .notify(SchedulingEvent::AssignmentClosed { assignment_id })
                .await;
        }
        Ok(event)
    }

    /// Derived progress for an assignment, as of the injected clock's today.
    pub async fn progress(&self, assignment_id: Uuid) -> Result<ProgressSnapshot, AssignmentError> {
        let today = self.clock.now().date_naive();
        let assignments = self.assignments.read().await;
        let assignment = assignments
            .get(&assignment_id)
            .ok_or(AssignmentError::NotFound)?;

        let occurrences = match &assignment.recurrence {
            Some(rule) => {
                let window = self.admission_window(rule, today);
                self.expander.expand(rule, &window)?
            }
            None => assignment
                .check_ins
                .first()
                .map(|c| vec![c.occurrence_date])
                .unwrap_or_default(),
        };
        Ok(self
            .tracker
            .snapshot(&occurrences, &assignment.check_ins, today))
    }

    pub async fn get(&self, assignment_id: Uuid) -> Result<Assignment, AssignmentError> {
        self.assignments
            .read()
            .await
            .get(&assignment_id)
            .cloned()
            .ok_or(AssignmentError::NotFound)
    }

    pub async fn pause(&self, assignment_id: Uuid) -> Result<Assignment, AssignmentError> {
        let (assignment, _) = self.set_status(assignment_id, AssignmentStatus::Paused).await?;
        Ok(assignment)
    }

    pub async fn resume(&self, assignment_id: Uuid) -> Result<Assignment, AssignmentError> {
        let (assignment, _) = self.set_status(assignment_id, AssignmentStatus::Active).await?;
        Ok(assignment)
    }

    /// Explicitly close the assignment before its recurrence window ends.
    pub async fn discontinue(&self, assignment_id: Uuid) -> Result<Assignment, AssignmentError> {
        let (assignment, changed) = self
            .set_status(assignment_id, AssignmentStatus::Completed)
            .await?;
        if changed {
            self.sink
                .notify(SchedulingEvent::AssignmentClosed { assignment_id })
                .await;
        }
        Ok(assignment)
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    /// Expansion window for admission and progress: the rule's own bounds cap
    /// the sequence, the horizon caps open-ended rules.
    fn admission_window(&self, rule: &RecurrenceRule, today: NaiveDate) -> OccurrenceWindow {
        let until = today
            .checked_add_signed(Duration::days(self.horizon_days as i64))
            .unwrap_or(NaiveDate::MAX);
        OccurrenceWindow {
            from: rule.start_date,
            until,
        }
    }

    /// A bounded rule is fully completed once every occurrence has a
    /// check-in; open-ended rules never auto-complete.
    fn is_fully_completed(&self, assignment: &Assignment) -> bool {
        match &assignment.recurrence {
            Some(rule) => match self.expander.rule_bounds(rule) {
                Some(window) => self
                    .expander
                    .occurrences(rule, &window)
                    .all(|date| assignment.check_in_for(date).is_some()),
                None => false,
            },
            None => !assignment.check_ins.is_empty(),
        }
    }

    async fn set_status(
        &self,
        assignment_id: Uuid,
        to: AssignmentStatus,
    ) -> Result<(Assignment, bool), AssignmentError> {
        let mut assignments = self.assignments.write().await;
        let assignment = assignments
            .get_mut(&assignment_id)
            .ok_or(AssignmentError::NotFound)?;

        if assignment.status == to {
            return Ok((assignment.clone(), false));
        }

        let allowed = matches!(
            (assignment.status, to),
            (AssignmentStatus::Active, AssignmentStatus::Paused)
                | (AssignmentStatus::Paused, AssignmentStatus::Active)
                | (AssignmentStatus::Active, AssignmentStatus::Completed)
                | (AssignmentStatus::Paused, AssignmentStatus::Completed)
        );
        if !allowed {
            warn!(
                "rejected assignment transition {} -> {} for {}",
                assignment.status, to, assignment_id
            );
            return Err(AssignmentError::InvalidTransition {
                from: assignment.status,
                to,
            });
        }

        assignment.status = to;
        assignment.updated_at = self.clock.now();
        info!("assignment {} is now {}", assignment_id, to);
        Ok((assignment.clone(), true))
    }
}
