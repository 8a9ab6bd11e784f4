// libs/assignment-cell/tests/assignment_test.rs
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use uuid::Uuid;

use assignment_cell::models::{
    AssignmentError, AssignmentStatus, CreateAssignmentRequest, RecurrenceFrequency,
    RecurrenceRule,
};
use assignment_cell::AssignmentService;
use shared_config::AppConfig;
use shared_models::notify::SchedulingEvent;
use shared_utils::test_utils::{ManualClock, RecordingSink};

// ==============================================================================
// TEST FIXTURES AND UTILITIES
// ==============================================================================

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

struct TestSetup {
    service: AssignmentService,
    clock: Arc<ManualClock>,
    sink: Arc<RecordingSink>,
    client_id: Uuid,
    therapist_id: Uuid,
}

impl TestSetup {
    /// Clock frozen at 2025-02-01 12:00 UTC.
    fn new() -> Self {
        let clock = Arc::new(ManualClock::at_utc(2025, 2, 1, 12, 0));
        let sink = Arc::new(RecordingSink::new());
        let service = AssignmentService::new(clock.clone(), sink.clone(), &AppConfig::default());
        Self {
            service,
            clock,
            sink,
            client_id: Uuid::new_v4(),
            therapist_id: Uuid::new_v4(),
        }
    }

    fn request_with(&self, recurrence: Option<RecurrenceRule>) -> CreateAssignmentRequest {
        CreateAssignmentRequest {
            template_id: Uuid::new_v4(),
            client_id: self.client_id,
            assigned_by: self.therapist_id,
            recurrence,
        }
    }

    fn weekly_mondays() -> RecurrenceRule {
        // 2025-01-06 is a Monday.
        RecurrenceRule {
            frequency: RecurrenceFrequency::Weekly,
            start_date: date(2025, 1, 6),
            end_date: None,
            occurrence_count: Some(4),
            day_of_week: None,
        }
    }
}

// ==============================================================================
// CREATION
// ==============================================================================

#[tokio::test]
async fn creating_an_assignment_starts_it_active() {
    let setup = TestSetup::new();

    let assignment = setup
        .service
        .create(setup.request_with(Some(TestSetup::weekly_mondays())))
        .await
        .unwrap();

    assert_eq!(assignment.status, AssignmentStatus::Active);
    assert!(assignment.check_ins.is_empty());
    assert_matches!(
        setup.sink.events().first(),
        Some(SchedulingEvent::AssignmentCreated { client_id, .. })
            if *client_id == setup.client_id
    );
}

#[tokio::test]
async fn invalid_recurrence_is_rejected_at_creation() {
    let setup = TestSetup::new();

    let inverted = RecurrenceRule {
        end_date: Some(date(2024, 12, 1)),
        ..TestSetup::weekly_mondays()
    };
    let result = setup.service.create(setup.request_with(Some(inverted))).await;
    assert_matches!(result, Err(AssignmentError::InvalidRecurrence(_)));
}

// ==============================================================================
// CHECK-INS
// ==============================================================================

#[tokio::test]
async fn check_ins_match_expanded_occurrences_only() {
    let setup = TestSetup::new();
    let assignment = setup
        .service
        .create(setup.request_with(Some(TestSetup::weekly_mondays())))
        .await
        .unwrap();

    // The four Mondays: 01-06, 01-13, 01-20, 01-27.
    let event = setup
        .service
        .check_in(assignment.id, date(2025, 1, 13), None)
        .await
        .unwrap();
    assert_eq!(event.occurrence_date, date(2025, 1, 13));

    // A Wednesday between occurrences is not a scheduled date.
    let rejected = setup
        .service
        .check_in(assignment.id, date(2025, 1, 15), None)
        .await;
    assert_matches!(
        rejected,
        Err(AssignmentError::UnscheduledCheckIn { date: d }) if d == date(2025, 1, 15)
    );
}

#[tokio::test]
async fn duplicate_check_in_returns_the_existing_event() {
    let setup = TestSetup::new();
    let assignment = setup
        .service
        .create(setup.request_with(Some(TestSetup::weekly_mondays())))
        .await
        .unwrap();

    let first = setup
        .service
        .check_in(
            assignment.id,
            date(2025, 1, 6),
            Some(serde_json::json!({"mood": 7})),
        )
        .await
        .unwrap();

    setup.clock.advance(chrono::Duration::hours(2));
    let second = setup
        .service
        .check_in(assignment.id, date(2025, 1, 6), None)
        .await
        .unwrap();

    // Same event, original timestamp and value, no second entry appended.
    assert_eq!(second, first);
    let stored = setup.service.get(assignment.id).await.unwrap();
    assert_eq!(stored.check_ins.len(), 1);
}

#[tokio::test]
async fn missed_occurrences_stay_checkable() {
    let setup = TestSetup::new();
    let assignment = setup
        .service
        .create(setup.request_with(Some(TestSetup::weekly_mondays())))
        .await
        .unwrap();

    // All four Mondays are in the past relative to 2025-02-01; late
    // check-ins are still admitted.
    let late = setup
        .service
        .check_in(assignment.id, date(2025, 1, 6), None)
        .await;
    assert!(late.is_ok());
}

#[tokio::test]
async fn completing_every_occurrence_closes_the_assignment() {
    let setup = TestSetup::new();
    let assignment = setup
        .service
        .create(setup.request_with(Some(TestSetup::weekly_mondays())))
        .await
        .unwrap();

    for day in [6, 13, 20, 27] {
        setup
            .service
            .check_in(assignment.id, date(2025, 1, day), None)
            .await
            .unwrap();
    }

    let closed = setup.service.get(assignment.id).await.unwrap();
    assert_eq!(closed.status, AssignmentStatus::Completed);
    assert_matches!(
        setup.sink.events().last(),
        Some(SchedulingEvent::AssignmentClosed { assignment_id })
            if *assignment_id == assignment.id
    );

    // A retried final check-in still answers with the recorded event.
    let retried = setup
        .service
        .check_in(assignment.id, date(2025, 1, 27), None)
        .await;
    assert!(retried.is_ok());
}

#[tokio::test]
async fn one_off_assignments_take_a_single_check_in() {
    let setup = TestSetup::new();
    let assignment = setup.service.create(setup.request_with(None)).await.unwrap();

    let future = setup
        .service
        .check_in(assignment.id, date(2025, 3, 1), None)
        .await;
    assert_matches!(future, Err(AssignmentError::UnscheduledCheckIn { .. }));

    setup
        .service
        .check_in(assignment.id, date(2025, 2, 1), None)
        .await
        .unwrap();

    let closed = setup.service.get(assignment.id).await.unwrap();
    assert_eq!(closed.status, AssignmentStatus::Completed);
}

// ==============================================================================
// LIFECYCLE
// ==============================================================================

#[tokio::test]
async fn paused_assignments_reject_check_ins_until_resumed() {
    let setup = TestSetup::new();
    let assignment = setup
        .service
        .create(setup.request_with(Some(TestSetup::weekly_mondays())))
        .await
        .unwrap();

    setup.service.pause(assignment.id).await.unwrap();
    let while_paused = setup
        .service
        .check_in(assignment.id, date(2025, 1, 6), None)
        .await;
    assert_matches!(
        while_paused,
        Err(AssignmentError::NotActive {
            status: AssignmentStatus::Paused
        })
    );

    setup.service.resume(assignment.id).await.unwrap();
    let resumed = setup
        .service
        .check_in(assignment.id, date(2025, 1, 6), None)
        .await;
    assert!(resumed.is_ok());
}

#[tokio::test]
async fn discontinue_closes_and_is_terminal() {
    let setup = TestSetup::new();
    let assignment = setup
        .service
        .create(setup.request_with(Some(TestSetup::weekly_mondays())))
        .await
        .unwrap();

    let closed = setup.service.discontinue(assignment.id).await.unwrap();
    assert_eq!(closed.status, AssignmentStatus::Completed);

    // Discontinuing twice is a no-op, but reopening is not allowed.
    let again = setup.service.discontinue(assignment.id).await.unwrap();
    assert_eq!(again.status, AssignmentStatus::Completed);
    let reopen = setup.service.resume(assignment.id).await;
    assert_matches!(reopen, Err(AssignmentError::InvalidTransition { .. }));

    let check_in = setup
        .service
        .check_in(assignment.id, date(2025, 1, 6), None)
        .await;
    assert_matches!(
        check_in,
        Err(AssignmentError::NotActive {
            status: AssignmentStatus::Completed
        })
    );
}

// ==============================================================================
// PROGRESS
// ==============================================================================

#[tokio::test]
async fn progress_reports_completion_and_streak() {
    let setup = TestSetup::new();
    let assignment = setup
        .service
        .create(setup.request_with(Some(TestSetup::weekly_mondays())))
        .await
        .unwrap();

    // Complete the last three Mondays, leave 01-06 open.
    for day in [13, 20, 27] {
        setup
            .service
            .check_in(assignment.id, date(2025, 1, day), None)
            .await
            .unwrap();
    }

    let snapshot = setup.service.progress(assignment.id).await.unwrap();
    assert_eq!(snapshot.total_occurrences, 4);
    assert_eq!(snapshot.completed_count, 3);
    assert_eq!(snapshot.current_streak, 3);
    assert_eq!(snapshot.last_completed_date, Some(date(2025, 1, 27)));
}

#[tokio::test]
async fn progress_is_recomputed_not_stored() {
    let setup = TestSetup::new();

    // Daily rule spanning the frozen clock date.
    let rule = RecurrenceRule {
        frequency: RecurrenceFrequency::Daily,
        start_date: date(2025, 1, 30),
        end_date: Some(date(2025, 2, 3)),
        occurrence_count: None,
        day_of_week: None,
    };
    let assignment = setup
        .service
        .create(setup.request_with(Some(rule)))
        .await
        .unwrap();

    for day in [date(2025, 1, 31), date(2025, 2, 1)] {
        setup.service.check_in(assignment.id, day, None).await.unwrap();
    }

    // As of 2025-02-01: occurrences due are 01-30, 01-31, 02-01; the trailing
    // two are complete.
    let snapshot = setup.service.progress(assignment.id).await.unwrap();
    assert_eq!(snapshot.total_occurrences, 5);
    assert_eq!(snapshot.current_streak, 2);

    // Two days later the uncompleted 02-02 breaks the streak.
    setup.clock.advance(chrono::Duration::days(2));
    let later = setup.service.progress(assignment.id).await.unwrap();
    assert_eq!(later.completed_count, 2);
    assert_eq!(later.current_streak, 0);
}

#[tokio::test]
async fn missing_assignments_report_not_found() {
    let setup = TestSetup::new();
    let missing = setup.service.progress(Uuid::new_v4()).await;
    assert_matches!(missing, Err(AssignmentError::NotFound));
}
